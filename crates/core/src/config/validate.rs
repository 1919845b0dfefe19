use super::{types::Config, ConfigError, StorageBackend};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - DynamoDB table and index names are set when that backend is selected
/// - DynamoDB timeout, if set, is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.storage.backend == StorageBackend::Dynamodb {
        let ddb = &config.storage.dynamodb;
        if ddb.table_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.dynamodb.table_name cannot be empty".to_string(),
            ));
        }
        if ddb.index_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "storage.dynamodb.index_name cannot be empty".to_string(),
            ));
        }
        if ddb.timeout_ms == Some(0) {
            return Err(ConfigError::ValidationError(
                "storage.dynamodb.timeout_ms cannot be 0".to_string(),
            ));
        }
    }

    Ok(())
}

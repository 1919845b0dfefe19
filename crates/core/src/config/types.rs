use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Which document store backs the ticket repository
    pub backend: StorageBackend,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    #[serde(default)]
    pub dynamodb: DynamoDbConfig,
}

/// Available document store backends
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Memory,
    Sqlite,
    Dynamodb,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Memory => "memory",
            StorageBackend::Sqlite => "sqlite",
            StorageBackend::Dynamodb => "dynamodb",
        }
    }
}

/// SQLite backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("tickets.db")
}

/// DynamoDB backend configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DynamoDbConfig {
    /// Table holding the ticket items
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// Global secondary index keyed by `assignedTo`
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// AWS region (SDK default chain if unset)
    #[serde(default)]
    pub region: Option<String>,
    /// Endpoint override, e.g. "http://localhost:8000" for DynamoDB Local
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Per-operation timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for DynamoDbConfig {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            index_name: default_index_name(),
            region: None,
            endpoint: None,
            timeout_ms: None,
        }
    }
}

fn default_table_name() -> String {
    "tickets_poc".to_string()
}

fn default_index_name() -> String {
    "AssignedTo".to_string()
}

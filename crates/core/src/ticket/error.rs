use thiserror::Error;

use crate::store::StoreError;

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    /// No record at the derived key.
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Missing or invalid identifier or field.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Status value outside of OPEN/CLOSED.
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Failed to encode ticket {ticket_id}: {source}")]
    Encode {
        ticket_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to decode stored item {partition_key}: {source}")]
    Decode {
        partition_key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// Reading an upload failed before it could be decoded.
    #[error("Failed to read upload: {0}")]
    Io(#[from] std::io::Error),

    /// Bulk import stopped at the chunk `start..end`; earlier chunks stay committed.
    #[error(
        "Could not process batch from {start} to {end} ({committed_batches} batches committed): {cause}"
    )]
    PartialBatchFailure {
        start: usize,
        end: usize,
        committed_batches: usize,
        #[source]
        cause: Box<TicketError>,
    },
}

impl TicketError {
    /// Short machine-readable name, used for log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            TicketError::NotFound(_) => "not_found",
            TicketError::Validation(_) => "validation",
            TicketError::InvalidStatus(_) => "invalid_status",
            TicketError::Encode { .. } => "encode",
            TicketError::Decode { .. } => "decode",
            TicketError::Storage(_) => "storage",
            TicketError::Io(_) => "io",
            TicketError::PartialBatchFailure { .. } => "partial_batch_failure",
        }
    }
}

//! Ticket entity, storage mapping and repository.

mod csv_import;
mod error;
mod importer;
mod record;
mod repository;
mod types;

pub use csv_import::{parse_bulk_csv, CsvImport, RejectedRow, RowError};
pub use error::TicketError;
pub use importer::{BatchImporter, ImportSummary, BATCH_SIZE};
pub use record::{
    decode_ticket, ticket_key, TicketRecord, ASSIGNED_TO_ATTRIBUTE, DETAILS_SORT_KEY,
    TICKET_KEY_PREFIX,
};
pub use repository::{StoreTicketRepository, TicketRepository};
pub use types::{new_ticket_id, now_timestamp, Ticket, TicketStatus, UNASSIGNED};

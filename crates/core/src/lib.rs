pub mod config;
pub mod store;
pub mod testing;
pub mod ticket;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, StorageBackend,
};
pub use store::{
    DocumentStore, DynamoDbDocumentStore, Item, ItemKey, MemoryDocumentStore,
    SqliteDocumentStore, StoreError,
};
pub use ticket::{
    ImportSummary, StoreTicketRepository, Ticket, TicketError, TicketRepository, TicketStatus,
};

//! Testing utilities and mock implementations.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ticketdesk_core::testing::{fixtures, MockDocumentStore};
//! use ticketdesk_core::{StoreTicketRepository, TicketRepository};
//!
//! let store = Arc::new(MockDocumentStore::new());
//! let repo = StoreTicketRepository::new(store.clone());
//! repo.bulk_import(fixtures::tickets(85)).await?;
//! assert_eq!(store.batch_sizes().await, vec![40, 40, 5]);
//! ```

mod mock_document_store;

pub use mock_document_store::{MockDocumentStore, StoreOperation};

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::ticket::Ticket;

    /// An open, unassigned ticket with a fixed id.
    pub fn ticket(id: &str) -> Ticket {
        Ticket::new(format!("ticket {}", id), "fixture").with_id(id)
    }

    /// `count` tickets with ids `bulk-0`, `bulk-1`, ...
    pub fn tickets(count: usize) -> Vec<Ticket> {
        (0..count)
            .map(|i| {
                Ticket::new(format!("imported ticket {}", i), "importer")
                    .with_id(format!("bulk-{}", i))
            })
            .collect()
    }

    /// `count` tickets assigned to `assignee`.
    pub fn tickets_assigned_to(assignee: &str, count: usize) -> Vec<Ticket> {
        tickets(count)
            .into_iter()
            .map(|t| {
                let id = format!("{}-{}", assignee, t.id);
                t.with_id(id).with_assignee(assignee)
            })
            .collect()
    }
}

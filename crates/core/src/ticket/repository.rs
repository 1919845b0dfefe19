//! Ticket repository: the public persistence contract.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::importer::{BatchImporter, ImportSummary};
use super::record::{decode_ticket, ticket_key, TicketRecord, ASSIGNED_TO_ATTRIBUTE};
use super::{Ticket, TicketError, TicketStatus, UNASSIGNED};
use crate::store::DocumentStore;

/// Persistence operations for tickets.
///
/// Updates are read-modify-write without a version check: two concurrent updates
/// of the same ticket race and the later write wins.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Persist a new ticket and return its id, generating one when empty.
    async fn create_ticket(&self, ticket: Ticket) -> Result<String, TicketError>;

    async fn get_ticket(&self, id: &str) -> Result<Ticket, TicketError>;

    /// All tickets whose assignee is `username`. Empty when nothing matches.
    async fn get_tickets_assigned_to(&self, username: &str) -> Result<Vec<Ticket>, TicketError>;

    /// Set the status to `status`, which must be `OPEN` or `CLOSED`.
    async fn update_status(&self, id: &str, status: &str) -> Result<(), TicketError>;

    /// An empty `assignee` clears the assignment.
    async fn update_assign_to(&self, id: &str, assignee: &str) -> Result<(), TicketError>;

    /// Overwrite the full stored record of `ticket`.
    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), TicketError>;

    /// Write `entries` in batches. See [`BatchImporter`] for the failure policy.
    async fn bulk_import(&self, entries: Vec<Ticket>) -> Result<ImportSummary, TicketError>;
}

/// [`TicketRepository`] over any [`DocumentStore`].
pub struct StoreTicketRepository {
    store: Arc<dyn DocumentStore>,
}

impl StoreTicketRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    fn require_id(id: &str) -> Result<(), TicketError> {
        if id.is_empty() {
            return Err(TicketError::Validation("ticket id is required".to_string()));
        }
        Ok(())
    }

    async fn write(&self, ticket: Ticket) -> Result<(), TicketError> {
        let item = TicketRecord::from_ticket(ticket).encode()?;
        self.store.put_item(item).await?;
        Ok(())
    }
}

#[async_trait]
impl TicketRepository for StoreTicketRepository {
    async fn create_ticket(&self, mut ticket: Ticket) -> Result<String, TicketError> {
        ticket.fill_creation_defaults();
        let id = ticket.id.clone();

        self.write(ticket).await.inspect_err(|e| {
            warn!(ticket_id = %id, error = %e, "Failed to create ticket");
        })?;

        info!(ticket_id = %id, backend = self.store.backend_name(), "Created ticket");
        Ok(id)
    }

    async fn get_ticket(&self, id: &str) -> Result<Ticket, TicketError> {
        Self::require_id(id)?;

        let item = self
            .store
            .get_item(&ticket_key(id))
            .await?
            .ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        decode_ticket(item)
    }

    async fn get_tickets_assigned_to(&self, username: &str) -> Result<Vec<Ticket>, TicketError> {
        // Stored assignees are never empty, and an empty index key is not queryable.
        if username.is_empty() {
            return Ok(Vec::new());
        }

        let items = self
            .store
            .query_index(ASSIGNED_TO_ATTRIBUTE, username)
            .await?;

        debug!(username, count = items.len(), "Queried assigned tickets");

        items.into_iter().map(decode_ticket).collect()
    }

    async fn update_status(&self, id: &str, status: &str) -> Result<(), TicketError> {
        let mut ticket = self.get_ticket(id).await?;

        let status: TicketStatus = status.parse().inspect_err(|e| {
            warn!(ticket_id = %id, error = %e, "Rejected status update");
        })?;

        let previous = ticket.status;
        ticket.status = status;
        self.update_ticket(&ticket).await?;

        info!(ticket_id = %id, from = %previous, to = %status, "Updated ticket status");
        Ok(())
    }

    async fn update_assign_to(&self, id: &str, assignee: &str) -> Result<(), TicketError> {
        let mut ticket = self.get_ticket(id).await?;
        ticket.assigned_to = if assignee.is_empty() {
            UNASSIGNED.to_string()
        } else {
            assignee.to_string()
        };
        self.update_ticket(&ticket).await?;

        info!(ticket_id = %id, assignee, "Reassigned ticket");
        Ok(())
    }

    async fn update_ticket(&self, ticket: &Ticket) -> Result<(), TicketError> {
        Self::require_id(&ticket.id)?;
        self.write(ticket.clone()).await.inspect_err(|e| {
            warn!(ticket_id = %ticket.id, error = %e, "Failed to update ticket");
        })
    }

    async fn bulk_import(&self, entries: Vec<Ticket>) -> Result<ImportSummary, TicketError> {
        BatchImporter::new(self.store.as_ref()).import(entries).await
    }
}

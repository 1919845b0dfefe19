use std::sync::Arc;

use ticketdesk_core::TicketRepository;

/// Shared application state
pub struct AppState {
    repository: Arc<dyn TicketRepository>,
}

impl AppState {
    pub fn new(repository: Arc<dyn TicketRepository>) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &dyn TicketRepository {
        self.repository.as_ref()
    }
}

//! Chunked bulk import.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, error, info};

use super::{Ticket, TicketError, TicketRecord};
use crate::store::{DocumentStore, MAX_BATCH_ITEMS};

/// Tickets per batched write.
pub const BATCH_SIZE: usize = 40;

/// Outcome of a completed import. Entries superseded by a later entry with the
/// same id in the same chunk are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub tickets_written: usize,
    pub batches_written: usize,
}

/// Writes tickets in consecutive chunks, one batched store call per chunk.
///
/// Chunks are written strictly in input order. The first failing chunk stops the
/// import: earlier chunks stay committed, later chunks are never attempted.
/// Within a chunk only the last entry per id is sent.
pub struct BatchImporter<'a> {
    store: &'a dyn DocumentStore,
    batch_size: usize,
}

impl<'a> BatchImporter<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self {
            store,
            batch_size: BATCH_SIZE,
        }
    }

    /// Override the chunk size, clamped to what a batched write accepts.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_ITEMS);
        self
    }

    pub async fn import(&self, entries: Vec<Ticket>) -> Result<ImportSummary, TicketError> {
        let entries: Vec<Ticket> = entries
            .into_iter()
            .map(|mut ticket| {
                ticket.fill_creation_defaults();
                ticket
            })
            .collect();

        let total = entries.len();
        let mut summary = ImportSummary::default();

        for (index, chunk) in entries.chunks(self.batch_size).enumerate() {
            let start = index * self.batch_size;
            let end = start + chunk.len();

            let kept = last_per_id(chunk);
            if kept.len() < chunk.len() {
                debug!(
                    start,
                    end,
                    dropped = chunk.len() - kept.len(),
                    "Collapsed repeated ticket ids in batch"
                );
            }

            let items = kept
                .iter()
                .map(|ticket| TicketRecord::from_ticket((*ticket).clone()).encode())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|cause| self.chunk_failed(start, end, &summary, cause))?;

            debug!(start, end, total, "Writing import batch");

            self.store
                .batch_put(items)
                .await
                .map_err(|e| self.chunk_failed(start, end, &summary, e.into()))?;

            summary.batches_written += 1;
            summary.tickets_written += kept.len();
        }

        info!(
            tickets = summary.tickets_written,
            batches = summary.batches_written,
            backend = self.store.backend_name(),
            "Bulk import complete"
        );

        Ok(summary)
    }

    fn chunk_failed(
        &self,
        start: usize,
        end: usize,
        summary: &ImportSummary,
        cause: TicketError,
    ) -> TicketError {
        error!(
            start,
            end,
            committed_batches = summary.batches_written,
            error = %cause,
            "Bulk import aborted"
        );
        TicketError::PartialBatchFailure {
            start,
            end,
            committed_batches: summary.batches_written,
            cause: Box::new(cause),
        }
    }
}

/// The last entry for each id, in the order those entries appear.
fn last_per_id(chunk: &[Ticket]) -> Vec<&Ticket> {
    let mut seen = HashSet::new();
    let mut kept: Vec<&Ticket> = chunk
        .iter()
        .rev()
        .filter(|ticket| seen.insert(ticket.id.as_str()))
        .collect();
    kept.reverse();
    kept
}

//! CSV decoding for bulk imports.
//!
//! Expected columns, in order: `id, description, status, assignedTo, createdBy`.
//! A first line whose first field is `id` is treated as a header and skipped.

use std::io::Read;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use super::{now_timestamp, Ticket, TicketError, TicketStatus, UNASSIGNED};

const COLUMNS: usize = 5;

/// Why a single CSV row was not turned into a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("expected 5 columns, found {0}")]
    TooFewColumns(usize),

    #[error("wrong column - id")]
    MissingId,

    #[error("wrong column - description")]
    MissingDescription,

    #[error("wrong column - status: {0:?}")]
    InvalidStatus(String),

    #[error("unreadable row: {0}")]
    Unreadable(String),
}

/// A rejected row and the 1-based line it started on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub line: u64,
    #[serde(serialize_with = "serialize_display")]
    pub error: RowError,
}

fn serialize_display<S: serde::Serializer>(error: &RowError, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(error)
}

/// Result of decoding an upload: the valid tickets plus every rejected row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvImport {
    pub tickets: Vec<Ticket>,
    pub rejected: Vec<RejectedRow>,
}

/// Decode a CSV upload into tickets.
///
/// Invalid rows are collected in [`CsvImport::rejected`] rather than failing the
/// whole upload. Only an I/O failure of `reader` is fatal.
pub fn parse_bulk_csv<R: Read>(reader: R) -> Result<CsvImport, TicketError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);

    let created_at = now_timestamp();
    let mut import = CsvImport::default();

    for (index, result) in csv_reader.records().enumerate() {
        let fallback_line = index as u64 + 1;

        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(TicketError::Io(e.into())),
            Err(e) => {
                let line = e.position().map_or(fallback_line, |p| p.line());
                warn!(line, error = %e, "Skipping unreadable CSV row");
                import.rejected.push(RejectedRow {
                    line,
                    error: RowError::Unreadable(e.to_string()),
                });
                continue;
            }
        };

        let line = record.position().map_or(fallback_line, |p| p.line());

        if index == 0 && is_header(&record) {
            debug!("Skipping CSV header row");
            continue;
        }

        match decode_row(&record, &created_at) {
            Ok(ticket) => import.tickets.push(ticket),
            Err(error) => {
                warn!(line, error = %error, "Rejected CSV row");
                import.rejected.push(RejectedRow { line, error });
            }
        }
    }

    debug!(
        accepted = import.tickets.len(),
        rejected = import.rejected.len(),
        "Decoded CSV upload"
    );

    Ok(import)
}

fn is_header(record: &csv::StringRecord) -> bool {
    record
        .get(0)
        .is_some_and(|field| field.eq_ignore_ascii_case("id"))
}

fn decode_row(record: &csv::StringRecord, created_at: &str) -> Result<Ticket, RowError> {
    if record.len() < COLUMNS {
        return Err(RowError::TooFewColumns(record.len()));
    }

    let field = |i: usize| record.get(i).unwrap_or_default();

    let id = field(0);
    if id.is_empty() {
        return Err(RowError::MissingId);
    }

    let description = field(1);
    if description.is_empty() {
        return Err(RowError::MissingDescription);
    }

    let status: TicketStatus = field(2)
        .parse()
        .map_err(|_| RowError::InvalidStatus(field(2).to_string()))?;

    let assigned_to = match field(3) {
        "" => UNASSIGNED,
        assignee => assignee,
    };

    Ok(Ticket {
        id: id.to_string(),
        description: description.to_string(),
        status,
        created_by: field(4).to_string(),
        created_at: created_at.to_string(),
        assigned_to: assigned_to.to_string(),
    })
}

//! Core ticket data types.

use std::fmt;
use std::str::FromStr;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::TicketError;

/// Assignee sentinel for tickets nobody has picked up yet.
pub const UNASSIGNED: &str = "None";

/// Lifecycle status of a ticket.
///
/// There is no terminal state: a closed ticket may be reopened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketStatus {
    #[default]
    Open,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 2] = [TicketStatus::Open, TicketStatus::Closed];

    /// Wire representation, as stored in the `status` attribute.
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "OPEN",
            TicketStatus::Closed => "CLOSED",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = TicketError;

    /// Exact, case-sensitive match against the wire representation.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(TicketStatus::Open),
            "CLOSED" => Ok(TicketStatus::Closed),
            other => Err(TicketError::InvalidStatus(other.to_string())),
        }
    }
}

/// A support ticket.
///
/// Field names on the wire follow the storage layout (`ticket_id`, `createdBy`, ...)
/// so the same serde representation is used for storage items and API payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque identifier, generated on create when empty.
    #[serde(rename = "ticket_id")]
    pub id: String,
    pub description: String,
    pub status: TicketStatus,
    #[serde(rename = "createdBy")]
    pub created_by: String,
    /// UTC timestamp, set once on create.
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "assignedTo")]
    pub assigned_to: String,
}

impl Ticket {
    /// A fresh, unassigned, open ticket without an id.
    pub fn new(description: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            description: description.into(),
            status: TicketStatus::Open,
            created_by: created_by.into(),
            created_at: now_timestamp(),
            assigned_to: UNASSIGNED.to_string(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_assignee(mut self, assignee: impl Into<String>) -> Self {
        self.assigned_to = assignee.into();
        self
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = status;
        self
    }

    /// Fill in whatever the caller left empty before the first write:
    /// id, creation timestamp and the unassigned sentinel.
    pub(crate) fn fill_creation_defaults(&mut self) {
        if self.id.is_empty() {
            self.id = new_ticket_id();
        }
        if self.created_at.is_empty() {
            self.created_at = now_timestamp();
        }
        if self.assigned_to.is_empty() {
            self.assigned_to = UNASSIGNED.to_string();
        }
    }
}

/// Generate a new globally-unique ticket id.
pub fn new_ticket_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current UTC time in the format stored in `createdAt`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

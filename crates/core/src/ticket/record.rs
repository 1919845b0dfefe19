//! Mapping between tickets and storage items.
//!
//! A ticket is stored under `PK = "#ticket#{id}"`, `SK = "details"`, with the ticket
//! attributes alongside the key pair. No other entity uses the `#ticket#` prefix.

use serde::ser::Error as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Ticket, TicketError};
use crate::store::{string_attribute, Item, ItemKey, PARTITION_KEY};

/// Partition key prefix for ticket items.
pub const TICKET_KEY_PREFIX: &str = "#ticket#";
/// Sort key of the ticket details item.
pub const DETAILS_SORT_KEY: &str = "details";
/// Attribute backing the assignee secondary index.
pub const ASSIGNED_TO_ATTRIBUTE: &str = "assignedTo";

/// Derive the storage key of the ticket with `id`.
pub fn ticket_key(id: &str) -> ItemKey {
    ItemKey::new(format!("{}{}", TICKET_KEY_PREFIX, id), DETAILS_SORT_KEY)
}

/// A ticket plus its derived key pair, as written to the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    #[serde(flatten)]
    pub ticket: Ticket,
    #[serde(rename = "PK")]
    pub partition_key: String,
    #[serde(rename = "SK")]
    pub sort_key: String,
}

impl TicketRecord {
    pub fn from_ticket(ticket: Ticket) -> Self {
        let key = ticket_key(&ticket.id);
        Self {
            ticket,
            partition_key: key.partition,
            sort_key: key.sort,
        }
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.partition_key.clone(), self.sort_key.clone())
    }

    /// Drop the key pair and hand back the ticket.
    pub fn into_ticket(self) -> Ticket {
        self.ticket
    }

    /// Convert into the store's attribute map.
    pub fn encode(&self) -> Result<Item, TicketError> {
        let encode_error = |source| TicketError::Encode {
            ticket_id: self.ticket.id.clone(),
            source,
        };

        match serde_json::to_value(self).map_err(encode_error)? {
            Value::Object(item) => Ok(item),
            other => Err(encode_error(serde_json::Error::custom(format!(
                "expected an attribute map, got {}",
                other
            )))),
        }
    }

    /// Convert a stored attribute map back into a record.
    pub fn decode(item: Item) -> Result<Self, TicketError> {
        let partition_key = string_attribute(&item, PARTITION_KEY)
            .unwrap_or_default()
            .to_string();

        serde_json::from_value(Value::Object(item)).map_err(|source| TicketError::Decode {
            partition_key,
            source,
        })
    }
}

/// Decode a stored item straight into the ticket it holds.
pub fn decode_ticket(item: Item) -> Result<Ticket, TicketError> {
    TicketRecord::decode(item).map(TicketRecord::into_ticket)
}

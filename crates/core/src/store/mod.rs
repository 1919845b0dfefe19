//! Schemaless document store backends.
//!
//! Items are flat attribute maps addressed by a partition/sort key pair stored in
//! the `PK` and `SK` attributes. Each backend maintains one secondary index on a
//! configured attribute, supporting equality lookups.

mod dynamodb;
mod memory;
mod sqlite;

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub use dynamodb::DynamoDbDocumentStore;
pub use memory::MemoryDocumentStore;
pub use sqlite::SqliteDocumentStore;

/// Storage-native representation of a record.
pub type Item = serde_json::Map<String, Value>;

/// Attribute holding the partition key.
pub const PARTITION_KEY: &str = "PK";
/// Attribute holding the sort key.
pub const SORT_KEY: &str = "SK";

/// Backend ceiling on put-operations per batched write.
pub const MAX_BATCH_ITEMS: usize = 40;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Item is missing string key attribute {0}")]
    MissingKey(&'static str),

    #[error("No secondary index on attribute {0}")]
    NoIndex(String),

    #[error("Batch of {size} items exceeds the limit of {limit}")]
    BatchTooLarge { size: usize, limit: usize },

    #[error("Backend left {0} items unprocessed")]
    Unprocessed(usize),

    /// A batched write may not carry the same key twice.
    #[error("Batch contains key {0} more than once")]
    DuplicateKey(ItemKey),
}

impl StoreError {
    pub(crate) fn backend(err: impl fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Primary key of an item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }

    /// Read the key pair out of an item's `PK`/`SK` attributes.
    pub fn of(item: &Item) -> Result<Self, StoreError> {
        let partition = item
            .get(PARTITION_KEY)
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingKey(PARTITION_KEY))?;
        let sort = item
            .get(SORT_KEY)
            .and_then(Value::as_str)
            .ok_or(StoreError::MissingKey(SORT_KEY))?;
        Ok(Self::new(partition, sort))
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition, self.sort)
    }
}

/// Trait for document store backends.
///
/// Single-item writes are atomic; nothing else is. There is no conditional write,
/// so concurrent read-modify-write cycles on the same key resolve last-write-wins.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs.
    fn backend_name(&self) -> &'static str;

    /// Unconditionally write an item, replacing whatever is stored at its key.
    async fn put_item(&self, item: Item) -> Result<(), StoreError>;

    /// Fetch the item stored at `key`.
    async fn get_item(&self, key: &ItemKey) -> Result<Option<Item>, StoreError>;

    /// All items whose `attribute` equals `value`, via the secondary index.
    async fn query_index(&self, attribute: &str, value: &str) -> Result<Vec<Item>, StoreError>;

    /// Write up to [`MAX_BATCH_ITEMS`] items with distinct keys in one call.
    async fn batch_put(&self, items: Vec<Item>) -> Result<(), StoreError>;
}

pub(crate) fn check_batch_size(size: usize) -> Result<(), StoreError> {
    if size > MAX_BATCH_ITEMS {
        return Err(StoreError::BatchTooLarge {
            size,
            limit: MAX_BATCH_ITEMS,
        });
    }
    Ok(())
}

pub(crate) fn check_unique_keys<'a>(
    keys: impl IntoIterator<Item = &'a ItemKey>,
) -> Result<(), StoreError> {
    let mut seen = HashSet::new();
    for key in keys {
        if !seen.insert(key) {
            return Err(StoreError::DuplicateKey(key.clone()));
        }
    }
    Ok(())
}

/// The string value of `attribute`, if the item carries one.
pub(crate) fn string_attribute<'a>(item: &'a Item, attribute: &str) -> Option<&'a str> {
    item.get(attribute).and_then(Value::as_str)
}

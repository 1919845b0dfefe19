//! Mock document store for testing.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{DocumentStore, Item, ItemKey, MemoryDocumentStore, StoreError};
use crate::ticket::ASSIGNED_TO_ATTRIBUTE;

/// A store call, in the order it was made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Put,
    Get,
    Query,
    BatchPut,
}

/// Mock implementation of the DocumentStore trait.
///
/// Stores items in a [`MemoryDocumentStore`] indexed on `assignedTo` and provides
/// controllable behavior for testing:
/// - Record every call and every attempted batch
/// - Fail the next single-item call
/// - Fail a specific batched-write call by its 1-based number
///
/// # Example
///
/// ```rust,ignore
/// use ticketdesk_core::testing::MockDocumentStore;
///
/// let store = MockDocumentStore::new();
/// store.fail_batch_call(2, StoreError::Backend("throttled".into())).await;
///
/// // ... run an import ...
///
/// assert_eq!(store.batch_sizes().await, vec![40, 40]);
/// ```
#[derive(Debug)]
pub struct MockDocumentStore {
    inner: MemoryDocumentStore,
    /// Every call made, successful or not.
    operations: RwLock<Vec<StoreOperation>>,
    /// Items of every attempted batched write.
    batches: RwLock<Vec<Vec<Item>>>,
    /// Batched-write call number (1-based) to the error it should return.
    batch_failures: RwLock<HashMap<usize, StoreError>>,
    /// If set, the next single-item call will fail with this error.
    next_error: RwLock<Option<StoreError>>,
}

impl Default for MockDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDocumentStore {
    /// Create a new, empty mock store.
    pub fn new() -> Self {
        Self {
            inner: MemoryDocumentStore::new(ASSIGNED_TO_ATTRIBUTE),
            operations: RwLock::new(Vec::new()),
            batches: RwLock::new(Vec::new()),
            batch_failures: RwLock::new(HashMap::new()),
            next_error: RwLock::new(None),
        }
    }

    /// Configure the next put/get/query to fail with the given error.
    pub async fn set_next_error(&self, error: StoreError) {
        *self.next_error.write().await = Some(error);
    }

    /// Configure the `call`-th batched write (1-based) to fail with the given error.
    pub async fn fail_batch_call(&self, call: usize, error: StoreError) {
        self.batch_failures.write().await.insert(call, error);
    }

    /// Get all recorded operations.
    pub async fn operations(&self) -> Vec<StoreOperation> {
        self.operations.read().await.clone()
    }

    /// Number of recorded calls of one kind.
    pub async fn operation_count(&self, operation: StoreOperation) -> usize {
        self.operations
            .read()
            .await
            .iter()
            .filter(|op| **op == operation)
            .count()
    }

    /// Items of every attempted batched write, failed ones included.
    pub async fn recorded_batches(&self) -> Vec<Vec<Item>> {
        self.batches.read().await.clone()
    }

    /// Sizes of every attempted batched write.
    pub async fn batch_sizes(&self) -> Vec<usize> {
        self.batches.read().await.iter().map(Vec::len).collect()
    }

    /// Number of items actually stored.
    pub async fn item_count(&self) -> usize {
        self.inner.len().await
    }

    async fn record(&self, operation: StoreOperation) {
        self.operations.write().await.push(operation);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<StoreError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    fn backend_name(&self) -> &'static str {
        "mock"
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        self.record(StoreOperation::Put).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.inner.put_item(item).await
    }

    async fn get_item(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        self.record(StoreOperation::Get).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.inner.get_item(key).await
    }

    async fn query_index(&self, attribute: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        self.record(StoreOperation::Query).await;
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        self.inner.query_index(attribute, value).await
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<(), StoreError> {
        self.record(StoreOperation::BatchPut).await;

        let call = {
            let mut batches = self.batches.write().await;
            batches.push(items.clone());
            batches.len()
        };

        if let Some(err) = self.batch_failures.write().await.remove(&call) {
            return Err(err);
        }
        self.inner.batch_put(items).await
    }
}

//! In-memory document store (tests and local runs).

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{
    check_batch_size, check_unique_keys, string_attribute, DocumentStore, Item, ItemKey,
    StoreError,
};

/// Document store kept entirely in process memory.
///
/// The secondary index is maintained on every write, so index queries never scan
/// the item table.
#[derive(Debug)]
pub struct MemoryDocumentStore {
    index_attribute: String,
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    items: BTreeMap<ItemKey, Item>,
    index: HashMap<String, BTreeSet<ItemKey>>,
}

impl Tables {
    fn put(&mut self, index_attribute: &str, key: ItemKey, item: Item) {
        let previous = self
            .items
            .get(&key)
            .and_then(|old| string_attribute(old, index_attribute))
            .map(str::to_owned);

        if let Some(previous) = previous {
            if let Some(keys) = self.index.get_mut(&previous) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.index.remove(&previous);
                }
            }
        }

        if let Some(value) = string_attribute(&item, index_attribute) {
            self.index
                .entry(value.to_string())
                .or_default()
                .insert(key.clone());
        }

        self.items.insert(key, item);
    }
}

impl MemoryDocumentStore {
    /// Create an empty store indexing `index_attribute`.
    pub fn new(index_attribute: impl Into<String>) -> Self {
        Self {
            index_attribute: index_attribute.into(),
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Number of stored items.
    pub async fn len(&self) -> usize {
        self.tables.read().await.items.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tables.read().await.items.is_empty()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let key = ItemKey::of(&item)?;
        self.tables
            .write()
            .await
            .put(&self.index_attribute, key, item);
        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        Ok(self.tables.read().await.items.get(key).cloned())
    }

    async fn query_index(&self, attribute: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        if attribute != self.index_attribute {
            return Err(StoreError::NoIndex(attribute.to_string()));
        }

        let tables = self.tables.read().await;
        let items: Vec<Item> = tables
            .index
            .get(value)
            .map(|keys| {
                keys.iter()
                    .filter_map(|key| tables.items.get(key).cloned())
                    .collect()
            })
            .unwrap_or_default();
        Ok(items)
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<(), StoreError> {
        check_batch_size(items.len())?;

        // Resolve every key before touching the tables so a bad item writes nothing.
        let keyed = items
            .into_iter()
            .map(|item| ItemKey::of(&item).map(|key| (key, item)))
            .collect::<Result<Vec<_>, _>>()?;
        check_unique_keys(keyed.iter().map(|(key, _)| key))?;

        let mut tables = self.tables.write().await;
        for (key, item) in keyed {
            tables.put(&self.index_attribute, key, item);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn item(pk: &str, owner: &str) -> Item {
        match json!({"PK": pk, "SK": "details", "owner": owner}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let store = MemoryDocumentStore::new("owner");
        store.put_item(item("a", "bob")).await.unwrap();

        let fetched = store
            .get_item(&ItemKey::new("a", "details"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fetched["owner"], "bob");
        assert!(store
            .get_item(&ItemKey::new("missing", "details"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_put_requires_key_attributes() {
        let store = MemoryDocumentStore::new("owner");
        let mut bad = item("a", "bob");
        bad.remove("SK");

        let result = store.put_item(bad).await;
        assert!(matches!(result, Err(StoreError::MissingKey("SK"))));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_index_follows_overwrites() {
        let store = MemoryDocumentStore::new("owner");
        store.put_item(item("a", "bob")).await.unwrap();
        store.put_item(item("b", "bob")).await.unwrap();
        store.put_item(item("a", "carol")).await.unwrap();

        let bob = store.query_index("owner", "bob").await.unwrap();
        assert_eq!(bob.len(), 1);
        assert_eq!(bob[0]["PK"], "b");

        let carol = store.query_index("owner", "carol").await.unwrap();
        assert_eq!(carol.len(), 1);
        assert_eq!(carol[0]["PK"], "a");
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_query_without_matches_is_empty() {
        let store = MemoryDocumentStore::new("owner");
        store.put_item(item("a", "bob")).await.unwrap();
        assert!(store.query_index("owner", "zed").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_unindexed_attribute_fails() {
        let store = MemoryDocumentStore::new("owner");
        let result = store.query_index("status", "OPEN").await;
        assert!(matches!(result, Err(StoreError::NoIndex(_))));
    }

    #[tokio::test]
    async fn test_batch_put_rejects_oversized_batches() {
        let store = MemoryDocumentStore::new("owner");
        let items = (0..41).map(|i| item(&format!("k{}", i), "bob")).collect();

        let result = store.batch_put(items).await;
        assert!(matches!(result, Err(StoreError::BatchTooLarge { .. })));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_put_with_bad_item_writes_nothing() {
        let store = MemoryDocumentStore::new("owner");
        let mut bad = item("b", "bob");
        bad.remove("PK");

        let result = store.batch_put(vec![item("a", "bob"), bad]).await;
        assert!(result.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_batch_put_rejects_repeated_key() {
        let store = MemoryDocumentStore::new("owner");

        let result = store
            .batch_put(vec![item("a", "bob"), item("b", "bob"), item("a", "carol")])
            .await;

        match result {
            Err(StoreError::DuplicateKey(key)) => assert_eq!(key, ItemKey::new("a", "details")),
            other => panic!("expected duplicate key, got {:?}", other),
        }
        assert!(store.is_empty().await);
    }
}

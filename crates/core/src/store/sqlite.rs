//! SQLite-backed document store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};

use super::{
    check_batch_size, check_unique_keys, string_attribute, DocumentStore, Item, ItemKey,
    StoreError,
};

const UPSERT_SQL: &str = "INSERT OR REPLACE INTO items (pk, sk, index_value, document) VALUES (?1, ?2, ?3, ?4)";

/// SQLite-backed document store.
///
/// Items are stored as JSON documents; the indexed attribute is copied into its own
/// column so index lookups hit `idx_items_index_value` instead of scanning documents.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
    index_attribute: String,
}

impl SqliteDocumentStore {
    /// Create a new SQLite document store, creating the database file and tables if needed.
    pub fn new(path: &Path, index_attribute: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(StoreError::backend)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            index_attribute: index_attribute.into(),
        })
    }

    /// Create an in-memory SQLite document store (useful for testing).
    pub fn in_memory(index_attribute: impl Into<String>) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(StoreError::backend)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            index_attribute: index_attribute.into(),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                pk TEXT NOT NULL,
                sk TEXT NOT NULL,
                index_value TEXT,
                document TEXT NOT NULL,
                PRIMARY KEY (pk, sk)
            );

            CREATE INDEX IF NOT EXISTS idx_items_index_value ON items(index_value);
            "#,
        )
        .map_err(StoreError::backend)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("connection lock poisoned".to_string()))
    }

    fn parse_document(document: &str) -> Result<Item, StoreError> {
        serde_json::from_str(document)
            .map_err(|e| StoreError::Backend(format!("corrupt document: {}", e)))
    }

    /// Key, index value and serialized document for one row.
    fn row_values(&self, item: &Item) -> Result<(ItemKey, Option<String>, String), StoreError> {
        let key = ItemKey::of(item)?;
        let index_value = string_attribute(item, &self.index_attribute).map(str::to_owned);
        let document = serde_json::to_string(item).map_err(StoreError::backend)?;
        Ok((key, index_value, document))
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        let (key, index_value, document) = self.row_values(&item)?;
        let conn = self.conn()?;

        conn.execute(
            UPSERT_SQL,
            params![key.partition, key.sort, index_value, document],
        )
        .map_err(StoreError::backend)?;

        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        let conn = self.conn()?;

        let document: Option<String> = conn
            .query_row(
                "SELECT document FROM items WHERE pk = ?1 AND sk = ?2",
                params![key.partition, key.sort],
                |row| row.get(0),
            )
            .optional()
            .map_err(StoreError::backend)?;

        document.as_deref().map(Self::parse_document).transpose()
    }

    async fn query_index(&self, attribute: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        if attribute != self.index_attribute {
            return Err(StoreError::NoIndex(attribute.to_string()));
        }

        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT document FROM items WHERE index_value = ?1 ORDER BY pk, sk")
            .map_err(StoreError::backend)?;

        let rows = stmt
            .query_map(params![value], |row| row.get::<_, String>(0))
            .map_err(StoreError::backend)?;

        let mut items = Vec::new();
        for row_result in rows {
            let document = row_result.map_err(StoreError::backend)?;
            items.push(Self::parse_document(&document)?);
        }

        Ok(items)
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<(), StoreError> {
        check_batch_size(items.len())?;

        let rows = items
            .iter()
            .map(|item| self.row_values(item))
            .collect::<Result<Vec<_>, _>>()?;
        check_unique_keys(rows.iter().map(|(key, _, _)| key))?;

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(StoreError::backend)?;
        {
            let mut stmt = tx.prepare(UPSERT_SQL).map_err(StoreError::backend)?;
            for (key, index_value, document) in &rows {
                stmt.execute(params![key.partition, key.sort, index_value, document])
                    .map_err(StoreError::backend)?;
            }
        }
        tx.commit().map_err(StoreError::backend)?;

        Ok(())
    }
}

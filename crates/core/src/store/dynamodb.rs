//! DynamoDB-backed document store.
//!
//! ## Table Schema
//! ```text
//! Partition Key: PK (S)   "#ticket#{id}"
//! Sort Key:      SK (S)   "details"
//! GSI:           {index_name}, partition key = indexed attribute (S)
//! ```
//!
//! JSON values map onto DynamoDB attribute values as strings (`S`), numbers (`N`),
//! booleans (`BOOL`), nulls (`NULL`), arrays (`L`) and objects (`M`).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::config::timeout::TimeoutConfig;
use aws_sdk_dynamodb::config::Region;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::get_item::builders::GetItemFluentBuilder;
use aws_sdk_dynamodb::types::{AttributeValue, PutRequest, WriteRequest};
use aws_sdk_dynamodb::Client;
use serde_json::Value;
use tracing::{debug, warn};

use super::{
    check_batch_size, check_unique_keys, DocumentStore, Item, ItemKey, StoreError, PARTITION_KEY, SORT_KEY,
};
use crate::config::DynamoDbConfig;

type AttributeMap = HashMap<String, AttributeValue>;

/// DynamoDB document store.
///
/// The client is built once at startup and shared; it holds no per-request state.
#[derive(Clone)]
pub struct DynamoDbDocumentStore {
    client: Client,
    table_name: String,
    index_name: String,
    index_attribute: String,
}

impl std::fmt::Debug for DynamoDbDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamoDbDocumentStore")
            .field("table_name", &self.table_name)
            .field("index_name", &self.index_name)
            .field("index_attribute", &self.index_attribute)
            .finish()
    }
}

impl DynamoDbDocumentStore {
    /// Build the client from a loaded SDK config, applying the region, endpoint and
    /// timeout overrides from `config`.
    pub fn new(
        sdk_config: &aws_config::SdkConfig,
        config: &DynamoDbConfig,
        index_attribute: impl Into<String>,
    ) -> Self {
        let mut builder = aws_sdk_dynamodb::config::Builder::from(sdk_config);

        if let Some(region) = &config.region {
            builder = builder.region(Region::new(region.clone()));
        }

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        if let Some(timeout_ms) = config.timeout_ms {
            let timeout_config = TimeoutConfig::builder()
                .operation_timeout(Duration::from_millis(timeout_ms))
                .build();
            builder = builder.timeout_config(timeout_config);
        }

        Self::from_client(
            Client::from_conf(builder.build()),
            config.table_name.clone(),
            config.index_name.clone(),
            index_attribute,
        )
    }

    /// Load the SDK config from the default provider chain (env, profile, IMDS).
    pub async fn from_env(config: &DynamoDbConfig, index_attribute: impl Into<String>) -> Self {
        let sdk_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(&sdk_config, config, index_attribute)
    }

    /// Create from a pre-built client.
    pub fn from_client(
        client: Client,
        table_name: String,
        index_name: String,
        index_attribute: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table_name,
            index_name,
            index_attribute: index_attribute.into(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Point reads are strongly consistent so a read right after a write sees it.
    fn get_item_request(&self, key: &ItemKey) -> GetItemFluentBuilder {
        self.client
            .get_item()
            .table_name(&self.table_name)
            .key(PARTITION_KEY, AttributeValue::S(key.partition.clone()))
            .key(SORT_KEY, AttributeValue::S(key.sort.clone()))
            .consistent_read(true)
    }
}

fn sdk_error<E>(operation: &str, err: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Backend(format!(
        "DynamoDB {} failed: {}",
        operation,
        DisplayErrorContext(err)
    ))
}

fn to_attribute_value(value: Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s),
        Value::Array(values) => {
            AttributeValue::L(values.into_iter().map(to_attribute_value).collect())
        }
        Value::Object(map) => AttributeValue::M(to_attribute_map(map)),
    }
}

fn to_attribute_map(item: Item) -> AttributeMap {
    item.into_iter()
        .map(|(name, value)| (name, to_attribute_value(value)))
        .collect()
}

fn from_attribute_value(value: &AttributeValue) -> Result<Value, StoreError> {
    match value {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => serde_json::from_str::<serde_json::Number>(n)
            .map(Value::Number)
            .map_err(|e| StoreError::Backend(format!("invalid number attribute {}: {}", n, e))),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::L(values) => values
            .iter()
            .map(from_attribute_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        AttributeValue::M(map) => from_attribute_map(map).map(Value::Object),
        other => Err(StoreError::Backend(format!(
            "unsupported attribute type: {:?}",
            other
        ))),
    }
}

fn from_attribute_map(map: &AttributeMap) -> Result<Item, StoreError> {
    map.iter()
        .map(|(name, value)| -> Result<(String, Value), StoreError> {
            Ok((name.clone(), from_attribute_value(value)?))
        })
        .collect()
}

#[async_trait]
impl DocumentStore for DynamoDbDocumentStore {
    fn backend_name(&self) -> &'static str {
        "dynamodb"
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        ItemKey::of(&item)?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(to_attribute_map(item)))
            .send()
            .await
            .map_err(|e| sdk_error("PutItem", e))?;

        Ok(())
    }

    async fn get_item(&self, key: &ItemKey) -> Result<Option<Item>, StoreError> {
        let response = self
            .get_item_request(key)
            .send()
            .await
            .map_err(|e| sdk_error("GetItem", e))?;

        response.item().map(from_attribute_map).transpose()
    }

    /// Global secondary indexes only serve eventually consistent reads, so a
    /// freshly written assignee may be missing from the result for a moment.
    async fn query_index(&self, attribute: &str, value: &str) -> Result<Vec<Item>, StoreError> {
        if attribute != self.index_attribute {
            return Err(StoreError::NoIndex(attribute.to_string()));
        }

        let mut items = Vec::new();
        let mut last_evaluated_key: Option<AttributeMap> = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .index_name(&self.index_name)
                .key_condition_expression("#attr = :value")
                .expression_attribute_names("#attr", attribute)
                .expression_attribute_values(":value", AttributeValue::S(value.to_string()));

            if let Some(key) = last_evaluated_key.take() {
                request = request.set_exclusive_start_key(Some(key));
            }

            let response = request
                .send()
                .await
                .map_err(|e| sdk_error("Query", e))?;

            for item in response.items() {
                items.push(from_attribute_map(item)?);
            }

            match response.last_evaluated_key() {
                Some(key) if !key.is_empty() => {
                    debug!(index = %self.index_name, fetched = items.len(), "Query page boundary");
                    last_evaluated_key = Some(key.clone());
                }
                _ => break,
            }
        }

        Ok(items)
    }

    async fn batch_put(&self, items: Vec<Item>) -> Result<(), StoreError> {
        check_batch_size(items.len())?;
        if items.is_empty() {
            return Ok(());
        }

        let keys = items.iter().map(ItemKey::of).collect::<Result<Vec<_>, _>>()?;
        check_unique_keys(&keys)?;

        let requests = items
            .into_iter()
            .map(|item| -> Result<WriteRequest, StoreError> {
                let put = PutRequest::builder()
                    .set_item(Some(to_attribute_map(item)))
                    .build()
                    .map_err(StoreError::backend)?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect::<Result<Vec<_>, _>>()?;

        let response = self
            .client
            .batch_write_item()
            .request_items(&self.table_name, requests)
            .send()
            .await
            .map_err(|e| sdk_error("BatchWriteItem", e))?;

        let unprocessed: usize = response
            .unprocessed_items()
            .map(|tables| tables.values().map(Vec::len).sum())
            .unwrap_or(0);

        if unprocessed > 0 {
            warn!(
                table = %self.table_name,
                unprocessed,
                "BatchWriteItem returned unprocessed items"
            );
            return Err(StoreError::Unprocessed(unprocessed));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Item {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_ticket_item_maps_to_string_attributes() {
        let item = object(json!({
            "PK": "#ticket#1",
            "SK": "details",
            "ticket_id": "1",
            "status": "OPEN",
            "assignedTo": "None",
        }));

        let attributes = to_attribute_map(item);

        assert_eq!(
            attributes.get("PK"),
            Some(&AttributeValue::S("#ticket#1".to_string()))
        );
        assert_eq!(
            attributes.get("status"),
            Some(&AttributeValue::S("OPEN".to_string()))
        );
        assert_eq!(attributes.len(), 5);
    }

    #[test]
    fn test_attribute_conversion_round_trip() {
        let item = object(json!({
            "PK": "#ticket#1",
            "SK": "details",
            "count": 3,
            "ratio": 0.5,
            "flag": true,
            "nothing": null,
            "tags": ["a", "b"],
            "nested": {"k": "v"},
        }));

        let attributes = to_attribute_map(item.clone());
        assert_eq!(attributes.get("count"), Some(&AttributeValue::N("3".to_string())));
        assert_eq!(attributes.get("flag"), Some(&AttributeValue::Bool(true)));
        assert_eq!(attributes.get("nothing"), Some(&AttributeValue::Null(true)));

        let back = from_attribute_map(&attributes).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_invalid_number_attribute() {
        let mut attributes = AttributeMap::new();
        attributes.insert("n".to_string(), AttributeValue::N("not-a-number".to_string()));
        assert!(matches!(
            from_attribute_map(&attributes),
            Err(StoreError::Backend(_))
        ));
    }

    #[test]
    fn test_unsupported_attribute_type() {
        let mut attributes = AttributeMap::new();
        attributes.insert(
            "set".to_string(),
            AttributeValue::Ss(vec!["a".to_string()]),
        );
        assert!(matches!(
            from_attribute_map(&attributes),
            Err(StoreError::Backend(_))
        ));
    }

    fn offline_store() -> DynamoDbDocumentStore {
        let config = aws_sdk_dynamodb::Config::builder()
            .behavior_version(aws_sdk_dynamodb::config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .build();
        DynamoDbDocumentStore::from_client(
            Client::from_conf(config),
            "tickets_poc".to_string(),
            "AssignedTo".to_string(),
            "assignedTo",
        )
    }

    #[test]
    fn test_get_item_is_strongly_consistent() {
        let store = offline_store();
        let key = ItemKey {
            partition: "#ticket#1".to_string(),
            sort: "details".to_string(),
        };

        let request = store.get_item_request(&key);

        assert_eq!(request.get_consistent_read(), &Some(true));
        assert_eq!(request.get_table_name().as_deref(), Some("tickets_poc"));
        let sent_key = request.get_key().as_ref().unwrap();
        assert_eq!(
            sent_key.get("PK"),
            Some(&AttributeValue::S("#ticket#1".to_string()))
        );
        assert_eq!(
            sent_key.get("SK"),
            Some(&AttributeValue::S("details".to_string()))
        );
    }

    #[test]
    fn test_debug_hides_client() {
        let store = offline_store();

        let debug = format!("{:?}", store);
        assert!(debug.contains("tickets_poc"));
        assert!(debug.contains("AssignedTo"));
        assert_eq!(store.table_name(), "tickets_poc");
        assert_eq!(store.backend_name(), "dynamodb");
    }
}

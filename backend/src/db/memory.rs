use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{matches_predicate, Collection, EntityStore};
use crate::error::StoreError;

/// Process-local entity store for development and tests.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    collections: RwLock<HashMap<Collection, Vec<Value>>>,
    unavailable: RwLock<HashSet<Collection>>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert rows as-is, assigning `id` and `created_date` only when missing.
    pub async fn seed(&self, collection: Collection, rows: Vec<Value>) {
        let mut collections = self.collections.write().await;
        let records = collections.entry(collection).or_default();
        for row in rows {
            let mut fields = match row {
                Value::Object(fields) => fields,
                other => {
                    // Kept verbatim so decoding can exercise dirty data
                    records.push(other);
                    continue;
                }
            };
            fields
                .entry("id")
                .or_insert_with(|| json!(Uuid::new_v4().to_string()));
            fields
                .entry("created_date")
                .or_insert_with(|| json!(Utc::now().to_rfc3339()));
            records.push(Value::Object(fields));
        }
    }

    /// Make every call against `collection` fail as if the backend were down.
    pub async fn set_unavailable(&self, collection: Collection, unavailable: bool) {
        let mut set = self.unavailable.write().await;
        if unavailable {
            set.insert(collection);
        } else {
            set.remove(&collection);
        }
    }

    async fn ensure_available(&self, collection: Collection) -> Result<(), StoreError> {
        if self.unavailable.read().await.contains(&collection) {
            return Err(StoreError::Status {
                status: 503,
                body: format!("{} is unavailable", collection),
            });
        }
        Ok(())
    }

    fn not_found(collection: Collection, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

fn object_fields(fields: Value) -> Result<Map<String, Value>, StoreError> {
    match fields {
        Value::Object(map) => Ok(map),
        _ => Err(StoreError::InvalidPayload(
            "entity fields must be a JSON object".to_string(),
        )),
    }
}

fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

#[async_trait]
impl EntityStore for MemoryEntityStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        self.ensure_available(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).cloned().unwrap_or_default())
    }

    async fn filter(&self, collection: Collection, predicate: &Value) -> Result<Vec<Value>, StoreError> {
        self.ensure_available(collection).await?;
        let collections = self.collections.read().await;
        Ok(collections
            .get(&collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| matches_predicate(record, predicate))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError> {
        self.ensure_available(collection).await?;
        let collections = self.collections.read().await;
        collections
            .get(&collection)
            .and_then(|records| records.iter().find(|r| record_id(r) == Some(id)))
            .cloned()
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn create(&self, collection: Collection, fields: Value) -> Result<Value, StoreError> {
        self.ensure_available(collection).await?;
        let mut fields = object_fields(fields)?;
        fields.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
        fields.insert("created_date".to_string(), json!(Utc::now().to_rfc3339()));
        let record = Value::Object(fields);

        let mut collections = self.collections.write().await;
        collections.entry(collection).or_default().push(record.clone());
        Ok(record)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, StoreError> {
        self.ensure_available(collection).await?;
        let fields = object_fields(fields)?;

        let mut collections = self.collections.write().await;
        let record = collections
            .get_mut(&collection)
            .and_then(|records| records.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or_else(|| Self::not_found(collection, id))?;

        if let Value::Object(existing) = record {
            for (key, value) in fields {
                // Identity and creation time are owned by the store
                if key != "id" && key != "created_date" {
                    existing.insert(key, value);
                }
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        self.ensure_available(collection).await?;
        let mut collections = self.collections.write().await;
        let records = collections
            .get_mut(&collection)
            .ok_or_else(|| Self::not_found(collection, id))?;

        let before = records.len();
        records.retain(|r| record_id(r) != Some(id));
        if records.len() == before {
            return Err(Self::not_found(collection, id));
        }
        Ok(())
    }
}

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod postgres;

pub use connection::{get_db_pool, DatabaseConfig};
pub use memory::MemoryEntityStore;
pub use postgres::PgEntityStore;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::fmt;

use crate::constants::*;
use crate::error::StoreError;

/// Named collections the community backend reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    SocialProfile,
    Connection,
    Conversation,
    Article,
    Notification,
    User,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::SocialProfile => SOCIAL_PROFILE_COLLECTION,
            Collection::Connection => CONNECTION_COLLECTION,
            Collection::Conversation => CONVERSATION_COLLECTION,
            Collection::Article => ARTICLE_COLLECTION,
            Collection::Notification => NOTIFICATION_COLLECTION,
            Collection::User => USER_COLLECTION,
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generic CRUD over JSON records. Every backend that satisfies these
/// contracts is interchangeable.
///
/// Records carry a string `id` and a `created_date` assigned by the store.
/// `filter` takes a JSON object whose fields must all equal the record's.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError>;

    async fn filter(&self, collection: Collection, predicate: &Value) -> Result<Vec<Value>, StoreError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError>;

    async fn create(&self, collection: Collection, fields: Value) -> Result<Value, StoreError>;

    /// Merge `fields` into the record and return the updated record.
    async fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, StoreError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError>;
}

/// Decode rows into `T`, skipping (and logging) any that don't fit.
pub fn decode_records<T: DeserializeOwned>(collection: Collection, rows: Vec<Value>) -> Vec<T> {
    let total = rows.len();
    let decoded: Vec<T> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value(row) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::debug!("Skipping malformed {} record: {}", collection, e);
                None
            }
        })
        .collect();

    if decoded.len() < total {
        tracing::warn!("Skipped {} malformed {} records", total - decoded.len(), collection);
    }
    decoded
}

pub async fn list_records<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: Collection,
) -> Result<Vec<T>, StoreError> {
    let rows = store.list(collection).await?;
    Ok(decode_records(collection, rows))
}

pub async fn filter_records<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: Collection,
    predicate: &Value,
) -> Result<Vec<T>, StoreError> {
    let rows = store.filter(collection, predicate).await?;
    Ok(decode_records(collection, rows))
}

pub async fn get_record<T: DeserializeOwned>(
    store: &dyn EntityStore,
    collection: Collection,
    id: &str,
) -> Result<T, StoreError> {
    let row = store.get(collection, id).await?;
    Ok(serde_json::from_value(row)?)
}

pub async fn create_record<T: DeserializeOwned, N: Serialize + Sync>(
    store: &dyn EntityStore,
    collection: Collection,
    fields: &N,
) -> Result<T, StoreError> {
    let row = store.create(collection, serde_json::to_value(fields)?).await?;
    Ok(serde_json::from_value(row)?)
}

/// True when every field of `predicate` is present in `record` with an equal value.
/// A null or empty predicate matches everything.
pub fn matches_predicate(record: &Value, predicate: &Value) -> bool {
    match predicate {
        Value::Null => true,
        Value::Object(fields) => fields
            .iter()
            .all(|(key, expected)| record.get(key) == Some(expected)),
        _ => false,
    }
}

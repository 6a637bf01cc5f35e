use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use sqlx::{FromRow, PgPool, types::Json};
use uuid::Uuid;

use super::{Collection, EntityStore};
use crate::error::StoreError;

/// Entity store backed by a single JSONB table in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct EntityRow {
    id: Uuid,
    data: Json<Value>,
    created_date: DateTime<Utc>,
    updated_date: DateTime<Utc>,
}

impl EntityRow {
    fn into_record(self) -> Value {
        let mut data = self.data.0;
        if let Value::Object(fields) = &mut data {
            fields.insert("id".to_string(), json!(self.id.to_string()));
            fields.insert("created_date".to_string(), json!(self.created_date.to_rfc3339()));
            fields.insert("updated_date".to_string(), json!(self.updated_date.to_rfc3339()));
        }
        data
    }
}

/// Strip store-owned keys so they never end up inside `data`.
fn payload(fields: Value) -> Result<Value, StoreError> {
    match fields {
        Value::Object(mut map) => {
            for key in ["id", "created_date", "updated_date"] {
                map.remove(key);
            }
            Ok(Value::Object(map))
        }
        _ => Err(StoreError::InvalidPayload(
            "entity fields must be a JSON object".to_string(),
        )),
    }
}

impl PgEntityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn not_found(collection: Collection, id: &str) -> StoreError {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    fn parse_id(collection: Collection, id: &str) -> Result<Uuid, StoreError> {
        Uuid::parse_str(id).map_err(|_| Self::not_found(collection, id))
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let rows = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, data, created_date, updated_date
            FROM entities
            WHERE collection = $1
            ORDER BY created_date DESC
            "#,
        )
        .bind(collection.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntityRow::into_record).collect())
    }

    async fn filter(&self, collection: Collection, predicate: &Value) -> Result<Vec<Value>, StoreError> {
        let predicate = match predicate {
            Value::Null => Value::Object(Map::new()),
            Value::Object(_) => predicate.clone(),
            _ => {
                return Err(StoreError::InvalidPayload(
                    "filter predicate must be a JSON object".to_string(),
                ));
            }
        };

        let rows = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, data, created_date, updated_date
            FROM entities
            WHERE collection = $1 AND data @> $2
            ORDER BY created_date DESC
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(predicate))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EntityRow::into_record).collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError> {
        let uuid = Self::parse_id(collection, id)?;
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT id, data, created_date, updated_date
            FROM entities
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await?;

        row.map(EntityRow::into_record)
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn create(&self, collection: Collection, fields: Value) -> Result<Value, StoreError> {
        let data = payload(fields)?;
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            INSERT INTO entities (id, collection, data)
            VALUES ($1, $2, $3)
            RETURNING id, data, created_date, updated_date
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(collection.as_str())
        .bind(Json(data))
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into_record())
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, StoreError> {
        let uuid = Self::parse_id(collection, id)?;
        let data = payload(fields)?;
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            UPDATE entities
            SET data = data || $3, updated_date = NOW()
            WHERE collection = $1 AND id = $2
            RETURNING id, data, created_date, updated_date
            "#,
        )
        .bind(collection.as_str())
        .bind(uuid)
        .bind(Json(data))
        .fetch_optional(&self.pool)
        .await?;

        row.map(EntityRow::into_record)
            .ok_or_else(|| Self::not_found(collection, id))
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let uuid = Self::parse_id(collection, id)?;
        let result = sqlx::query(
            r#"
            DELETE FROM entities
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(uuid)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(collection, id));
        }
        Ok(())
    }
}

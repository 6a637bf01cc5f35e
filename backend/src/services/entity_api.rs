use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::constants::ENTITY_API_KEY_HEADER;
use crate::db::{Collection, EntityStore};
use crate::error::StoreError;

/// Client for the hosted entity API (`{base}/entities/{Collection}`).
#[derive(Debug, Clone)]
pub struct HttpEntityStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpEntityStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn collection_url(&self, collection: Collection) -> String {
        format!("{}/entities/{}", self.base_url, collection)
    }

    fn record_url(&self, collection: Collection, id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), id)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.api_key {
            Some(key) => builder.header(ENTITY_API_KEY_HEADER, key),
            None => builder,
        }
    }

    /// Map non-2xx responses onto store errors.
    async fn check(response: Response, collection: Collection, id: Option<&str>) -> Result<Response, StoreError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            if let Some(id) = id {
                return Err(StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Entity API {} returned {}: {}", collection, status, body);
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn fetch_rows(&self, builder: RequestBuilder, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let response = Self::check(builder.send().await?, collection, None).await?;
        let body: Value = response.json().await?;
        Ok(serde_json::from_value(body)?)
    }
}

#[async_trait]
impl EntityStore for HttpEntityStore {
    async fn list(&self, collection: Collection) -> Result<Vec<Value>, StoreError> {
        let url = self.collection_url(collection);
        self.fetch_rows(self.request(Method::GET, &url), collection).await
    }

    async fn filter(&self, collection: Collection, predicate: &Value) -> Result<Vec<Value>, StoreError> {
        let url = self.collection_url(collection);
        let query = serde_json::to_string(predicate)?;
        let builder = self.request(Method::GET, &url).query(&[("q", query)]);
        self.fetch_rows(builder, collection).await
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Value, StoreError> {
        let url = self.record_url(collection, id);
        let response = Self::check(self.request(Method::GET, &url).send().await?, collection, Some(id)).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, collection: Collection, fields: Value) -> Result<Value, StoreError> {
        let url = self.collection_url(collection);
        let response = Self::check(
            self.request(Method::POST, &url).json(&fields).send().await?,
            collection,
            None,
        )
        .await?;
        Ok(response.json().await?)
    }

    async fn update(&self, collection: Collection, id: &str, fields: Value) -> Result<Value, StoreError> {
        let url = self.record_url(collection, id);
        let response = Self::check(
            self.request(Method::PUT, &url).json(&fields).send().await?,
            collection,
            Some(id),
        )
        .await?;
        Ok(response.json().await?)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<(), StoreError> {
        let url = self.record_url(collection, id);
        Self::check(self.request(Method::DELETE, &url).send().await?, collection, Some(id)).await?;
        Ok(())
    }
}

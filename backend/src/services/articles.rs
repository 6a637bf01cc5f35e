use serde_json::json;

use crate::db::{filter_records, Collection, EntityStore};
use crate::error::StoreError;
use crate::models::{Article, ArticleStatus};

/// Published articles, newest first. The status filter runs in the store.
pub async fn published_articles(store: &dyn EntityStore) -> Result<Vec<Article>, StoreError> {
    let predicate = json!({ "status": ArticleStatus::Published.as_str() });
    let mut articles: Vec<Article> = filter_records(store, Collection::Article, &predicate).await?;

    // Only published articles are ever visible
    articles.retain(|a| a.status == ArticleStatus::Published);
    articles.sort_by(|a, b| b.created_date.cmp(&a.created_date));
    Ok(articles)
}

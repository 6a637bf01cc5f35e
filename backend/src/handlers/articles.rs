use axum::{extract::State, http::StatusCode, response::Json};

use super::{api_error, ApiError, AppState};
use crate::models::Article;
use crate::services::articles::published_articles;

pub async fn published(State(state): State<AppState>) -> Result<Json<Vec<Article>>, ApiError> {
    published_articles(state.store.as_ref())
        .await
        .map(Json)
        .map_err(|e| {
            tracing::error!("Failed to load articles: {}", e);
            api_error(StatusCode::BAD_GATEWAY, "Articles are unavailable right now")
        })
}

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;

use super::{viewer_email, ApiError, AppState};
use crate::services::directory::{Discovery, Relationships};
use crate::services::ProfileFilters;

#[derive(Debug, Default, Deserialize)]
pub struct DiscoverQuery {
    #[serde(default)]
    pub interest: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// Comma separated looking-for tags
    #[serde(default)]
    pub looking_for: Option<String>,
}

impl From<DiscoverQuery> for ProfileFilters {
    fn from(query: DiscoverQuery) -> Self {
        ProfileFilters {
            interest: query.interest,
            location: query.location,
            looking_for: query
                .looking_for
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|tag| !tag.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

/// Members the viewer can still reach out to.
pub async fn discover(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DiscoverQuery>,
) -> Result<Json<Discovery>, ApiError> {
    let viewer = viewer_email(&headers)?;
    let filters = ProfileFilters::from(query);
    let discovery = state.directory.discover(&viewer, &filters).await?;

    tracing::info!(
        "Discovery for {}: {} profiles, {} warnings",
        viewer,
        discovery.profiles.len(),
        discovery.warnings.len()
    );
    Ok(Json(discovery))
}

pub async fn relationships(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Relationships>, ApiError> {
    let viewer = viewer_email(&headers)?;
    Ok(Json(state.directory.relationships(&viewer).await?))
}

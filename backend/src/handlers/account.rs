use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};

use super::{viewer_email, ApiError, AppState};
use crate::models::Notification;
use crate::services::{resolve_viewer, Viewer};

/// Identity, role and subscription flags for the signed-in member.
pub async fn me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Viewer>, ApiError> {
    let email = viewer_email(&headers)?;
    let viewer = resolve_viewer(state.store.as_ref(), &state.admin_policy, &email).await;
    Ok(Json(viewer))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Notification>, ApiError> {
    let viewer = viewer_email(&headers)?;
    Ok(Json(state.matchmaker.mark_notification_read(&viewer, &id).await?))
}

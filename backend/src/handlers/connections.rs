use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde::Deserialize;

use super::{viewer_email, ApiError, AppState};
use crate::models::{Connection, Conversation};
use crate::services::Committed;

#[derive(Debug, Deserialize)]
pub struct ConnectionRequest {
    pub recipient_email: String,
}

#[derive(Debug, Deserialize)]
pub struct AcceptRequest {
    pub requester_email: String,
}

pub async fn request_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ConnectionRequest>,
) -> Result<(StatusCode, Json<Committed<Connection>>), ApiError> {
    let viewer = viewer_email(&headers)?;
    let committed = state
        .matchmaker
        .request_connection(&viewer, req.recipient_email.trim())
        .await?;

    if committed.notifications.failures() > 0 {
        tracing::warn!(
            "Connection {} created with {} failed notifications",
            committed.record.id,
            committed.notifications.failures()
        );
    }
    Ok((StatusCode::CREATED, Json(committed)))
}

pub async fn accept_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<AcceptRequest>,
) -> Result<(StatusCode, Json<Committed<Conversation>>), ApiError> {
    let viewer = viewer_email(&headers)?;
    let committed = state
        .matchmaker
        .accept_connection(&viewer, req.requester_email.trim())
        .await?;
    Ok((StatusCode::CREATED, Json(committed)))
}

pub async fn withdraw_connection(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let viewer = viewer_email(&headers)?;
    state.matchmaker.withdraw_connection(&viewer, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

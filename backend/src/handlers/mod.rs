pub mod account;
pub mod articles;
pub mod connections;
pub mod discover;

use axum::{
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::constants::VIEWER_EMAIL_HEADER;
use crate::db::{self, DatabaseConfig, EntityStore, PgEntityStore};
use crate::error::DiscoveryError;
use crate::services::{AdminPolicy, Directory, EmailSender, HttpEntityStore, Matchmaker, NotificationDispatcher};
use crate::utils::{Config, StoreBackend};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub directory: Directory,
    pub matchmaker: Matchmaker,
    pub admin_policy: AdminPolicy,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>, email: Option<EmailSender>, admin_policy: AdminPolicy) -> Self {
        let dispatcher = NotificationDispatcher::new(store.clone(), email);
        Self {
            directory: Directory::new(store.clone()),
            matchmaker: Matchmaker::new(store.clone(), dispatcher),
            store,
            admin_policy,
        }
    }

    /// Connect the configured entity backend and notification endpoint.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn EntityStore> = match &config.backend {
            StoreBackend::Http { base_url, api_key } => {
                tracing::info!("Using entity API at {}", base_url);
                Arc::new(HttpEntityStore::new(base_url.clone(), api_key.clone(), config.http_timeout)?)
            }
            StoreBackend::Postgres => {
                let db_config = DatabaseConfig::from_env()?;
                let pool = db::get_db_pool(&db_config).await?;
                db::migrations::run_migrations(&pool).await?;
                Arc::new(PgEntityStore::new(pool))
            }
        };

        let email = config
            .notify_email_url
            .as_ref()
            .map(|url| EmailSender::new(url.clone(), config.http_timeout))
            .transpose()?;
        if email.is_none() {
            tracing::warn!("NOTIFY_EMAIL_URL not set, email notifications will be skipped");
        }

        Ok(Self::new(store, email, AdminPolicy::new(&config.admin_emails)))
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

pub fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { error: message.into() }))
}

impl From<DiscoveryError> for (StatusCode, Json<ErrorBody>) {
    fn from(e: DiscoveryError) -> Self {
        let status = match &e {
            DiscoveryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            DiscoveryError::NotFound(_) => StatusCode::NOT_FOUND,
            DiscoveryError::Conflict(_) => StatusCode::CONFLICT,
            DiscoveryError::UpstreamUnavailable(_) | DiscoveryError::MalformedRecord(_) => {
                tracing::error!("Request failed upstream: {}", e);
                StatusCode::BAD_GATEWAY
            }
        };
        api_error(status, e.to_string())
    }
}

/// Authenticated viewer email from the request headers.
pub fn viewer_email(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get(VIEWER_EMAIL_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .ok_or_else(|| api_error(StatusCode::UNAUTHORIZED, "Sign in to continue"))
}

pub fn create_router(state: AppState, config: &Config) -> Router {
    let cors_layer = create_cors_layer(config);

    Router::new()
        .route("/health", get(health_check))
        // Discovery
        .route("/api/discover", get(discover::discover))
        .route("/api/relationships", get(discover::relationships))
        // Connection workflow
        .route("/api/connections", post(connections::request_connection))
        .route("/api/connections/accept", post(connections::accept_connection))
        .route("/api/connections/{id}", delete(connections::withdraw_connection))
        // Account
        .route("/api/me", get(account::me))
        .route("/api/notifications/{id}/read", post(account::mark_notification_read))
        .route("/api/articles", get(articles::published))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors_layer))
        .with_state(state)
}

fn create_cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    if origins.is_empty() {
        // Default to permissive for development
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(origins)
    }
}

async fn health_check() -> &'static str {
    "OK"
}

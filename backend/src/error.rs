use thiserror::Error;

/// Failures talking to an entity store backend.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to decode entity: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Entity API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid entity payload: {0}")]
    InvalidPayload(String),

    #[error("{collection} {id} not found")]
    NotFound { collection: String, id: String },
}

/// Failures delivering a single notification.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Notification endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to store notification: {0}")]
    Store(#[from] StoreError),
}

/// Errors surfaced by discovery and the connection workflow.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Caller bug: the operation needs a viewer identity or valid argument.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] StoreError),

    /// Dirty row in a collection. Skipped during resolution, only raised
    /// where a single specific record is required.
    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),
}

pub type Result<T> = std::result::Result<T, DiscoveryError>;

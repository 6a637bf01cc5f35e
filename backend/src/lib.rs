pub mod constants;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

pub use utils::config::Config;
pub use db::connection::get_db_pool;
pub use handlers::{create_router, AppState};

// Re-export common types
pub use error::{DiscoveryError, StoreError};
pub use models::{Connection, Conversation, Profile, RelationshipStatus};
pub use services::{filter_profiles, resolve_statuses, ProfileFilters};

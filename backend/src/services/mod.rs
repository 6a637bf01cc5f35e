pub mod access;
pub mod articles;
pub mod directory;
pub mod entity_api;
pub mod filters;
pub mod matching;
pub mod notifications;
pub mod relationships;

pub use access::{resolve_viewer, AdminPolicy, Viewer};
pub use directory::{Directory, Discovery};
pub use entity_api::HttpEntityStore;
pub use filters::{filter_profiles, ProfileFilters};
pub use matching::{Committed, Matchmaker};
pub use notifications::{EmailSender, NotificationDispatcher};
pub use relationships::{resolve_statuses, StatusMap};

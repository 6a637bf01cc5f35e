// =============================================================================
// ReStart Backend Constants
// =============================================================================
// This file contains all constants used throughout the backend to enable
// easy tuning and configuration from a single location.

use once_cell::sync::Lazy;
use regex::Regex;

// =============================================================================
// ENTITY COLLECTIONS
// =============================================================================

/// Collection holding community profiles
pub const SOCIAL_PROFILE_COLLECTION: &str = "SocialProfile";

/// Collection holding one-directional connection requests
pub const CONNECTION_COLLECTION: &str = "Connection";

/// Collection holding two-party conversations
pub const CONVERSATION_COLLECTION: &str = "Conversation";

/// Collection holding community articles
pub const ARTICLE_COLLECTION: &str = "Article";

/// Collection holding in-app notifications
pub const NOTIFICATION_COLLECTION: &str = "Notification";

/// Collection holding authenticated accounts
pub const USER_COLLECTION: &str = "User";

// =============================================================================
// DISCOVERY
// =============================================================================

/// Looking-for value that disables the looking-for filter when placed first
pub const LOOKING_FOR_ALL: &str = "all";

/// Number of participants in a well-formed conversation
pub const CONVERSATION_PARTICIPANTS: usize = 2;

// =============================================================================
// ROLES & SUBSCRIPTIONS
// =============================================================================

/// Role value granting admin access
pub const ADMIN_ROLE: &str = "admin";

/// Subscription status treated as an active subscriber
pub const ACTIVE_SUBSCRIPTION_STATUS: &str = "active";

// =============================================================================
// HTTP
// =============================================================================

/// Header carrying the authenticated viewer's email
pub const VIEWER_EMAIL_HEADER: &str = "x-viewer-email";

/// Header carrying the entity API key
pub const ENTITY_API_KEY_HEADER: &str = "api_key";

/// Default timeout for entity API and notification requests
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// SERVER CONFIGURATION
// =============================================================================

/// Default server port if not specified in environment
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default database pool size
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// HELPER FUNCTIONS FOR VALIDATION
// =============================================================================

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex is valid"));

/// Validates if a string looks like an email address
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

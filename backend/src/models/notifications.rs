use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{flexible_timestamp, nullable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ConnectionRequest,
    ConnectionAccepted,
}

/// In-app notification row, written after the triggering change commits.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub recipient_email: String,
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
}

impl NewNotification {
    pub fn new(recipient_email: impl Into<String>, kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            recipient_email: recipient_email.into(),
            kind,
            message: message.into(),
            is_read: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub recipient_email: String,
    pub kind: NotificationKind,
    #[serde(default, deserialize_with = "nullable")]
    pub message: String,
    #[serde(default, deserialize_with = "nullable")]
    pub is_read: bool,
    #[serde(default, with = "flexible_timestamp")]
    pub created_date: DateTime<Utc>,
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{flexible_timestamp, nullable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleStatus {
    Draft,
    PendingReview,
    Published,
    Rejected,
    #[serde(other)]
    Unknown,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::PendingReview => "pending_review",
            ArticleStatus::Published => "published",
            ArticleStatus::Rejected => "rejected",
            ArticleStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default)]
    pub author_email: Option<String>,
    pub status: ArticleStatus,
    #[serde(default, with = "flexible_timestamp")]
    pub created_date: DateTime<Utc>,
}

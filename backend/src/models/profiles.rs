use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{flexible_timestamp, nullable};

/// A member's public community card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub nickname: String,
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub interests: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub looking_for: Vec<String>,
    #[serde(default)]
    pub about_me: Option<String>,
    #[serde(default)]
    pub profile_image_url: Option<String>,
    #[serde(default, with = "flexible_timestamp")]
    pub created_date: DateTime<Utc>,
    /// Seeded showcase profiles, listed after real members.
    #[serde(default, deserialize_with = "nullable")]
    pub is_demo: bool,
}

/// Ages arrive as integers, floats or numeric strings. Anything else is unknown.
fn lenient_age<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    let years = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(years
        .filter(|y| y.is_finite() && *y >= 0.0 && *y <= f64::from(u32::MAX))
        .map(|y| y.round() as u32))
}

impl Profile {
    /// Name shown to other members, falling back to the email.
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            &self.email
        } else {
            &self.nickname
        }
    }
}

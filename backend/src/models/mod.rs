pub mod articles;
pub mod connections;
pub mod notifications;
pub mod profiles;
pub mod users;

pub use articles::{Article, ArticleStatus};
pub use connections::{Connection, Conversation, NewConnection, NewConversation, RelationshipStatus};
pub use notifications::{NewNotification, Notification, NotificationKind};
pub use profiles::Profile;
pub use users::User;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse the timestamp shapes the entity backends emit: RFC 3339, naive
/// ISO datetimes (assumed UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde adapter for `created_date` style fields.
pub mod flexible_timestamp {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    /// Missing, `null` or unparseable values fall back to the Unix epoch.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = Option::<Value>::deserialize(deserializer)?;
        let parsed = match &raw {
            Some(Value::String(text)) => parse_timestamp(text),
            _ => None,
        };
        if parsed.is_none() && raw.as_ref().is_some_and(|v| !v.is_null()) {
            tracing::debug!("Unreadable timestamp {:?}, using epoch", raw);
        }
        Ok(parsed.unwrap_or_default())
    }
}

/// Treat a JSON `null` as the type's default (empty string, empty list, false).
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_timestamp_shapes() {
        let midnight = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-01"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00Z"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T02:00:00+02:00"), Some(midnight));
        assert_eq!(parse_timestamp("2024-01-01T00:00:00.000000"), Some(midnight));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[derive(Deserialize)]
    struct Stamped {
        #[serde(default, with = "flexible_timestamp")]
        created_date: DateTime<Utc>,
        #[serde(default, deserialize_with = "nullable")]
        label: String,
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let epoch = DateTime::<Utc>::default();
        for raw in [
            serde_json::json!({ "created_date": null, "label": null }),
            serde_json::json!({ "created_date": "soon" }),
            serde_json::json!({ "created_date": 1700000000 }),
            serde_json::json!({}),
        ] {
            let stamped: Stamped = serde_json::from_value(raw).unwrap();
            assert_eq!(stamped.created_date, epoch);
            assert_eq!(stamped.label, "");
        }
    }
}

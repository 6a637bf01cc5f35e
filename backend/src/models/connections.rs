use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{flexible_timestamp, nullable};
use crate::constants::CONVERSATION_PARTICIPANTS;

/// Derived relationship between the viewer and another member. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Connected,
    Pending,
    None,
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RelationshipStatus::Connected => "connected",
            RelationshipStatus::Pending => "pending",
            RelationshipStatus::None => "none",
        };
        f.write_str(label)
    }
}

/// One-directional "I'm interested" request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub requester_email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub requester_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub recipient_email: String,
    #[serde(default, deserialize_with = "nullable")]
    pub recipient_name: String,
    #[serde(default, with = "flexible_timestamp")]
    pub created_date: DateTime<Utc>,
}

impl Connection {
    pub fn is_well_formed(&self) -> bool {
        !self.requester_email.is_empty() && !self.recipient_email.is_empty()
    }

    /// The other end of the request when `email` is one of its ends.
    pub fn counterpart_of(&self, email: &str) -> Option<&str> {
        if !self.is_well_formed() {
            return None;
        }
        if self.requester_email == email {
            Some(&self.recipient_email)
        } else if self.recipient_email == email {
            Some(&self.requester_email)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConnection {
    pub requester_email: String,
    pub requester_name: String,
    pub recipient_email: String,
    pub recipient_name: String,
}

/// Confirmed two-party thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub participants: Vec<String>,
    #[serde(default, with = "flexible_timestamp")]
    pub created_date: DateTime<Utc>,
}

impl Conversation {
    /// Exactly two distinct, non-empty participants.
    pub fn is_well_formed(&self) -> bool {
        self.participants.len() == CONVERSATION_PARTICIPANTS
            && self.participants[0] != self.participants[1]
            && self.participants.iter().all(|p| !p.is_empty())
    }

    /// The other participant when `email` takes part in a well-formed thread.
    pub fn partner_of(&self, email: &str) -> Option<&str> {
        if !self.is_well_formed() {
            return None;
        }
        match (self.participants[0].as_str(), self.participants[1].as_str()) {
            (a, b) if a == email => Some(b),
            (a, b) if b == email => Some(a),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub participants: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn conversation(participants: serde_json::Value) -> Conversation {
        serde_json::from_value(json!({ "participants": participants })).unwrap()
    }

    #[test]
    fn test_partner_of() {
        let convo = conversation(json!(["a@x.com", "b@x.com"]));
        assert_eq!(convo.partner_of("a@x.com"), Some("b@x.com"));
        assert_eq!(convo.partner_of("b@x.com"), Some("a@x.com"));
        assert_eq!(convo.partner_of("c@x.com"), None);
    }

    #[test]
    fn test_malformed_conversations_have_no_partner() {
        assert_eq!(conversation(json!(["a@x.com"])).partner_of("a@x.com"), None);
        assert_eq!(conversation(json!(["a@x.com", "a@x.com"])).partner_of("a@x.com"), None);
        assert_eq!(
            conversation(json!(["a@x.com", "b@x.com", "c@x.com"])).partner_of("a@x.com"),
            None
        );
        assert_eq!(conversation(json!(null)).partner_of("a@x.com"), None);
    }

    #[test]
    fn test_counterpart_either_end() {
        let row: Connection = serde_json::from_value(json!({
            "requester_email": "a@x.com",
            "recipient_email": "b@x.com"
        }))
        .unwrap();

        assert_eq!(row.counterpart_of("a@x.com"), Some("b@x.com"));
        assert_eq!(row.counterpart_of("b@x.com"), Some("a@x.com"));
        assert_eq!(row.counterpart_of("c@x.com"), None);
    }

    #[test]
    fn test_null_metadata_keeps_rows() {
        let row: Connection = serde_json::from_value(json!({
            "id": null,
            "requester_email": "a@x.com",
            "requester_name": null,
            "recipient_email": "b@x.com",
            "recipient_name": null,
            "created_date": null
        }))
        .unwrap();
        assert!(row.is_well_formed());
        assert_eq!(row.requester_name, "");

        let convo: Conversation = serde_json::from_value(json!({
            "participants": ["a@x.com", "c@x.com"],
            "created_date": null
        }))
        .unwrap();
        assert_eq!(convo.partner_of("a@x.com"), Some("c@x.com"));
    }

    #[test]
    fn test_null_email_end_is_ignored() {
        let row: Connection = serde_json::from_value(json!({
            "requester_email": "a@x.com",
            "recipient_email": null
        }))
        .unwrap();
        assert!(!row.is_well_formed());
        assert_eq!(row.counterpart_of("a@x.com"), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RelationshipStatus::Pending).unwrap(), json!("pending"));
        assert_eq!(RelationshipStatus::Connected.to_string(), "connected");
    }
}

use std::collections::{HashMap, HashSet};

use crate::error::{DiscoveryError, Result};
use crate::models::{Connection, Conversation, RelationshipStatus};

pub type StatusMap = HashMap<String, RelationshipStatus>;

/// Resolve how the viewer relates to each candidate email.
///
/// A conversation containing both emails means `Connected` and always wins
/// over connection rows, which may outlive the conversation they led to.
/// Otherwise a connection row in either direction means `Pending`.
///
/// Conversations that are not exactly two distinct participants, or that
/// don't include the viewer, are ignored. So are connection rows with a
/// missing end. The result holds one entry per distinct candidate.
pub fn resolve_statuses(
    viewer_email: &str,
    candidate_emails: &[String],
    connections: &[Connection],
    conversations: &[Conversation],
) -> Result<StatusMap> {
    if viewer_email.trim().is_empty() {
        return Err(DiscoveryError::InvalidInput(
            "a viewer email is required to resolve relationships".to_string(),
        ));
    }

    let partners: HashSet<&str> = conversations
        .iter()
        .filter_map(|conversation| conversation.partner_of(viewer_email))
        .collect();

    let requested: HashSet<&str> = connections
        .iter()
        .filter_map(|connection| connection.counterpart_of(viewer_email))
        .collect();

    let statuses = candidate_emails
        .iter()
        .map(|email| {
            let status = if partners.contains(email.as_str()) {
                RelationshipStatus::Connected
            } else if requested.contains(email.as_str()) {
                RelationshipStatus::Pending
            } else {
                RelationshipStatus::None
            };
            (email.clone(), status)
        })
        .collect();

    Ok(statuses)
}

/// Status of a single pair.
pub fn resolve_status(
    viewer_email: &str,
    other_email: &str,
    connections: &[Connection],
    conversations: &[Conversation],
) -> Result<RelationshipStatus> {
    let candidates = [other_email.to_string()];
    let statuses = resolve_statuses(viewer_email, &candidates, connections, conversations)?;
    Ok(statuses
        .get(other_email)
        .copied()
        .unwrap_or(RelationshipStatus::None))
}

use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;

use crate::db::{filter_records, list_records, Collection, EntityStore};
use crate::error::{DiscoveryError, Result, StoreError};
use crate::models::{Connection, Conversation, Profile, RelationshipStatus};
use crate::services::filters::{filter_profiles, ProfileFilters};
use crate::services::relationships::{resolve_statuses, StatusMap};

/// Everything discovery needs, loaded in one round.
#[derive(Debug, Clone, Default)]
pub struct DirectorySnapshot {
    pub profiles: Vec<Profile>,
    pub own_profile: Option<Profile>,
    pub connections: Vec<Connection>,
    pub conversations: Vec<Conversation>,
    /// One entry per collection that could not be loaded.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Discovery {
    /// Members the viewer has no relationship with yet, filtered and sorted.
    pub profiles: Vec<Profile>,
    pub own_profile: Option<Profile>,
    pub statuses: StatusMap,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Relationships {
    pub statuses: StatusMap,
    pub warnings: Vec<String>,
}

#[derive(Clone)]
pub struct Directory {
    store: Arc<dyn EntityStore>,
}

fn require_viewer(viewer_email: &str) -> Result<()> {
    if viewer_email.trim().is_empty() {
        return Err(DiscoveryError::InvalidInput(
            "discovery requires a signed-in viewer".to_string(),
        ));
    }
    Ok(())
}

/// Swap a failed fetch for an empty collection, keeping a warning for the caller.
fn or_degraded<T: Default>(result: std::result::Result<T, StoreError>, source: &str, warnings: &mut Vec<String>) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            let error = DiscoveryError::UpstreamUnavailable(e);
            tracing::warn!("Loading {} failed, continuing without it: {}", source, error);
            warnings.push(format!("Could not load {}", source));
            T::default()
        }
    }
}

/// Distinct non-empty emails other than the viewer's, in profile order.
fn candidate_emails(profiles: &[Profile], viewer_email: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    profiles
        .iter()
        .map(|p| p.email.as_str())
        .filter(|email| !email.is_empty() && *email != viewer_email)
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect()
}

impl Directory {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Fetch profiles, the viewer's own profile, connections and
    /// conversations concurrently. Failed fetches degrade to empty.
    pub async fn load(&self, viewer_email: &str) -> DirectorySnapshot {
        let store = self.store.as_ref();
        let own_predicate = json!({ "email": viewer_email });

        let (profiles, own, connections, conversations) = tokio::join!(
            list_records::<Profile>(store, Collection::SocialProfile),
            filter_records::<Profile>(store, Collection::SocialProfile, &own_predicate),
            list_records::<Connection>(store, Collection::Connection),
            list_records::<Conversation>(store, Collection::Conversation),
        );

        let mut warnings = Vec::new();
        let profiles = or_degraded(profiles, "profiles", &mut warnings);
        let own = or_degraded(own, "your profile", &mut warnings);
        let connections = or_degraded(connections, "connections", &mut warnings);
        let conversations = or_degraded(conversations, "conversations", &mut warnings);

        let own_profile = own
            .into_iter()
            .next()
            .or_else(|| profiles.iter().find(|p| p.email == viewer_email).cloned());

        tracing::debug!(
            "Loaded directory for {}: {} profiles, {} connections, {} conversations",
            viewer_email,
            profiles.len(),
            connections.len(),
            conversations.len()
        );

        DirectorySnapshot {
            profiles,
            own_profile,
            connections,
            conversations,
            warnings,
        }
    }

    /// Members the viewer can still reach out to.
    pub async fn discover(&self, viewer_email: &str, filters: &ProfileFilters) -> Result<Discovery> {
        require_viewer(viewer_email)?;
        let snapshot = self.load(viewer_email).await;
        compose(viewer_email, snapshot, filters)
    }

    /// Relationship status for every other member.
    pub async fn relationships(&self, viewer_email: &str) -> Result<Relationships> {
        require_viewer(viewer_email)?;
        let snapshot = self.load(viewer_email).await;
        let candidates = candidate_emails(&snapshot.profiles, viewer_email);
        let statuses = resolve_statuses(
            viewer_email,
            &candidates,
            &snapshot.connections,
            &snapshot.conversations,
        )?;

        Ok(Relationships {
            statuses,
            warnings: snapshot.warnings,
        })
    }
}

/// Resolve, filter and drop the viewer plus anyone already pending or connected.
pub fn compose(viewer_email: &str, snapshot: DirectorySnapshot, filters: &ProfileFilters) -> Result<Discovery> {
    let candidates = candidate_emails(&snapshot.profiles, viewer_email);
    let statuses = resolve_statuses(
        viewer_email,
        &candidates,
        &snapshot.connections,
        &snapshot.conversations,
    )?;

    let profiles: Vec<Profile> = filter_profiles(&snapshot.profiles, filters)
        .into_iter()
        .filter(|p| p.email != viewer_email)
        .filter(|p| statuses.get(&p.email) == Some(&RelationshipStatus::None))
        .collect();

    Ok(Discovery {
        profiles,
        own_profile: snapshot.own_profile,
        statuses,
        warnings: snapshot.warnings,
    })
}

use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;

use crate::db::{filter_records, Collection, EntityStore};
use crate::models::User;

/// Configured admin allowlist. Emails compare case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    emails: HashSet<String>,
}

impl AdminPolicy {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| e.as_ref().trim().to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// Parse a comma separated list, as found in `ADMIN_EMAILS`.
    pub fn from_csv(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn is_listed(&self, email: &str) -> bool {
        self.emails.contains(&email.trim().to_lowercase())
    }

    pub fn is_admin(&self, email: &str, user: Option<&User>) -> bool {
        user.is_some_and(User::has_admin_role) || self.is_listed(email)
    }
}

/// The authenticated member a request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Viewer {
    pub email: String,
    pub is_admin: bool,
    pub is_subscribed: bool,
}

/// Build the viewer context from the User collection and the admin policy.
///
/// A failed lookup falls back to the allowlist and no subscription.
pub async fn resolve_viewer(store: &dyn EntityStore, policy: &AdminPolicy, email: &str) -> Viewer {
    let user = match filter_records::<User>(store, Collection::User, &json!({ "email": email })).await {
        Ok(mut users) => users.pop(),
        Err(e) => {
            tracing::warn!("Failed to load user {}: {}", email, e);
            None
        }
    };

    Viewer {
        email: email.to_string(),
        is_admin: policy.is_admin(email, user.as_ref()),
        is_subscribed: user.as_ref().is_some_and(User::is_subscribed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryEntityStore;

    #[test]
    fn test_allowlist_is_case_insensitive() {
        let policy = AdminPolicy::from_csv(" Admin@ReStart.org , ,ops@restart.org");
        assert!(policy.is_listed("admin@restart.org"));
        assert!(policy.is_listed("OPS@restart.org"));
        assert!(!policy.is_listed("member@restart.org"));
        assert!(!policy.is_listed(""));
    }

    #[tokio::test]
    async fn test_resolve_viewer_from_user_row() {
        let store = MemoryEntityStore::new();
        store
            .seed(
                Collection::User,
                vec![
                    json!({ "email": "boss@x.com", "role": "admin" }),
                    json!({ "email": "paid@x.com", "role": "user", "subscription_status": "active" }),
                ],
            )
            .await;
        let policy = AdminPolicy::default();

        let boss = resolve_viewer(&store, &policy, "boss@x.com").await;
        assert!(boss.is_admin);
        assert!(!boss.is_subscribed);

        let paid = resolve_viewer(&store, &policy, "paid@x.com").await;
        assert!(!paid.is_admin);
        assert!(paid.is_subscribed);
    }

    #[tokio::test]
    async fn test_lookup_failure_falls_back_to_allowlist() {
        let store = MemoryEntityStore::new();
        store.set_unavailable(Collection::User, true).await;
        let policy = AdminPolicy::from_csv("ops@x.com");

        let viewer = resolve_viewer(&store, &policy, "ops@x.com").await;
        assert_eq!(
            viewer,
            Viewer {
                email: "ops@x.com".to_string(),
                is_admin: true,
                is_subscribed: false,
            }
        );
    }
}

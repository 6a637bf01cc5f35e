use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

use crate::constants::is_valid_email;
use crate::db::{create_record, filter_records, get_record, list_records, Collection, EntityStore};
use crate::error::{DiscoveryError, Result, StoreError};
use crate::models::{
    Connection, Conversation, NewConnection, NewConversation, NewNotification, Notification,
    NotificationKind, Profile, RelationshipStatus,
};
use crate::services::notifications::{Dispatch, DispatchReport, EmailMessage, NotificationDispatcher};
use crate::services::relationships::resolve_status;

/// A committed change plus the outcome of its notification fan-out.
#[derive(Debug, Clone, Serialize)]
pub struct Committed<T> {
    pub record: T,
    pub notifications: DispatchReport,
}

fn not_found_or_upstream(error: StoreError, what: String) -> DiscoveryError {
    match error {
        StoreError::NotFound { .. } => DiscoveryError::NotFound(what),
        other => DiscoveryError::UpstreamUnavailable(other),
    }
}

fn require_viewer(viewer_email: &str) -> Result<()> {
    if viewer_email.trim().is_empty() {
        return Err(DiscoveryError::InvalidInput("sign in to manage connections".to_string()));
    }
    Ok(())
}

/// Connection request / accept / withdraw workflow.
#[derive(Clone)]
pub struct Matchmaker {
    store: Arc<dyn EntityStore>,
    dispatcher: NotificationDispatcher,
}

impl Matchmaker {
    pub fn new(store: Arc<dyn EntityStore>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    async fn profile_by_email(&self, email: &str) -> Result<Option<Profile>> {
        let mut profiles: Vec<Profile> =
            filter_records(self.store.as_ref(), Collection::SocialProfile, &json!({ "email": email })).await?;
        Ok(profiles.pop())
    }

    /// Upstream failures propagate here instead of degrading to `none`.
    async fn pair_status(&self, viewer_email: &str, other_email: &str) -> Result<RelationshipStatus> {
        let store = self.store.as_ref();
        let (connections, conversations) = tokio::join!(
            list_records::<Connection>(store, Collection::Connection),
            list_records::<Conversation>(store, Collection::Conversation),
        );
        resolve_status(viewer_email, other_email, &connections?, &conversations?)
    }

    /// The status check and the create are separate store calls, so two racing
    /// requests for one pair can both land. The oldest row (then lowest id) wins
    /// and every other racer removes its own row and reports a conflict.
    async fn settle_duplicates(&self, connection: &Connection) -> Result<()> {
        let store = self.store.as_ref();
        let forward = json!({
            "requester_email": connection.requester_email,
            "recipient_email": connection.recipient_email,
        });
        let reverse = json!({
            "requester_email": connection.recipient_email,
            "recipient_email": connection.requester_email,
        });
        let (forward, reverse) = tokio::join!(
            filter_records::<Connection>(store, Collection::Connection, &forward),
            filter_records::<Connection>(store, Collection::Connection, &reverse),
        );
        let rows = match (forward, reverse) {
            (Ok(mut forward), Ok(reverse)) => {
                forward.extend(reverse);
                forward
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("Could not check for duplicate connection {}: {}", connection.id, e);
                return Ok(());
            }
        };

        let winner = rows
            .iter()
            .min_by(|a, b| (a.created_date, &a.id).cmp(&(b.created_date, &b.id)));
        match winner {
            Some(winner) if winner.id != connection.id => {
                tracing::info!(
                    "Dropping duplicate connection {} in favour of {}",
                    connection.id,
                    winner.id
                );
                if let Err(e) = store.delete(Collection::Connection, &connection.id).await {
                    tracing::error!("Failed to remove duplicate connection {}: {}", connection.id, e);
                }
                Err(DiscoveryError::Conflict(format!(
                    "already pending with {}",
                    connection.recipient_email
                )))
            }
            _ => Ok(()),
        }
    }

    /// Send an "I'm interested" request from the viewer to `recipient_email`.
    pub async fn request_connection(&self, viewer_email: &str, recipient_email: &str) -> Result<Committed<Connection>> {
        require_viewer(viewer_email)?;
        if !is_valid_email(recipient_email) {
            return Err(DiscoveryError::InvalidInput(format!(
                "{} is not a valid email",
                recipient_email
            )));
        }
        if recipient_email == viewer_email {
            return Err(DiscoveryError::InvalidInput("you cannot connect with yourself".to_string()));
        }

        let recipient = self
            .profile_by_email(recipient_email)
            .await?
            .ok_or_else(|| DiscoveryError::NotFound(format!("no profile for {}", recipient_email)))?;
        let requester = self.profile_by_email(viewer_email).await?;
        let requester_name = requester
            .as_ref()
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| viewer_email.to_string());

        let status = self.pair_status(viewer_email, recipient_email).await?;
        if status != RelationshipStatus::None {
            return Err(DiscoveryError::Conflict(format!(
                "already {} with {}",
                status, recipient_email
            )));
        }

        let new_connection = NewConnection {
            requester_email: viewer_email.to_string(),
            requester_name: requester_name.clone(),
            recipient_email: recipient.email.clone(),
            recipient_name: recipient.display_name().to_string(),
        };
        let connection: Connection =
            create_record(self.store.as_ref(), Collection::Connection, &new_connection).await?;
        self.settle_duplicates(&connection).await?;
        tracing::info!("Connection requested: {} -> {}", viewer_email, recipient.email);

        let message = format!("{} would like to connect with you", requester_name);
        let notifications = self
            .dispatcher
            .dispatch_all(vec![
                Dispatch::InApp(NewNotification::new(
                    recipient.email.clone(),
                    NotificationKind::ConnectionRequest,
                    message.clone(),
                )),
                Dispatch::Email(EmailMessage {
                    to: recipient.email.clone(),
                    subject: "New connection request".to_string(),
                    body: message,
                }),
            ])
            .await;

        Ok(Committed {
            record: connection,
            notifications,
        })
    }

    /// Accept a request sent to the viewer, opening a conversation.
    pub async fn accept_connection(&self, viewer_email: &str, requester_email: &str) -> Result<Committed<Conversation>> {
        require_viewer(viewer_email)?;
        let store = self.store.as_ref();

        let predicate = json!({
            "requester_email": requester_email,
            "recipient_email": viewer_email,
        });
        let (requests, conversations) = tokio::join!(
            filter_records::<Connection>(store, Collection::Connection, &predicate),
            list_records::<Conversation>(store, Collection::Conversation),
        );
        if requests?.is_empty() {
            return Err(DiscoveryError::NotFound(format!(
                "no connection request from {}",
                requester_email
            )));
        }
        if conversations?
            .iter()
            .any(|c| c.partner_of(viewer_email) == Some(requester_email))
        {
            return Err(DiscoveryError::Conflict(format!(
                "already connected with {}",
                requester_email
            )));
        }

        let conversation: Conversation = create_record(
            store,
            Collection::Conversation,
            &NewConversation {
                participants: vec![requester_email.to_string(), viewer_email.to_string()],
            },
        )
        .await?;
        tracing::info!("Connection accepted: {} <-> {}", requester_email, viewer_email);

        let accepter_name = self
            .profile_by_email(viewer_email)
            .await
            .ok()
            .flatten()
            .map(|p| p.display_name().to_string())
            .unwrap_or_else(|| viewer_email.to_string());
        let message = format!("{} accepted your connection request", accepter_name);

        let notifications = self
            .dispatcher
            .dispatch_all(vec![
                Dispatch::InApp(NewNotification::new(
                    requester_email,
                    NotificationKind::ConnectionAccepted,
                    message.clone(),
                )),
                Dispatch::Email(EmailMessage {
                    to: requester_email.to_string(),
                    subject: "Your connection request was accepted".to_string(),
                    body: message,
                }),
            ])
            .await;

        Ok(Committed {
            record: conversation,
            notifications,
        })
    }

    /// Withdraw a request the viewer sent. Other members' rows read as not found.
    pub async fn withdraw_connection(&self, viewer_email: &str, connection_id: &str) -> Result<()> {
        require_viewer(viewer_email)?;
        let store = self.store.as_ref();
        let what = format!("connection {}", connection_id);

        let connection: Connection = get_record(store, Collection::Connection, connection_id)
            .await
            .map_err(|e| not_found_or_upstream(e, what.clone()))?;
        if connection.requester_email != viewer_email {
            return Err(DiscoveryError::NotFound(what));
        }

        store
            .delete(Collection::Connection, connection_id)
            .await
            .map_err(|e| not_found_or_upstream(e, what))?;
        tracing::info!("Connection {} withdrawn by {}", connection_id, viewer_email);
        Ok(())
    }

    /// Mark one of the viewer's notifications as read.
    pub async fn mark_notification_read(&self, viewer_email: &str, notification_id: &str) -> Result<Notification> {
        require_viewer(viewer_email)?;
        let store = self.store.as_ref();
        let what = format!("notification {}", notification_id);

        let notification: Notification = get_record(store, Collection::Notification, notification_id)
            .await
            .map_err(|e| not_found_or_upstream(e, what.clone()))?;
        if notification.recipient_email != viewer_email {
            return Err(DiscoveryError::NotFound(what));
        }

        let updated = store
            .update(Collection::Notification, notification_id, json!({ "is_read": true }))
            .await
            .map_err(|e| not_found_or_upstream(e, what.clone()))?;
        serde_json::from_value(updated).map_err(|e| DiscoveryError::MalformedRecord(format!("{}: {}", what, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryEntityStore;
    use crate::services::notifications::DispatchState;

    const VIEWER: &str = "a@x.com";

    async fn setup() -> (Arc<MemoryEntityStore>, Matchmaker) {
        let store = Arc::new(MemoryEntityStore::new());
        store
            .seed(
                Collection::SocialProfile,
                vec![
                    json!({ "email": VIEWER, "nickname": "Ada" }),
                    json!({ "email": "b@x.com", "nickname": "Bea" }),
                    json!({ "email": "c@x.com", "nickname": "" }),
                ],
            )
            .await;
        let dispatcher = NotificationDispatcher::new(store.clone(), None);
        let matchmaker = Matchmaker::new(store.clone(), dispatcher);
        (store, matchmaker)
    }

    #[tokio::test]
    async fn test_request_creates_connection_and_notifies() {
        let (store, matchmaker) = setup().await;

        let committed = matchmaker.request_connection(VIEWER, "b@x.com").await.unwrap();

        assert_eq!(committed.record.requester_email, VIEWER);
        assert_eq!(committed.record.requester_name, "Ada");
        assert_eq!(committed.record.recipient_name, "Bea");
        assert_eq!(committed.notifications.outcomes[0].state, DispatchState::Sent);
        assert_eq!(committed.notifications.outcomes[1].state, DispatchState::Skipped);

        let notes = store.list(Collection::Notification).await.unwrap();
        assert_eq!(notes[0]["recipient_email"], "b@x.com");
        assert_eq!(notes[0]["message"], "Ada would like to connect with you");
    }

    #[tokio::test]
    async fn test_request_uses_email_when_nickname_blank() {
        let (_store, matchmaker) = setup().await;
        let committed = matchmaker.request_connection(VIEWER, "c@x.com").await.unwrap();
        assert_eq!(committed.record.recipient_name, "c@x.com");
    }

    #[tokio::test]
    async fn test_duplicate_request_conflicts_in_both_directions() {
        let (_store, matchmaker) = setup().await;
        matchmaker.request_connection(VIEWER, "b@x.com").await.unwrap();

        let again = matchmaker.request_connection(VIEWER, "b@x.com").await;
        assert!(matches!(again, Err(DiscoveryError::Conflict(_))));

        let reverse = matchmaker.request_connection("b@x.com", VIEWER).await;
        assert!(matches!(reverse, Err(DiscoveryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_racing_duplicate_is_removed() {
        let (store, matchmaker) = setup().await;
        store
            .seed(
                Collection::Connection,
                vec![json!({
                    "id": "first",
                    "requester_email": "b@x.com",
                    "recipient_email": VIEWER,
                    "created_date": "2024-01-01T00:00:00Z"
                })],
            )
            .await;
        // Written after the status check of a concurrent request
        let late: Connection = create_record(
            store.as_ref(),
            Collection::Connection,
            &json!({ "requester_email": VIEWER, "recipient_email": "b@x.com" }),
        )
        .await
        .unwrap();

        let result = matchmaker.settle_duplicates(&late).await;
        assert!(matches!(result, Err(DiscoveryError::Conflict(_))));

        let rows = store.list(Collection::Connection).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "first");

        let first: Connection = serde_json::from_value(rows[0].clone()).unwrap();
        matchmaker.settle_duplicates(&first).await.unwrap();
        assert_eq!(store.list(Collection::Connection).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_requests_leave_one_row() {
        let (store, matchmaker) = setup().await;

        let (one, two) = tokio::join!(
            matchmaker.request_connection(VIEWER, "b@x.com"),
            matchmaker.request_connection(VIEWER, "b@x.com"),
        );

        assert_eq!([one.is_ok(), two.is_ok()].iter().filter(|ok| **ok).count(), 1);
        assert_eq!(store.list(Collection::Connection).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_request_rejects_self_and_unknown() {
        let (_store, matchmaker) = setup().await;

        let own = matchmaker.request_connection(VIEWER, VIEWER).await;
        assert!(matches!(own, Err(DiscoveryError::InvalidInput(_))));

        let unknown = matchmaker.request_connection(VIEWER, "ghost@x.com").await;
        assert!(matches!(unknown, Err(DiscoveryError::NotFound(_))));

        let garbage = matchmaker.request_connection(VIEWER, "not-an-email").await;
        assert!(matches!(garbage, Err(DiscoveryError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_request_fails_when_connections_unavailable() {
        let (store, matchmaker) = setup().await;
        store.set_unavailable(Collection::Connection, true).await;

        let result = matchmaker.request_connection(VIEWER, "b@x.com").await;
        assert!(matches!(result, Err(DiscoveryError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_accept_opens_conversation() {
        let (store, matchmaker) = setup().await;
        matchmaker.request_connection("b@x.com", VIEWER).await.unwrap();

        let committed = matchmaker.accept_connection(VIEWER, "b@x.com").await.unwrap();
        assert_eq!(committed.record.participants, vec!["b@x.com".to_string(), VIEWER.to_string()]);

        let status = matchmaker.pair_status(VIEWER, "b@x.com").await.unwrap();
        assert_eq!(status, RelationshipStatus::Connected);

        let again = matchmaker.accept_connection(VIEWER, "b@x.com").await;
        assert!(matches!(again, Err(DiscoveryError::Conflict(_))));

        let notes = store
            .filter(Collection::Notification, &json!({ "recipient_email": "b@x.com" }))
            .await
            .unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0]["kind"], "connection_accepted");
    }

    #[tokio::test]
    async fn test_requester_cannot_accept_own_request() {
        let (_store, matchmaker) = setup().await;
        matchmaker.request_connection(VIEWER, "b@x.com").await.unwrap();

        let result = matchmaker.accept_connection(VIEWER, "b@x.com").await;
        assert!(matches!(result, Err(DiscoveryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_withdraw_only_own_requests() {
        let (_store, matchmaker) = setup().await;
        let committed = matchmaker.request_connection(VIEWER, "b@x.com").await.unwrap();
        let id = committed.record.id.clone();

        let stranger = matchmaker.withdraw_connection("b@x.com", &id).await;
        assert!(matches!(stranger, Err(DiscoveryError::NotFound(_))));

        matchmaker.withdraw_connection(VIEWER, &id).await.unwrap();
        assert_eq!(
            matchmaker.pair_status(VIEWER, "b@x.com").await.unwrap(),
            RelationshipStatus::None
        );

        let gone = matchmaker.withdraw_connection(VIEWER, &id).await;
        assert!(matches!(gone, Err(DiscoveryError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_mark_notification_read() {
        let (store, matchmaker) = setup().await;
        matchmaker.request_connection(VIEWER, "b@x.com").await.unwrap();
        let notes = store.list(Collection::Notification).await.unwrap();
        let id = notes[0]["id"].as_str().unwrap().to_string();

        let foreign = matchmaker.mark_notification_read(VIEWER, &id).await;
        assert!(matches!(foreign, Err(DiscoveryError::NotFound(_))));

        let read = matchmaker.mark_notification_read("b@x.com", &id).await.unwrap();
        assert!(read.is_read);
    }
}

use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{Collection, EntityStore};
use crate::error::NotifyError;
use crate::models::NewNotification;

#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// One best-effort side effect queued after a state change commits.
#[derive(Debug, Clone)]
pub enum Dispatch {
    InApp(NewNotification),
    Email(EmailMessage),
}

impl Dispatch {
    fn label(&self) -> String {
        match self {
            Dispatch::InApp(n) => format!("in_app:{}", n.recipient_email),
            Dispatch::Email(m) => format!("email:{}", m.to),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchState {
    Sent,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchOutcome {
    pub label: String,
    pub state: DispatchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DispatchReport {
    pub outcomes: Vec<DispatchOutcome>,
}

impl DispatchReport {
    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.state == DispatchState::Failed)
            .count()
    }

    fn record(&mut self, label: String, state: DispatchState, error: Option<String>) {
        self.outcomes.push(DispatchOutcome { label, state, error });
    }
}

/// Posts transactional email to the configured integration endpoint.
#[derive(Debug, Clone)]
pub struct EmailSender {
    client: Client,
    endpoint: String,
}

impl EmailSender {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub async fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let response = self.client.post(&self.endpoint).json(message).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    store: Arc<dyn EntityStore>,
    email: Option<EmailSender>,
}

impl NotificationDispatcher {
    pub fn new(store: Arc<dyn EntityStore>, email: Option<EmailSender>) -> Self {
        Self { store, email }
    }

    /// Run every dispatch in order. A failure is logged and recorded but
    /// never stops the remaining dispatches or reaches the caller.
    pub async fn dispatch_all(&self, dispatches: Vec<Dispatch>) -> DispatchReport {
        let mut report = DispatchReport::default();

        for dispatch in dispatches {
            let label = dispatch.label();
            let result = match &dispatch {
                Dispatch::InApp(notification) => self.store_notification(notification).await,
                Dispatch::Email(message) => match &self.email {
                    Some(sender) => sender.send(message).await,
                    None => {
                        tracing::debug!("No email endpoint configured, skipping {}", label);
                        report.record(label, DispatchState::Skipped, None);
                        continue;
                    }
                },
            };

            match result {
                Ok(()) => {
                    tracing::info!("Notification sent: {}", label);
                    report.record(label, DispatchState::Sent, None);
                }
                Err(e) => {
                    tracing::error!("Notification failed: {}: {}", label, e);
                    report.record(label, DispatchState::Failed, Some(e.to_string()));
                }
            }
        }

        report
    }

    async fn store_notification(&self, notification: &NewNotification) -> Result<(), NotifyError> {
        let fields = serde_json::to_value(notification).map_err(crate::error::StoreError::from)?;
        self.store.create(Collection::Notification, fields).await?;
        Ok(())
    }
}

use anyhow::Result;
use std::env;
use std::time::Duration;
use crate::constants::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SERVER_PORT};

/// Where entities live.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    /// Hosted entity API
    Http { base_url: String, api_key: Option<String> },
    /// Local PostgreSQL, configured through `DatabaseConfig`
    Postgres,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub backend: StoreBackend,
    pub http_timeout: Duration,
    pub admin_emails: Vec<String>,
    pub notify_email_url: Option<String>,
    pub allowed_origins: Vec<String>,
}

fn split_csv(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let backend = match (non_empty("ENTITY_API_URL"), non_empty("DATABASE_URL")) {
            (Some(base_url), _) => StoreBackend::Http {
                base_url,
                api_key: non_empty("ENTITY_API_KEY"),
            },
            (None, Some(_)) => StoreBackend::Postgres,
            (None, None) => {
                return Err(anyhow::anyhow!("ENTITY_API_URL or DATABASE_URL must be set"));
            }
        };

        Ok(Self {
            port: non_empty("PORT")
                .and_then(|port| port.parse().ok())
                .unwrap_or(DEFAULT_SERVER_PORT),
            backend,
            http_timeout: Duration::from_secs(
                non_empty("ENTITY_API_TIMEOUT_SECS")
                    .and_then(|secs| secs.parse().ok())
                    .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS),
            ),
            admin_emails: split_csv(non_empty("ADMIN_EMAILS")),
            notify_email_url: non_empty("NOTIFY_EMAIL_URL"),
            allowed_origins: split_csv(non_empty("ALLOWED_ORIGINS")),
        })
    }
}

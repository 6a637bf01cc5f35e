use serde::{Deserialize, Serialize};

use super::nullable;
use crate::constants::{ACTIVE_SUBSCRIPTION_STATUS, ADMIN_ROLE};

/// Authenticated account as stored by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub subscription_status: Option<String>,
}

impl User {
    pub fn has_admin_role(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription_status.as_deref() == Some(ACTIVE_SUBSCRIPTION_STATUS)
    }
}

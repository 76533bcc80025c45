//! Session data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Local storage key holding the serialized [`Session`].
pub const SESSION_STORAGE_KEY: &str = "auth.session";

/// Local storage flag set once the one-time credential wipe has run.
pub const FORCE_RESET_KEY: &str = "auth_force_reset";

/// The authenticated user as reported by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Tokens plus the user they belong to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    pub user: Identity,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

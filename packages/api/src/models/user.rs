//! # Staff profile records
//!
//! [`UserProfile`] is the application-level record behind a signed-in
//! identity: a row of the `users` collection keyed by the identity provider's
//! user id. It carries the dashboard role and account status; phone, picture
//! and last login are optional columns.
//!
//! A missing row is a normal state (the identity exists, the profile does not)
//! and surfaces as `profile = None`, never as an error.
//!
//! The helper [`UserProfile::display_name`] returns the full name or falls
//! back to the email address.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use store::{Collection, RecordId, Table};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Chairman,
    Treasurer,
    Developer,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
}

/// A row of the `users` collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserProfile {
    pub id: RecordId,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub profile_picture_url: Option<String>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

impl UserProfile {
    /// Get display name, falling back to email if name is empty.
    pub fn display_name(&self) -> &str {
        if self.full_name.trim().is_empty() {
            &self.email
        } else {
            &self.full_name
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == UserStatus::Active
    }
}

impl Table for UserProfile {
    const COLLECTION: Collection = Collection::Users;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_profile_row() {
        let profile: UserProfile = serde_json::from_value(json!({
            "id": "u-1",
            "email": "treasurer@example.org",
            "full_name": "",
            "role": "treasurer",
            "status": "active",
            "last_login_at": null
        }))
        .unwrap();
        assert_eq!(profile.role, Role::Treasurer);
        assert!(profile.is_active());
        assert_eq!(profile.display_name(), "treasurer@example.org");
    }

    #[test]
    fn test_unknown_role_is_rejected() {
        let row = json!({
            "id": "u-1", "email": "a@b.c", "full_name": "A",
            "role": "guest", "status": "active"
        });
        assert!(serde_json::from_value::<UserProfile>(row).is_err());
    }
}

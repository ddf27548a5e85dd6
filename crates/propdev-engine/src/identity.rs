//! Caller identity, as yielded by the external identity provider.
//!
//! Identity is passed explicitly into each operation rather than held as
//! ambient session state; `None` means an anonymous caller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal user id. Users are provisioned lazily by an external collaborator
/// on first authenticated interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        UserId(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// What the identity provider yields for the current caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque stable token from the identity provider
    pub token_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Provisioned user row mapping an identity token to an internal id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub token_identifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl UserRecord {
    /// Provision a user row for an identity.
    pub fn from_identity(identity: &Identity) -> Self {
        UserRecord {
            id: UserId::new(),
            token_identifier: identity.token_identifier.clone(),
            display_name: identity.display_name.clone(),
            email: identity.email.clone(),
            created_at: Utc::now(),
        }
    }
}

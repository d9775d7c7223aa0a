//! Authenticated identities as reported by the identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The authenticated identity returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Provider-issued unique id.
    pub id: String,
    /// Display name, if the account has one.
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Session metadata decoded from the provider's token.
    #[serde(default)]
    pub session: Option<SessionMetadata>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            email: None,
            session: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Metadata about the provider session backing a principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// When the provider issued the session token.
    #[serde(default)]
    pub issued_at: Option<DateTime<Utc>>,
    /// When the session token stops being valid.
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Whether the session should survive an application restart.
    #[serde(default)]
    pub persistent: bool,
}

/// Identity provider state change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthEvent {
    SignedIn(Principal),
    SignedOut,
}

impl AuthEvent {
    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthEvent::SignedIn(principal) => Some(principal),
            AuthEvent::SignedOut => None,
        }
    }
}

impl From<Option<Principal>> for AuthEvent {
    fn from(principal: Option<Principal>) -> Self {
        match principal {
            Some(principal) => AuthEvent::SignedIn(principal),
            None => AuthEvent::SignedOut,
        }
    }
}

//! Session lifecycle and role resolution.
//!
//! A single controller task owns the session state. Identity provider
//! notifications and `login`/`logout` commands are applied one at a time,
//! and every change is published as a snapshot on a watch channel.
//!
//! State machine:
//!
//! ```text
//! Uninitialized (loading) --notification--> SignedOut <--> SignedIn(principal, profile)
//! ```

mod handle;
mod manager;

pub use handle::SessionHandle;
pub use manager::{SessionManager, SessionScope};

use serde::{Deserialize, Deserializer, Serialize};
use student_living_common::{Principal, Profile};

use crate::identity::IdentityError;

/// Message returned whenever the session is used without a live provider scope.
pub const OUTSIDE_SCOPE: &str = "session accessor must be used within a session provider";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Authentication failed: {0}")]
    Authentication(#[from] IdentityError),
    #[error("Not authorized: {0}")]
    Authorization(String),
    #[error("Configuration error: {0}")]
    Configuration(&'static str),
}

/// Snapshot of the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub principal: Option<Principal>,
    pub profile: Option<Profile>,
    /// True until the first identity notification or command has been handled.
    pub loading: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            principal: None,
            profile: None,
            loading: true,
        }
    }
}

impl SessionState {
    pub fn is_signed_in(&self) -> bool {
        self.principal.is_some()
    }

    pub fn principal_id(&self) -> Option<&str> {
        self.principal.as_ref().map(|p| p.id.as_str())
    }
}

/// Role requested at login. Anything other than `admin` means student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedRole {
    Admin,
    #[default]
    #[serde(other)]
    Student,
}

/// Missing or null fields fall back to their defaults, so an incomplete
/// body reaches the credential check instead of failing to parse.
#[derive(Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub password: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: RequestedRole,
    #[serde(default, deserialize_with = "null_as_default")]
    pub remember_me: bool,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl LoginRequest {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role: RequestedRole::Student,
            remember_me: false,
        }
    }

    pub fn as_admin(mut self) -> Self {
        self.role = RequestedRole::Admin;
        self
    }

    pub fn remember_me(mut self, remember_me: bool) -> Self {
        self.remember_me = remember_me;
        self
    }
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("remember_me", &self.remember_me)
            .finish()
    }
}

//! Identity provider abstraction.
//!
//! The session controller only talks to the identity service through the
//! `IdentityProvider` trait: a subscription to sign-in state changes plus
//! the two credential operations.

mod memory;
mod notifier;
mod rest;

pub use memory::InMemoryIdentityProvider;
pub use notifier::AuthStateNotifier;
pub use rest::RestIdentityProvider;

use async_trait::async_trait;
use student_living_common::{AuthEvent, Principal};
use tokio::sync::mpsc;

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("Email and password are required")]
    MissingCredentials,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("User account is disabled")]
    UserDisabled,
    #[error("Too many sign-in attempts, try again later")]
    TooManyAttempts,
    #[error("Identity provider error: {0}")]
    Provider(String),
    #[error("Identity provider communication error: {0}")]
    Communication(String),
}

/// Options forwarded with a password sign-in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SignInOptions {
    /// Keep the provider session across application restarts.
    pub remember_me: bool,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Subscribe to sign-in state changes.
    ///
    /// The current state is delivered first. Dropping the receiver
    /// unsubscribes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent>;

    /// Verify credentials and start a provider session.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        options: SignInOptions,
    ) -> Result<Principal, IdentityError>;

    /// End the provider session.
    async fn sign_out(&self) -> Result<(), IdentityError>;
}

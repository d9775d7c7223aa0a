use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use student_living_common::{AuthEvent, Principal, SessionMetadata};
use tokio::sync::mpsc;

use super::{AuthStateNotifier, IdentityError, IdentityProvider, SignInOptions};

struct Account {
    password: String,
    principal: Principal,
    disabled: bool,
}

/// Identity provider backed by an in-process account table.
///
/// Used for local development and as the provider in tests. `emit`
/// simulates sign-in state changes that originate outside this process.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    accounts: RwLock<HashMap<String, Account>>,
    notifier: AuthStateNotifier,
    fail_sign_out: AtomicBool,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account. The email is matched case-insensitively.
    pub fn add_account(&self, email: &str, password: &str, principal: Principal) {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        accounts.insert(
            email.to_lowercase(),
            Account {
                password: password.to_string(),
                principal,
                disabled: false,
            },
        );
    }

    pub fn disable_account(&self, email: &str) {
        let mut accounts = self.accounts.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(account) = accounts.get_mut(&email.to_lowercase()) {
            account.disabled = true;
        }
    }

    /// Make subsequent `sign_out` calls fail.
    pub fn set_sign_out_failure(&self, fail: bool) {
        self.fail_sign_out.store(fail, Ordering::SeqCst);
    }

    /// Publish a state change as if it came from the provider itself.
    pub fn emit(&self, principal: Option<Principal>) {
        self.notifier.publish(principal);
    }

    pub fn current_principal(&self) -> Option<Principal> {
        self.notifier.current()
    }

    pub fn subscriber_count(&self) -> usize {
        self.notifier.subscriber_count()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent> {
        self.notifier.subscribe()
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
        options: SignInOptions,
    ) -> Result<Principal, IdentityError> {
        let principal = {
            let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
            let account = accounts
                .get(&email.to_lowercase())
                .filter(|account| account.password == password)
                .ok_or(IdentityError::InvalidCredentials)?;
            if account.disabled {
                return Err(IdentityError::UserDisabled);
            }

            let mut principal = account.principal.clone();
            principal.session = Some(SessionMetadata {
                issued_at: Some(Utc::now()),
                expires_at: None,
                persistent: options.remember_me,
            });
            principal
        };

        self.notifier.publish(Some(principal.clone()));
        Ok(principal)
    }

    async fn sign_out(&self) -> Result<(), IdentityError> {
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider("sign-out rejected".to_string()));
        }
        self.notifier.publish(None);
        Ok(())
    }
}

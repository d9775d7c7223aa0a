//! Fan-out of sign-in state to subscribers.

use std::sync::{Mutex, PoisonError};

use student_living_common::{AuthEvent, Principal};
use tokio::sync::mpsc;

#[derive(Default)]
struct NotifierState {
    current: Option<Principal>,
    subscribers: Vec<mpsc::UnboundedSender<AuthEvent>>,
}

/// Holds the provider's current principal and notifies subscribers of
/// every change.
#[derive(Default)]
pub struct AuthStateNotifier {
    state: Mutex<NotifierState>,
}

impl AuthStateNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current principal, if signed in.
    pub fn current(&self) -> Option<Principal> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .clone()
    }

    /// Register a subscriber. The current state is queued before returning.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<AuthEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Receiver is alive, send cannot fail.
        let _ = tx.send(AuthEvent::from(state.current.clone()));
        state.subscribers.push(tx);
        rx
    }

    /// Replace the current principal and notify every live subscriber.
    pub fn publish(&self, principal: Option<Principal>) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let event = AuthEvent::from(principal.clone());
        state.current = principal;
        state.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        tracing::debug!(
            subscribers = state.subscribers.len(),
            signed_in = event.principal().is_some(),
            "Published auth state"
        );
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.subscribers.retain(|tx| !tx.is_closed());
        state.subscribers.len()
    }
}

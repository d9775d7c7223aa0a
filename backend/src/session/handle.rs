use student_living_common::Profile;
use tokio::sync::{mpsc, oneshot, watch};

use super::manager::SessionCommand;
use super::{LoginRequest, SessionError, SessionState, OUTSIDE_SCOPE};

/// Cloneable access to a running session controller.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::Sender<SessionCommand>,
        state: watch::Receiver<SessionState>,
    ) -> Self {
        Self { commands, state }
    }

    /// Current `{principal, profile, loading}` snapshot.
    pub fn current(&self) -> Result<SessionState, SessionError> {
        // The sender lives in the controller task; once it is gone the
        // scope has been torn down.
        if self.state.has_changed().is_err() {
            return Err(SessionError::Configuration(OUTSIDE_SCOPE));
        }
        Ok(self.state.borrow().clone())
    }

    /// Receiver that observes every future snapshot.
    pub fn changes(&self) -> Result<watch::Receiver<SessionState>, SessionError> {
        if self.state.has_changed().is_err() {
            return Err(SessionError::Configuration(OUTSIDE_SCOPE));
        }
        Ok(self.state.clone())
    }

    /// Resolve once the first identity notification has been handled.
    pub async fn wait_until_loaded(&self) -> Result<SessionState, SessionError> {
        let mut rx = self.changes()?;
        let state = rx
            .wait_for(|state| !state.loading)
            .await
            .map_err(|_| SessionError::Configuration(OUTSIDE_SCOPE))?;
        Ok(state.clone())
    }

    /// Sign in and resolve the profile for the requested role.
    ///
    /// The returned profile is installed into the session before this
    /// resolves, so `current()` agrees with it afterwards.
    pub async fn login(&self, request: LoginRequest) -> Result<Profile, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Login { request, reply })
            .await
            .map_err(|_| SessionError::Configuration(OUTSIDE_SCOPE))?;
        rx.await
            .map_err(|_| SessionError::Configuration(OUTSIDE_SCOPE))?
    }

    /// End the provider session, then clear principal and profile.
    ///
    /// On failure the session state is left untouched.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(SessionCommand::Logout { reply })
            .await
            .map_err(|_| SessionError::Configuration(OUTSIDE_SCOPE))?;
        rx.await
            .map_err(|_| SessionError::Configuration(OUTSIDE_SCOPE))?
    }
}

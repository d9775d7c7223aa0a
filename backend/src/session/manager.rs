use std::sync::Arc;

use chrono::Utc;
use student_living_common::{AdminProfile, AuthEvent, Principal, Profile, StudentProfile};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{LoginRequest, RequestedRole, SessionError, SessionHandle, SessionState};
use crate::identity::{IdentityError, IdentityProvider, SignInOptions};
use crate::store::RecordStore;

const COMMAND_BUFFER: usize = 32;

pub(crate) enum SessionCommand {
    Login {
        request: LoginRequest,
        reply: oneshot::Sender<Result<Profile, SessionError>>,
    },
    Logout {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
}

/// Entry point for starting a session controller.
pub struct SessionManager;

impl SessionManager {
    /// Subscribe to the identity provider and spawn the controller task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(identity: Arc<dyn IdentityProvider>, store: Arc<dyn RecordStore>) -> SessionScope {
        let (state_tx, state_rx) = watch::channel(SessionState::default());
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let events = identity.subscribe();
        let controller = SessionController {
            identity,
            store,
            state: state_tx,
        };
        let task = tokio::spawn(controller.run(events, command_rx, shutdown_rx));

        SessionScope {
            commands: command_tx,
            state: state_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Owner of a running session controller.
///
/// Handles obtained from the scope work for as long as it lives. Dropping
/// the scope aborts the controller; `shutdown` stops it and waits.
pub struct SessionScope {
    commands: mpsc::Sender<SessionCommand>,
    state: watch::Receiver<SessionState>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionScope {
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(self.commands.clone(), self.state.clone())
    }

    /// Stop the controller and release the identity subscription.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Session controller task failed: {}", e);
            }
        }
    }
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Sole writer of the session state.
struct SessionController {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn RecordStore>,
    state: watch::Sender<SessionState>,
}

impl SessionController {
    async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<AuthEvent>,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        tracing::debug!("Session controller started");

        loop {
            // Notifications are drained before commands so a command always
            // sees every state change the provider reported before it.
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                event = events.recv() => match event {
                    Some(event) => self.apply_event(event),
                    None => {
                        tracing::warn!("Identity provider closed the auth state subscription");
                        break;
                    }
                },
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        tracing::debug!("Session controller stopped");
    }

    /// Apply an identity provider notification.
    ///
    /// A notification for the principal already in session keeps the
    /// profile resolved by `login`; any other principal gets the default
    /// student shape.
    fn apply_event(&self, event: AuthEvent) {
        self.state.send_modify(|state| {
            match event {
                AuthEvent::SignedIn(principal) => {
                    let same_principal = state.profile.is_some()
                        && state.principal.as_ref().map(|p| p.id.as_str()) == Some(principal.id.as_str());
                    if !same_principal {
                        state.profile = Some(Profile::Student(StudentProfile::from_principal(
                            &principal,
                            Utc::now(),
                        )));
                    }
                    tracing::debug!(principal_id = %principal.id, "Auth state: signed in");
                    state.principal = Some(principal);
                }
                AuthEvent::SignedOut => {
                    tracing::debug!("Auth state: signed out");
                    state.principal = None;
                    state.profile = None;
                }
            }
            state.loading = false;
        });
    }

    async fn handle_command(&self, command: SessionCommand) {
        match command {
            SessionCommand::Login { request, reply } => {
                let result = self.login(request).await;
                let _ = reply.send(result);
            }
            SessionCommand::Logout { reply } => {
                let result = self.logout().await;
                let _ = reply.send(result);
            }
        }
    }

    async fn login(&self, request: LoginRequest) -> Result<Profile, SessionError> {
        let email = request.email.trim();
        if email.is_empty() || request.password.is_empty() {
            tracing::error!("Login rejected: missing credentials");
            return Err(SessionError::Authentication(IdentityError::MissingCredentials));
        }

        let options = SignInOptions {
            remember_me: request.remember_me,
        };
        let principal = self
            .identity
            .sign_in_with_password(email, &request.password, options)
            .await
            .map_err(|e| {
                tracing::error!(email = %email, "Login failed: {}", e);
                SessionError::Authentication(e)
            })?;

        let profile = match request.role {
            RequestedRole::Admin => match self.admin_profile(&principal.id).await {
                Ok(admin) => Profile::Admin(admin),
                Err(e) => {
                    // The provider session is live, but the store refused the
                    // admin role: drop any admin profile held for this principal.
                    let student = StudentProfile::from_principal(&principal, Utc::now());
                    self.install(principal, Profile::Student(student));
                    return Err(e);
                }
            },
            RequestedRole::Student => {
                Profile::Student(StudentProfile::from_principal(&principal, Utc::now()))
            }
        };

        tracing::info!(
            principal_id = %principal.id,
            role = %profile.role(),
            "Login succeeded"
        );

        self.install(principal, profile.clone());
        Ok(profile)
    }

    async fn admin_profile(&self, principal_id: &str) -> Result<AdminProfile, SessionError> {
        self.store
            .admin_profile(principal_id)
            .await
            .map_err(|e| {
                tracing::error!(principal_id = %principal_id, "Admin lookup failed: {}", e);
                SessionError::Authorization(format!("admin lookup failed: {}", e))
            })?
            .ok_or_else(|| {
                tracing::error!(principal_id = %principal_id, "Login rejected: not an admin");
                SessionError::Authorization("not authorized as admin".to_string())
            })
    }

    fn install(&self, principal: Principal, profile: Profile) {
        self.state.send_modify(move |state| {
            state.principal = Some(principal);
            state.profile = Some(profile);
            state.loading = false;
        });
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.identity.sign_out().await.map_err(|e| {
            tracing::error!("Logout failed: {}", e);
            SessionError::Authentication(e)
        })?;

        self.state.send_modify(|state| {
            state.principal = None;
            state.profile = None;
            state.loading = false;
        });
        tracing::info!("Logged out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::InMemoryIdentityProvider;
    use crate::session::OUTSIDE_SCOPE;
    use crate::store::{SqliteRecordStore, StoreError};
    use crate::test_util::mock_store::MockStore;
    use crate::test_util::{
        admin_profile, seeded_identity, student_principal, ADMIN_EMAIL, ADMIN_ID, ADMIN_PASSWORD,
        STUDENT_EMAIL, STUDENT_ID, STUDENT_PASSWORD,
    };
    use student_living_common::{ApplicationStatus, Role};

    struct Fixture {
        identity: Arc<InMemoryIdentityProvider>,
        store: Arc<SqliteRecordStore>,
        scope: SessionScope,
    }

    fn fixture() -> Fixture {
        let identity = Arc::new(seeded_identity());
        let store = Arc::new(SqliteRecordStore::new(":memory:").unwrap());
        let scope = SessionManager::start(identity.clone(), store.clone());
        Fixture {
            identity,
            store,
            scope,
        }
    }

    /// Round-trip a no-op command so every queued notification is applied.
    async fn settle(handle: &SessionHandle) {
        let _ = handle.login(LoginRequest::new("", "")).await;
    }

    #[tokio::test]
    async fn test_first_notification_ends_loading() {
        let fx = fixture();
        let handle = fx.scope.handle();

        let state = handle.wait_until_loaded().await.unwrap();
        assert!(!state.loading);
        assert!(state.principal.is_none());
        assert!(state.profile.is_none());
    }

    #[tokio::test]
    async fn test_student_login_returns_pending_student_profile() {
        let fx = fixture();
        let handle = fx.scope.handle();

        let profile = handle
            .login(LoginRequest::new(STUDENT_EMAIL, STUDENT_PASSWORD))
            .await
            .unwrap();

        match &profile {
            Profile::Student(student) => {
                assert_eq!(student.id, STUDENT_ID);
                assert_eq!(student.name, "Lerato");
                assert_eq!(student.surname, "Mokoena");
                assert_eq!(student.application_status, ApplicationStatus::Pending);
                assert!(student.place_of_study.is_empty());
            }
            other => panic!("expected student profile, got {:?}", other),
        }
        assert_ne!(profile.role(), Role::Admin);

        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some(STUDENT_ID));
        assert_eq!(state.profile, Some(profile));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_admin_login_returns_stored_admin_profile() {
        let fx = fixture();
        fx.store.insert_admin(ADMIN_ID, &admin_profile()).unwrap();
        let handle = fx.scope.handle();

        let profile = handle
            .login(LoginRequest::new(ADMIN_EMAIL, ADMIN_PASSWORD).as_admin())
            .await
            .unwrap();
        assert_eq!(profile, Profile::Admin(admin_profile()));

        // The provider's own sign-in notification must not replace it.
        settle(&handle).await;
        let state = handle.current().unwrap();
        assert_eq!(state.profile, Some(Profile::Admin(admin_profile())));
        assert_eq!(state.principal_id(), Some(ADMIN_ID));
    }

    #[tokio::test]
    async fn test_admin_login_without_admin_record_is_unauthorized() {
        let fx = fixture();
        let handle = fx.scope.handle();

        let result = handle
            .login(LoginRequest::new(STUDENT_EMAIL, STUDENT_PASSWORD).as_admin())
            .await;
        match result {
            Err(SessionError::Authorization(message)) => {
                assert_eq!(message, "not authorized as admin")
            }
            other => panic!("expected authorization error, got {:?}", other),
        }

        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some(STUDENT_ID));
        assert!(matches!(state.profile, Some(Profile::Student(_))));

        settle(&handle).await;
        let state = handle.current().unwrap();
        assert!(!state.profile.as_ref().is_some_and(Profile::is_admin));
    }

    #[tokio::test]
    async fn test_refused_admin_reauthentication_drops_admin_profile() {
        let lookups = Arc::new(std::sync::Mutex::new(0));
        let counter = lookups.clone();
        let mut store = MockStore::new();
        store.expect_admin_profile().returning(move |_| {
            let mut n = counter.lock().unwrap();
            *n += 1;
            if *n == 1 {
                Ok(Some(admin_profile()))
            } else {
                Ok(None)
            }
        });
        let scope = SessionManager::start(Arc::new(seeded_identity()), Arc::new(store));
        let handle = scope.handle();

        let profile = handle
            .login(LoginRequest::new(ADMIN_EMAIL, ADMIN_PASSWORD).as_admin())
            .await
            .unwrap();
        assert!(profile.is_admin());

        // Admin record is gone by the second attempt.
        let result = handle
            .login(LoginRequest::new(ADMIN_EMAIL, ADMIN_PASSWORD).as_admin())
            .await;
        assert!(matches!(result, Err(SessionError::Authorization(_))));

        settle(&handle).await;
        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some(ADMIN_ID));
        assert!(matches!(state.profile, Some(Profile::Student(_))));
        assert_eq!(*lookups.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_out_of_range_token_lifetime_keeps_controller_alive() {
        use crate::identity::RestIdentityProvider;
        use serde_json::json;
        use std::time::Duration;
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "displayName": "Lerato Mokoena",
                "expiresIn": "1000000000000000"
            })))
            .mount(&server)
            .await;
        let identity =
            RestIdentityProvider::new(&server.uri(), "test-key", Duration::from_secs(5)).unwrap();
        let store = Arc::new(SqliteRecordStore::new(":memory:").unwrap());
        let scope = SessionManager::start(Arc::new(identity), store);
        let handle = scope.handle();

        let profile = handle
            .login(LoginRequest::new("student@example.com", "secret"))
            .await
            .unwrap();
        assert!(!profile.is_admin());

        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some("uid-1"));
        let session = state.principal.and_then(|p| p.session).unwrap();
        assert_eq!(session.expires_at, None);
        assert!(handle.logout().await.is_ok());
    }

    #[tokio::test]
    async fn test_admin_lookup_failure_is_unauthorized() {
        let identity = Arc::new(seeded_identity());
        let mut store = MockStore::new();
        store
            .expect_admin_profile()
            .returning(|_| Err(StoreError::DatabaseError("database is locked".to_string())));
        let scope = SessionManager::start(identity, Arc::new(store));

        let result = scope
            .handle()
            .login(LoginRequest::new(ADMIN_EMAIL, ADMIN_PASSWORD).as_admin())
            .await;
        match result {
            Err(SessionError::Authorization(message)) => assert!(message.contains("database is locked")),
            other => panic!("expected authorization error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_credentials_are_authentication_errors() {
        let fx = fixture();
        let handle = fx.scope.handle();

        let result = handle
            .login(LoginRequest::new(STUDENT_EMAIL, "wrong"))
            .await;
        assert!(matches!(
            result,
            Err(SessionError::Authentication(IdentityError::InvalidCredentials))
        ));
        assert!(handle.current().unwrap().principal.is_none());
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_provider() {
        let fx = fixture();
        let handle = fx.scope.handle();

        let result = handle.login(LoginRequest::new("   ", STUDENT_PASSWORD)).await;
        assert!(matches!(
            result,
            Err(SessionError::Authentication(IdentityError::MissingCredentials))
        ));
        assert!(fx.identity.current_principal().is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_session() {
        let fx = fixture();
        let handle = fx.scope.handle();
        handle
            .login(LoginRequest::new(STUDENT_EMAIL, STUDENT_PASSWORD))
            .await
            .unwrap();

        handle.logout().await.unwrap();

        let state = handle.current().unwrap();
        assert!(state.principal.is_none());
        assert!(state.profile.is_none());
        assert!(fx.identity.current_principal().is_none());
    }

    #[tokio::test]
    async fn test_failed_logout_leaves_session_untouched() {
        let fx = fixture();
        let handle = fx.scope.handle();
        let profile = handle
            .login(LoginRequest::new(STUDENT_EMAIL, STUDENT_PASSWORD))
            .await
            .unwrap();
        fx.identity.set_sign_out_failure(true);

        let result = handle.logout().await;
        assert!(matches!(
            result,
            Err(SessionError::Authentication(IdentityError::Provider(_)))
        ));

        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some(STUDENT_ID));
        assert_eq!(state.profile, Some(profile));
    }

    #[tokio::test]
    async fn test_external_notifications_drive_state() {
        let fx = fixture();
        let handle = fx.scope.handle();
        handle.wait_until_loaded().await.unwrap();
        let mut changes = handle.changes().unwrap();

        fx.identity.emit(Some(student_principal()));
        let state = changes
            .wait_for(|s| s.principal.is_some())
            .await
            .unwrap()
            .clone();
        match state.profile {
            Some(Profile::Student(student)) => assert_eq!(student.full_name, "Lerato Mokoena"),
            other => panic!("expected default student profile, got {:?}", other),
        }

        fx.identity.emit(None);
        let state = changes
            .wait_for(|s| s.principal.is_none())
            .await
            .unwrap()
            .clone();
        assert!(state.profile.is_none());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_notification_for_other_principal_rederives_profile() {
        let fx = fixture();
        fx.store.insert_admin(ADMIN_ID, &admin_profile()).unwrap();
        let handle = fx.scope.handle();
        handle
            .login(LoginRequest::new(ADMIN_EMAIL, ADMIN_PASSWORD).as_admin())
            .await
            .unwrap();

        fx.identity.emit(Some(student_principal()));
        settle(&handle).await;

        let state = handle.current().unwrap();
        assert_eq!(state.principal_id(), Some(STUDENT_ID));
        assert!(matches!(state.profile, Some(Profile::Student(_))));
    }

    #[tokio::test]
    async fn test_accessors_fail_after_scope_shutdown() {
        let fx = fixture();
        let handle = fx.scope.handle();
        handle.wait_until_loaded().await.unwrap();
        assert_eq!(fx.identity.subscriber_count(), 1);

        fx.scope.shutdown().await;

        assert!(matches!(
            handle.current(),
            Err(SessionError::Configuration(OUTSIDE_SCOPE))
        ));
        assert!(matches!(
            handle.changes(),
            Err(SessionError::Configuration(OUTSIDE_SCOPE))
        ));
        assert!(matches!(
            handle.wait_until_loaded().await,
            Err(SessionError::Configuration(_))
        ));
        assert!(matches!(
            handle.login(LoginRequest::new(STUDENT_EMAIL, STUDENT_PASSWORD)).await,
            Err(SessionError::Configuration(_))
        ));
        assert!(matches!(
            handle.logout().await,
            Err(SessionError::Configuration(_))
        ));
        assert_eq!(fx.identity.subscriber_count(), 0);
    }
}

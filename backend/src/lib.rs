pub mod config;
pub mod error;
pub mod history;
pub mod identity;
pub mod logging;
pub mod routes;
pub mod session;
pub mod store;
pub mod test_util;

pub use config::Config;
pub use error::ApiError;
pub use history::{HistoryPage, RequestHistoryView};
pub use identity::{IdentityError, IdentityProvider, InMemoryIdentityProvider, RestIdentityProvider};
pub use session::{LoginRequest, SessionError, SessionHandle, SessionManager, SessionScope, SessionState};
pub use store::{RecordStore, SqliteRecordStore, StoreError};

use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    /// Accessor for the session owned by the running `SessionScope`.
    pub session: SessionHandle,
    /// Record store backing admin lookups and request history.
    pub store: Arc<dyn RecordStore>,
}

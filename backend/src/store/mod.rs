//! Record store holding administrator profiles and sleepover requests.

mod sqlite;

pub use sqlite::SqliteRecordStore;

use async_trait::async_trait;
use student_living_common::{AdminProfile, SleepoverRequest};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Corrupt record {id}: {reason}")]
    CorruptRecord { id: String, reason: String },
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Administrator profile keyed by principal id.
    async fn admin_profile(&self, principal_id: &str) -> Result<Option<AdminProfile>, StoreError>;

    /// All sleepover requests submitted by a principal, in store order.
    async fn sleepover_requests(&self, principal_id: &str)
        -> Result<Vec<SleepoverRequest>, StoreError>;
}

//! Sleepover request history for the signed-in student.
//!
//! Each `RequestHistoryView` is one view instance. Fetches are tagged with
//! a generation number; a result is only applied if no newer fetch was
//! started and the view has not been closed in the meantime.

mod format;
mod page;

pub use format::format_long_date;
pub use page::{BadgeTone, HistoryContent, HistoryPage, Link, RequestCard, StatusBadge};

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::FixedOffset;
use student_living_common::SleepoverRequest;
use tokio::sync::RwLock;

use crate::store::{RecordStore, StoreError};

/// Inline message shown when the store cannot be read.
pub const FETCH_FAILED: &str = "Failed to fetch sleepover requests";

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Failed to fetch sleepover requests: {0}")]
    Store(#[from] StoreError),
}

struct HistoryState {
    requests: Vec<SleepoverRequest>,
    loading: bool,
    error: Option<String>,
}

pub struct RequestHistoryView {
    store: Arc<dyn RecordStore>,
    offset: FixedOffset,
    generation: AtomicU64,
    closed: AtomicBool,
    state: RwLock<HistoryState>,
}

impl RequestHistoryView {
    pub fn new(store: Arc<dyn RecordStore>, offset: FixedOffset) -> Self {
        Self {
            store,
            offset,
            generation: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            state: RwLock::new(HistoryState {
                requests: Vec::new(),
                loading: true,
                error: None,
            }),
        }
    }

    /// Fetch the principal's requests and apply them to the view.
    ///
    /// Failures are logged and turned into the inline error; the previous
    /// list is kept. Returns false when the result was discarded because a
    /// newer fetch started or the view was closed.
    pub async fn refresh(&self, principal_id: &str) -> bool {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let result = self
            .store
            .sleepover_requests(principal_id)
            .await
            .map_err(FetchError::from);

        let mut state = self.state.write().await;
        if self.closed.load(Ordering::SeqCst) || self.generation.load(Ordering::SeqCst) != generation
        {
            tracing::debug!(
                principal_id = %principal_id,
                generation,
                "Discarding stale sleepover history fetch"
            );
            return false;
        }

        match result {
            Ok(requests) => {
                tracing::debug!(
                    principal_id = %principal_id,
                    count = requests.len(),
                    "Loaded sleepover history"
                );
                state.requests = requests;
                state.error = None;
            }
            Err(e) => {
                tracing::error!(principal_id = %principal_id, "{}", e);
                state.error = Some(FETCH_FAILED.to_string());
            }
        }
        state.loading = false;
        true
    }

    /// Tear the view down. In-flight fetches will not touch it any more.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn requests(&self) -> Vec<SleepoverRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn page(&self) -> HistoryPage {
        let state = self.state.read().await;
        HistoryPage::render(&state.requests, state.loading, state.error.clone(), &self.offset)
    }
}

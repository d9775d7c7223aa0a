use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::error::{ApiError, Result};
use crate::history::{HistoryPage, RequestHistoryView};
use crate::AppState;

/// GET /student/sleepovers/history - the signed-in principal's requests.
///
/// Fetch failures are reported inline on the page, not as an HTTP error.
async fn sleepover_history(State(state): State<Arc<AppState>>) -> Result<Json<HistoryPage>> {
    let session = state.session.current()?;
    let principal_id = session.principal_id().ok_or(ApiError::NotSignedIn)?;

    let view = RequestHistoryView::new(state.store.clone(), state.config.history.offset());
    view.refresh(principal_id).await;
    let page = view.page().await;
    view.close();

    Ok(Json(page))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/student/sleepovers/history", get(sleepover_history))
        .with_state(state)
}

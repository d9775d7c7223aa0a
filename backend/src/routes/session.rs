//! Session routes.
//!
//! Provides:
//! - Current session snapshot (`GET /session`)
//! - SSE stream of session snapshots (`GET /session/events`)
//! - Login with role selection (`POST /session/login`)
//! - Logout (`POST /session/logout`)

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::stream::{Stream, StreamExt};
use serde::Serialize;
use student_living_common::Profile;
use tokio_stream::wrappers::WatchStream;

use crate::error::Result;
use crate::session::{LoginRequest, SessionState};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub profile: Profile,
    /// Landing page for the resolved role.
    pub home_route: &'static str,
}

/// GET /session - current `{principal, profile, loading}` snapshot.
async fn current_session(State(state): State<Arc<AppState>>) -> Result<Json<SessionState>> {
    Ok(Json(state.session.current()?))
}

/// GET /session/events - SSE stream of session snapshots.
///
/// The current snapshot is sent first, then one event per change.
async fn session_events(
    State(state): State<Arc<AppState>>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, axum::Error>>>> {
    let rx = state.session.changes()?;

    let stream = WatchStream::new(rx).map(|snapshot| Event::default().event("session").json_data(&snapshot));

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// POST /session/login - sign in and resolve the profile for the requested role.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    tracing::debug!(?request, "Login requested");

    let profile = state.session.login(request).await?;
    let home_route = profile.home_route();

    Ok(Json(LoginResponse { profile, home_route }))
}

/// POST /session/logout - end the provider session.
async fn logout(State(state): State<Arc<AppState>>) -> Result<StatusCode> {
    state.session.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/session", get(current_session))
        .route("/session/events", get(session_events))
        .route("/session/login", post(login))
        .route("/session/logout", post(logout))
        .with_state(state)
}

pub mod health;
pub mod history;
pub mod session;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::CorsConfig;
use crate::logging::request_logger;
use crate::AppState;

/// Build the full application router with its middleware stack.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);

    Router::new()
        .merge(health::router())
        .merge(session::router(state.clone()))
        .merge(history::router(state))
        .layer(middleware::from_fn(request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// `*` allows any origin; otherwise a comma-separated allow list.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins = config.origins.trim();
    let allow_origin = if origins == "*" {
        AllowOrigin::any()
    } else {
        let list: Vec<HeaderValue> = origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty() && *o != "*")
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin: {}", o);
                    None
                }
            })
            .collect();
        AllowOrigin::list(list)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::routing::get;
    use http::{header, Request};
    use tower::ServiceExt;

    async fn allowed_origin(origins: &str, origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/health", get(|| async { "ok" }))
            .layer(cors_layer(&CorsConfig {
                origins: origins.to_string(),
            }));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(header::ORIGIN, origin)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_cors_wildcard() {
        assert_eq!(
            allowed_origin("*", "http://localhost:5173").await.as_deref(),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_cors_allow_list() {
        let origins = "http://localhost:5173, https://living.example.com";
        assert_eq!(
            allowed_origin(origins, "https://living.example.com").await.as_deref(),
            Some("https://living.example.com")
        );
        assert_eq!(allowed_origin(origins, "https://evil.example.com").await, None);
    }
}

//! HTTP error mapping for the session service.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::identity::IdentityError;
use crate::session::SessionError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Not signed in")]
    NotSignedIn,
}

impl ApiError {
    fn status_and_type(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Session(SessionError::Authentication(IdentityError::MissingCredentials)) => {
                (StatusCode::BAD_REQUEST, "missing_credentials")
            }
            ApiError::Session(SessionError::Authentication(_)) => {
                (StatusCode::UNAUTHORIZED, "authentication_error")
            }
            ApiError::Session(SessionError::Authorization(_)) => {
                (StatusCode::FORBIDDEN, "authorization_error")
            }
            ApiError::Session(SessionError::Configuration(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
            ApiError::NotSignedIn => (StatusCode::UNAUTHORIZED, "not_signed_in"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_type();

        if status.is_server_error() {
            tracing::error!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

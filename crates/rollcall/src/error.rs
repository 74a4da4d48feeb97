//! Unified error type for the Rollcall service.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use rollcall_session::SessionError;
use serde::Serialize;

use crate::config::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically. As an
/// [`IntoResponse`] it becomes the JSON failure body every route shares:
/// `{success: false, error: <CODE>, message}`.
#[derive(Debug, thiserror::Error)]
pub enum RollcallError {
    /// A session-level error: scan rejection, auth, or the store is gone.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Startup configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request body or one of its fields is malformed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Socket bind or serve failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RollcallError {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Session(e) => e.code(),
            Self::Config(_) => "INVALID_CONFIG",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Io(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Session(e) => match e {
                SessionError::AuthFailed(_) => StatusCode::UNAUTHORIZED,
                SessionError::Forbidden(_) => StatusCode::FORBIDDEN,
                SessionError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                SessionError::InvalidConfig(_) | SessionError::Render(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                SessionError::NoActiveSession
                | SessionError::SessionMismatch(_)
                | SessionError::TokenMismatch
                | SessionError::SessionExpired(_)
                | SessionError::InvalidClass(_) => StatusCode::BAD_REQUEST,
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: &'static str,
    message: String,
}

impl IntoResponse for RollcallError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.code(), "request failed");
        }
        let body = ErrorBody {
            success: false,
            error: self.code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

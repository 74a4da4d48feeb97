//! Error types for the session layer.

use rollcall_protocol::{ClassId, ProtocolError, SessionId};

/// Errors that can occur while running or querying an attendance session.
///
/// The verification kinds (`NoActiveSession`, `SessionMismatch`,
/// `TokenMismatch`, `SessionExpired`) are client-facing and non-fatal:
/// the scanning device is expected to re-poll for a fresh payload and
/// resubmit.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session is running.
    #[error("no active session")]
    NoActiveSession,

    /// The scan names a session that is not the active one. Either it
    /// was stopped, it expired, or a newer session superseded it.
    #[error("session {0} is not the active session")]
    SessionMismatch(SessionId),

    /// The scan carries a token from a rotation that has already passed,
    /// or a token that was never issued.
    #[error("token does not match the current rotation")]
    TokenMismatch,

    /// The session's lifetime elapsed before its expiry timer tore it
    /// down. Callers only see this once; afterwards the slot is empty and
    /// they get `NoActiveSession`.
    #[error("session {0} expired")]
    SessionExpired(SessionId),

    /// A start request named a class id that cannot exist.
    #[error("invalid class id {0}")]
    InvalidClass(ClassId),

    /// Session timing configuration is inconsistent.
    #[error("invalid session config: {0}")]
    InvalidConfig(String),

    /// The QR payload could not be rendered.
    #[error(transparent)]
    Render(#[from] ProtocolError),

    /// The caller's credentials were missing or rejected by the
    /// [`Authenticator`](crate::Authenticator).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The caller is authenticated but not allowed to do this.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// The store's task is gone (shut down or panicked).
    #[error("session store is unavailable")]
    Unavailable,
}

impl SessionError {
    /// Stable machine-readable reason code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoActiveSession => "NO_ACTIVE_SESSION",
            Self::SessionMismatch(_) => "SESSION_MISMATCH",
            Self::TokenMismatch => "TOKEN_MISMATCH",
            Self::SessionExpired(_) => "SESSION_EXPIRED",
            Self::InvalidClass(_) => "INVALID_REQUEST",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Render(_) => "RENDER_FAILED",
            Self::AuthFailed(_) => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::Unavailable => "UNAVAILABLE",
        }
    }

    /// Returns `true` for the scan rejections a client recovers from by
    /// re-polling the active session.
    pub fn is_scan_rejection(&self) -> bool {
        matches!(
            self,
            Self::NoActiveSession
                | Self::SessionMismatch(_)
                | Self::TokenMismatch
                | Self::SessionExpired(_)
        )
    }
}

//! Authorization middleware for the teacher-only routes.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use rollcall_session::{Authenticator, SessionError};

use crate::RollcallError;
use crate::server::AppState;

/// Resolves the `Authorization: Bearer` token and admits teachers only.
///
/// On success the caller's [`Identity`](rollcall_session::Identity) is
/// inserted into request extensions for the handler. A missing or
/// rejected token is 401; a non-teacher identity is 403.
pub(crate) async fn require_teacher<A: Authenticator>(
    State(state): State<Arc<AppState<A>>>,
    mut req: Request,
    next: Next,
) -> Result<Response, RollcallError> {
    let bearer = bearer_token(&req);
    let identity = state.auth.authenticate(bearer.as_deref()).await?;

    if !identity.is_teacher() {
        tracing::debug!(subject = %identity.subject, "non-teacher denied");
        return Err(SessionError::Forbidden("teacher role required".into()).into());
    }

    req.extensions_mut().insert(identity);
    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

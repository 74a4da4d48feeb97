//! HTTP handlers for the `/api/qr` routes.
//!
//! Each handler validates its body, makes one call into the session
//! store or verifier, and maps the result onto the wire shapes below.
//! Failures go out through [`RollcallError`]'s `IntoResponse`.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use rollcall_protocol::{ClassId, RotationToken, SessionId, StudentId};
use rollcall_session::{AttendanceConfirmation, Authenticator, Identity, Session};
use serde::{Deserialize, Serialize};

use crate::RollcallError;
use crate::server::AppState;

// ---------------------------------------------------------------------------
// Request bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartRequest {
    pub class_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRequest {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub session_id: String,
    pub token: String,
    pub student_id: String,
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

/// Public view of the active session, as returned by start and active.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub session_id: SessionId,
    pub class_id: ClassId,
    pub current_token: RotationToken,
    /// Image data URL (or payload text) for the current token.
    pub qr_payload: String,
    /// Unix epoch milliseconds.
    pub expires_at: i64,
    pub rotation: u64,
}

impl From<Session> for SessionView {
    fn from(session: Session) -> Self {
        Self {
            session_id: session.session_id,
            class_id: session.class_id,
            current_token: session.current_token,
            qr_payload: session.qr_payload,
            expires_at: session.expires_at_wall.timestamp_millis(),
            rotation: session.rotation,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StopResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyResponse {
    pub success: bool,
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub class_id: ClassId,
    pub timestamp: DateTime<Utc>,
}

impl From<AttendanceConfirmation> for VerifyResponse {
    fn from(c: AttendanceConfirmation) -> Self {
        Self {
            success: true,
            student_id: c.student_id,
            session_id: c.session_id,
            class_id: c.class_id,
            timestamp: c.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `POST /api/qr/start`
pub(crate) async fn start_session<A: Authenticator>(
    State(state): State<Arc<AppState<A>>>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<StartRequest>, JsonRejection>,
) -> Result<Json<SessionView>, RollcallError> {
    let req = json_body(body)?;
    let class_id = ClassId(req.class_id);
    if !class_id.is_valid() {
        return Err(RollcallError::InvalidRequest(
            "classId must be a positive integer".into(),
        ));
    }

    let session = state.store.start(class_id).await?;
    tracing::info!(
        session_id = %session.session_id,
        %class_id,
        teacher = %identity.subject,
        "attendance session started"
    );
    Ok(Json(session.into()))
}

/// `POST /api/qr/stop`. Succeeds whether or not the id was active.
pub(crate) async fn stop_session<A: Authenticator>(
    State(state): State<Arc<AppState<A>>>,
    Extension(identity): Extension<Identity>,
    body: Result<Json<StopRequest>, JsonRejection>,
) -> Result<Json<StopResponse>, RollcallError> {
    let req = json_body(body)?;
    let session_id = SessionId(non_empty("sessionId", req.session_id)?);

    let stopped = state.store.stop(session_id.clone()).await?;
    tracing::debug!(%session_id, stopped, teacher = %identity.subject, "stop requested");
    Ok(Json(StopResponse { success: true }))
}

/// `GET /api/qr/active`. `null` when nothing is live.
pub(crate) async fn active_session<A: Authenticator>(
    State(state): State<Arc<AppState<A>>>,
) -> Result<Json<Option<SessionView>>, RollcallError> {
    let active = state.store.get_active().await?;
    Ok(Json(active.map(SessionView::from)))
}

/// `POST /api/qr/verify`
pub(crate) async fn verify_scan<A: Authenticator>(
    State(state): State<Arc<AppState<A>>>,
    body: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, RollcallError> {
    let req = json_body(body)?;
    let session_id = SessionId(non_empty("sessionId", req.session_id)?);
    let token = RotationToken(non_empty("token", req.token)?);
    let student_id = StudentId(non_empty("studentId", req.student_id)?);

    let confirmation = state
        .verifier
        .verify(session_id, token, student_id)
        .await
        .inspect_err(|e| {
            if !e.is_scan_rejection() {
                tracing::warn!(error = %e, "scan could not be checked");
            }
        })?;
    Ok(Json(confirmation.into()))
}

/// `GET /`
pub(crate) async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub(crate) async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Route not found" })),
    )
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, RollcallError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| RollcallError::InvalidRequest(rejection.body_text()))
}

fn non_empty(field: &str, value: String) -> Result<String, RollcallError> {
    if value.trim().is_empty() {
        return Err(RollcallError::InvalidRequest(format!(
            "{field} must not be empty"
        )));
    }
    Ok(value)
}

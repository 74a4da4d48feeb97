//! Scan verification: does a `(session, token, student)` triple match the
//! live session?
//!
//! The check itself is a pure function ([`check_scan`]) run inside the
//! session store's task, so it always sees the most recently committed
//! token. [`AttendanceVerifier`] is the caller-facing handle.
//!
//! Verification is not idempotent. The same valid scan submitted twice
//! inside one rotation window succeeds twice; "one mark per student per
//! class per day" is enforced by whoever persists the confirmation.

use chrono::{DateTime, Utc};
use rollcall_protocol::{ClassId, RotationToken, SessionId, StudentId};
use tokio::time::Instant;

use crate::{Session, SessionError, SessionStore};

/// One scan submitted by a student device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanAttempt {
    pub session_id: SessionId,
    pub token: RotationToken,
    pub student_id: StudentId,
}

/// Proof that a scan matched the live session.
///
/// Handed to the attendance-persistence collaborator, which turns it into
/// a durable record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceConfirmation {
    pub student_id: StudentId,
    pub session_id: SessionId,
    pub class_id: ClassId,
    pub timestamp: DateTime<Utc>,
}

/// Checks a scan against the session slot as it stands at `now`.
///
/// Rejections, in order: no session, expired session, wrong session id,
/// stale token.
pub fn check_scan(
    active: Option<&Session>,
    scan: &ScanAttempt,
    now: Instant,
) -> Result<AttendanceConfirmation, SessionError> {
    let session = active.ok_or(SessionError::NoActiveSession)?;

    if !session.is_live_at(now) {
        return Err(SessionError::SessionExpired(session.session_id.clone()));
    }
    if session.session_id != scan.session_id {
        return Err(SessionError::SessionMismatch(scan.session_id.clone()));
    }
    if session.current_token != scan.token {
        return Err(SessionError::TokenMismatch);
    }

    Ok(AttendanceConfirmation {
        student_id: scan.student_id.clone(),
        session_id: session.session_id.clone(),
        class_id: session.class_id,
        timestamp: Utc::now(),
    })
}

/// Validates student scans against a [`SessionStore`].
///
/// Cheap to clone; every clone talks to the same store.
#[derive(Clone)]
pub struct AttendanceVerifier {
    store: SessionStore,
}

impl AttendanceVerifier {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    /// Verifies one scan.
    ///
    /// # Errors
    /// - [`SessionError::NoActiveSession`]: nothing is running
    /// - [`SessionError::SessionMismatch`]: scan is for another session
    /// - [`SessionError::TokenMismatch`]: token from a past rotation
    /// - [`SessionError::SessionExpired`]: lifetime just elapsed
    /// - [`SessionError::Unavailable`]: the store is gone
    pub async fn verify(
        &self,
        session_id: SessionId,
        token: RotationToken,
        student_id: StudentId,
    ) -> Result<AttendanceConfirmation, SessionError> {
        self.store
            .submit_scan(ScanAttempt {
                session_id,
                token,
                student_id,
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn session(t0: Instant) -> Session {
        Session {
            session_id: SessionId::from("s-1"),
            class_id: ClassId(7),
            current_token: RotationToken::from("t-1"),
            qr_payload: String::new(),
            rotation: 1,
            created_at: t0,
            expires_at: t0 + Duration::from_secs(30),
            expires_at_wall: Utc::now(),
        }
    }

    fn scan(session_id: &str, token: &str) -> ScanAttempt {
        ScanAttempt {
            session_id: SessionId::from(session_id),
            token: RotationToken::from(token),
            student_id: StudentId::from("S1"),
        }
    }

    #[test]
    fn test_check_scan_matching_pair_succeeds() {
        let t0 = Instant::now();
        let confirmation =
            check_scan(Some(&session(t0)), &scan("s-1", "t-1"), t0).unwrap();
        assert_eq!(confirmation.student_id, StudentId::from("S1"));
        assert_eq!(confirmation.session_id, SessionId::from("s-1"));
        assert_eq!(confirmation.class_id, ClassId(7));
    }

    #[test]
    fn test_check_scan_without_session_fails() {
        let result = check_scan(None, &scan("s-1", "t-1"), Instant::now());
        assert!(matches!(result, Err(SessionError::NoActiveSession)));
    }

    #[test]
    fn test_check_scan_other_session_fails_mismatch() {
        let t0 = Instant::now();
        let result = check_scan(Some(&session(t0)), &scan("s-0", "t-1"), t0);
        assert!(matches!(result, Err(SessionError::SessionMismatch(id)) if id.as_str() == "s-0"));
    }

    #[test]
    fn test_check_scan_stale_token_fails() {
        let t0 = Instant::now();
        let result = check_scan(Some(&session(t0)), &scan("s-1", "t-0"), t0);
        assert!(matches!(result, Err(SessionError::TokenMismatch)));
    }

    #[test]
    fn test_check_scan_session_mismatch_wins_over_token() {
        let t0 = Instant::now();
        let result = check_scan(Some(&session(t0)), &scan("s-9", "t-9"), t0);
        assert!(matches!(result, Err(SessionError::SessionMismatch(_))));
    }

    #[test]
    fn test_check_scan_at_expiry_fails() {
        let t0 = Instant::now();
        let result = check_scan(
            Some(&session(t0)),
            &scan("s-1", "t-1"),
            t0 + Duration::from_secs(30),
        );
        assert!(matches!(result, Err(SessionError::SessionExpired(_))));
    }

    #[test]
    fn test_check_scan_is_not_idempotent() {
        let t0 = Instant::now();
        let s = session(t0);
        assert!(check_scan(Some(&s), &scan("s-1", "t-1"), t0).is_ok());
        assert!(check_scan(Some(&s), &scan("s-1", "t-1"), t0).is_ok());
    }
}

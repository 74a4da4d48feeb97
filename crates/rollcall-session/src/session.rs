//! Session types: the data that describes one attendance window.
//!
//! `expires_at` is fixed at creation; only the token and its rendered
//! payload change while a session is live.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rollcall_protocol::{ClassId, QrPayload, RotationToken, SessionId};
use rollcall_tick::TickPolicy;
use tokio::time::Instant;

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timing configuration for attendance sessions.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Total lifetime of a session. Never extended by rotation.
    ///
    /// Default: 30 seconds.
    pub lifetime: Duration,

    /// Time between token rotations. Must be shorter than `lifetime`
    /// so every token has a bounded validity window.
    ///
    /// Default: 5 seconds.
    pub rotation_period: Duration,

    /// How rotation behaves if the store falls behind schedule.
    pub rotation_policy: TickPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lifetime: Duration::from_secs(30),
            rotation_period: Duration::from_secs(5),
            rotation_policy: TickPolicy::Skip,
        }
    }
}

impl SessionConfig {
    /// Longest lifetime accepted. An attendance window is minutes long;
    /// this bound keeps wall-clock deadlines far from chrono's range limit.
    pub const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

    /// Checks that the lifetime is bounded and the rotation cadence fits
    /// inside it.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidConfig`] if the lifetime exceeds
    /// [`Self::MAX_LIFETIME`], or the rotation period is zero or not
    /// strictly shorter than the lifetime.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.lifetime > Self::MAX_LIFETIME {
            return Err(SessionError::InvalidConfig(format!(
                "lifetime ({:?}) exceeds the maximum of {:?}",
                self.lifetime,
                Self::MAX_LIFETIME
            )));
        }
        if self.rotation_period.is_zero() {
            return Err(SessionError::InvalidConfig(
                "rotation period must be non-zero".into(),
            ));
        }
        if self.rotation_period >= self.lifetime {
            return Err(SessionError::InvalidConfig(format!(
                "rotation period ({:?}) must be shorter than lifetime ({:?})",
                self.rotation_period, self.lifetime
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A snapshot of the active attendance session.
///
/// Callers get clones; the only live copy sits inside the session store's
/// task.
#[derive(Debug, Clone)]
pub struct Session {
    /// Assigned at creation, immutable.
    pub session_id: SessionId,

    /// The class this session takes attendance for, immutable.
    pub class_id: ClassId,

    /// The token a scan must present right now.
    pub current_token: RotationToken,

    /// Rendered image of `{session_id, current_token, class_id}`.
    /// Recomputed whenever the token rotates.
    pub qr_payload: String,

    /// How many rotations have happened (0 while the first token is live).
    pub rotation: u64,

    /// Monotonic creation instant; rotation ticks are anchored here.
    pub created_at: Instant,

    /// Monotonic deadline. The session is live while `now < expires_at`.
    pub expires_at: Instant,

    /// Wall-clock form of `expires_at`, for clients.
    pub expires_at_wall: DateTime<Utc>,
}

impl Session {
    /// Returns `true` while `now` is before the expiry deadline.
    pub fn is_live_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// The payload the QR symbol encodes.
    pub fn payload(&self) -> QrPayload {
        QrPayload {
            session_id: self.session_id.clone(),
            token: self.current_token.clone(),
            class_id: self.class_id,
        }
    }
}

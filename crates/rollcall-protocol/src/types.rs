//! Core protocol types for Rollcall.
//!
//! These are the values that leave the process: they are encoded into QR
//! symbols, returned from the HTTP surface, and echoed back by scanning
//! devices. Everything here is plain data with serde derives.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identifier of one attendance session.
///
/// Newtype over `String` rather than `Uuid`: the server mints UUIDs, but
/// scanning devices echo back whatever they decoded from the QR symbol.
/// A garbled or foreign value must still parse so it can be rejected as
/// a mismatch instead of as malformed input.
///
/// `#[serde(transparent)]` keeps the wire form a plain JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Mints a fresh random (v4) session identifier.
    pub fn new_v4() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// The short-lived verification token embedded in the QR symbol.
///
/// Replaced on every rotation tick. Two tokens are only ever compared for
/// exact equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RotationToken(pub String);

impl RotationToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RotationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RotationToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifier of the class a session covers.
///
/// Assigned by the external class registry. Only positive values name a
/// real class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(pub i64);

impl ClassId {
    /// Returns `true` if this id can name a class (strictly positive).
    pub fn is_valid(&self) -> bool {
        self.0 > 0
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Identifier of the student submitting a scan.
///
/// Issued by the external user registry; opaque to this service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StudentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ---------------------------------------------------------------------------
// QrPayload
// ---------------------------------------------------------------------------

/// The data a QR symbol carries.
///
/// A scanning device decodes this JSON object and submits `session_id`
/// and `token` back together with the student's id. Field names are
/// camelCase on the wire because the browser clients read them directly:
///
/// ```json
/// { "sessionId": "…", "token": "…", "classId": 7 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QrPayload {
    pub session_id: SessionId,
    pub token: RotationToken,
    pub class_id: ClassId,
}

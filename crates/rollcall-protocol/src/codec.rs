//! Codec trait and implementations for serializing payloads.
//!
//! A codec turns a payload into the bytes that end up inside a QR symbol
//! (and back, for tests and for scanning tools). The QR encoder doesn't
//! care how the payload is serialized, only that something implements
//! [`Codec`].

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because a codec lives inside the session
/// store's task for the whole life of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed or
    /// don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses compact JSON (via `serde_json`).
///
/// Scanning clients are browsers, so JSON is what they can parse out of
/// the decoded QR text without extra tooling. Output is deterministic for
/// a given value: field order follows the struct definition.
///
/// ```rust
/// use rollcall_protocol::{ClassId, Codec, JsonCodec, QrPayload, RotationToken, SessionId};
///
/// let payload = QrPayload {
///     session_id: SessionId::from("s-1"),
///     token: RotationToken::from("t-1"),
///     class_id: ClassId(7),
/// };
///
/// let bytes = JsonCodec.encode(&payload).unwrap();
/// let decoded: QrPayload = JsonCodec.decode(&bytes).unwrap();
/// assert_eq!(payload, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

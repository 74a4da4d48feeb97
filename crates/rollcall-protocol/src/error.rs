//! Error types for the protocol layer.

/// Errors that can occur while serializing payloads or rendering them
/// into QR images.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or a
    /// truncated QR read.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The payload could not be laid out as a QR symbol, usually because
    /// it exceeds the capacity of the largest symbol version.
    #[error("qr render failed: {0}")]
    Render(String),
}

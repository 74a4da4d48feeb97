//! Identifier generation for sessions and rotation tokens.

use rand::Rng;
use rollcall_protocol::{RotationToken, SessionId};

/// Produces fresh identifiers for the session store.
///
/// Owned by the store's task, so `&mut self` is fine and no locking is
/// needed. Tests swap in a deterministic source to get predictable tokens.
pub trait TokenSource: Send + 'static {
    /// A new session identifier. Must not repeat.
    fn session_id(&mut self) -> SessionId;

    /// A new rotation token. Must not repeat and must not be guessable.
    fn rotation_token(&mut self) -> RotationToken;
}

/// The production [`TokenSource`]: UUID v4 session ids and 128-bit random
/// hex tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomTokenSource;

impl TokenSource for RandomTokenSource {
    fn session_id(&mut self) -> SessionId {
        SessionId::new_v4()
    }

    fn rotation_token(&mut self) -> RotationToken {
        RotationToken(generate_token())
    }
}

/// Generates a random 32-character hex string (128 bits of entropy).
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

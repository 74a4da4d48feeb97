//! Attendance session management for Rollcall.
//!
//! This crate owns the one piece of live state in the service: the
//! active attendance session.
//!
//! 1. **Identifiers**: minting session ids and rotation tokens
//!    ([`TokenSource`])
//! 2. **Session lifecycle**: start, rotate, stop, expire
//!    ([`SessionStore`])
//! 3. **Scan verification**: matching a scan against the live token
//!    ([`AttendanceVerifier`])
//! 4. **Authentication**: who may start and stop sessions
//!    ([`Authenticator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! HTTP layer (above)   ← turns requests into store/verifier calls
//!     ↕
//! Session layer (this crate)  ← owns the session slot and its timers
//!     ↕
//! Tick + Protocol (below)  ← rotation timer, ids, QR encoding
//! ```

mod auth;
mod error;
mod session;
mod store;
mod token;
mod verifier;

pub use auth::{Authenticator, Identity, OpenAccess, Role, StaticTokenAuthenticator};
pub use error::SessionError;
pub use session::{Session, SessionConfig};
pub use store::SessionStore;
pub use token::{RandomTokenSource, TokenSource};
pub use verifier::{AttendanceConfirmation, AttendanceVerifier, ScanAttempt, check_scan};

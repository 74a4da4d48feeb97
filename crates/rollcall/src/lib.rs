//! # Rollcall
//!
//! Rotating-QR attendance sessions over HTTP.
//!
//! A teacher starts a session for a class; the service issues a QR
//! payload whose token rotates every few seconds and expires after a
//! fixed lifetime. Students scan the code and submit the pair
//! `(sessionId, token)`, which is accepted only while that token is the
//! current one.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rollcall::prelude::*;
//!
//! # async fn run() -> Result<(), RollcallError> {
//! let config = ServerConfig::from_env()?;
//! let server = RollcallServer::builder()
//!     .bind(config.bind_address)
//!     .session_config(config.session)
//!     .build(OpenAccess)
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod config;
mod error;
mod handler;
mod middleware;
mod server;

pub use config::{ConfigError, ServerConfig};
pub use error::RollcallError;
pub use handler::{
    HealthResponse, SessionView, StartRequest, StopRequest, StopResponse, VerifyRequest,
    VerifyResponse,
};
pub use server::{RollcallServer, RollcallServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{
        ConfigError, RollcallError, RollcallServer, RollcallServerBuilder, ServerConfig,
    };
    pub use rollcall_protocol::{ClassId, QrPayload, RotationToken, SessionId, StudentId};
    pub use rollcall_session::{
        Authenticator, Identity, OpenAccess, Role, SessionConfig, SessionError,
        StaticTokenAuthenticator,
    };
    pub use rollcall_tick::TickPolicy;
}

//! Wire-level types for Rollcall.
//!
//! This crate defines what leaves the process:
//!
//! - **Types** ([`SessionId`], [`RotationToken`], [`ClassId`],
//!   [`StudentId`], [`QrPayload`]): the values carried in QR symbols
//!   and HTTP bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how a payload becomes
//!   bytes.
//! - **QR encoders** ([`QrImageEncoder`], [`SvgQrEncoder`]): how those
//!   bytes become a displayable image.
//!
//! ```text
//! QrPayload → Codec (bytes) → QrImageEncoder (data URL) → client
//! ```

mod codec;
mod error;
#[cfg(feature = "json")]
mod qr;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
#[cfg(feature = "json")]
pub use qr::{PlainTextEncoder, QrImageEncoder};
#[cfg(feature = "svg")]
pub use qr::{SVG_DATA_URL_PREFIX, SvgQrEncoder};
pub use types::{ClassId, QrPayload, RotationToken, SessionId, StudentId};

//! QR image encoders: payload in, displayable image string out.
//!
//! An encoder is a pure function of the payload. The same
//! `(session_id, token, class_id)` always produces the same string, which
//! keeps rotation cheap to reason about and the output testable.

use crate::{Codec, ProtocolError, QrPayload};

/// Renders a [`QrPayload`] into something a client can display.
///
/// Called by the session store on start and on every rotation tick, from
/// inside the store's task, so implementations must be `Send + Sync`.
pub trait QrImageEncoder: Send + Sync + 'static {
    /// Renders the payload.
    ///
    /// # Errors
    /// Returns a [`ProtocolError`] if the payload cannot be serialized or
    /// does not fit in a QR symbol.
    fn encode(&self, payload: &QrPayload) -> Result<String, ProtocolError>;
}

// ---------------------------------------------------------------------------
// PlainTextEncoder
// ---------------------------------------------------------------------------

/// Emits the serialized payload text itself, no image.
///
/// For clients that draw the symbol themselves (e.g. a JS QR widget fed
/// from `GET /active`).
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextEncoder<C = crate::JsonCodec> {
    codec: C,
}

impl<C: Codec> PlainTextEncoder<C> {
    pub fn with_codec(codec: C) -> Self {
        Self { codec }
    }
}

impl<C: Codec> QrImageEncoder for PlainTextEncoder<C> {
    fn encode(&self, payload: &QrPayload) -> Result<String, ProtocolError> {
        let bytes = self.codec.encode(payload)?;
        // Codecs used here produce UTF-8; anything else is a bug in the codec.
        String::from_utf8(bytes).map_err(|e| ProtocolError::Render(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// SvgQrEncoder
// ---------------------------------------------------------------------------

#[cfg(feature = "svg")]
mod svg_encoder {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use qrcode::QrCode;
    use qrcode::render::svg;

    use crate::{Codec, JsonCodec, ProtocolError, QrImageEncoder, QrPayload};

    /// Prefix of every URL produced by [`SvgQrEncoder`].
    pub const SVG_DATA_URL_PREFIX: &str = "data:image/svg+xml;base64,";

    /// Renders the payload JSON as an SVG QR symbol wrapped in a base64
    /// `data:` URL, ready for an `<img src=…>`.
    #[derive(Debug, Clone, Copy)]
    pub struct SvgQrEncoder {
        /// Minimum rendered edge length in pixels.
        pub min_size: u32,
    }

    impl Default for SvgQrEncoder {
        fn default() -> Self {
            Self { min_size: 200 }
        }
    }

    impl SvgQrEncoder {
        /// Renders just the SVG document, without the data URL wrapper.
        pub fn render_svg(&self, payload: &QrPayload) -> Result<String, ProtocolError> {
            let data = JsonCodec.encode(payload)?;
            let code = QrCode::new(&data).map_err(|e| ProtocolError::Render(e.to_string()))?;
            Ok(code
                .render::<svg::Color<'_>>()
                .min_dimensions(self.min_size, self.min_size)
                .build())
        }
    }

    impl QrImageEncoder for SvgQrEncoder {
        fn encode(&self, payload: &QrPayload) -> Result<String, ProtocolError> {
            let svg = self.render_svg(payload)?;
            Ok(format!("{SVG_DATA_URL_PREFIX}{}", STANDARD.encode(svg.as_bytes())))
        }
    }
}

#[cfg(feature = "svg")]
pub use svg_encoder::{SVG_DATA_URL_PREFIX, SvgQrEncoder};

//! Decoder error types.

use thiserror::Error;

/// Errors produced while decoding raw controller input.
///
/// Decoders recover every failure into a value of this type; nothing ever
/// panics across the decoder boundary. A failed decode simply skips the
/// cycle — the next frame starts fresh.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    /// The line is not a telemetry frame (wrong marker or token count).
    #[error("malformed frame: {0}")]
    Format(String),

    /// A token did not parse as the expected numeric or hex form.
    #[error("invalid token at position {index}: {token:?}")]
    Conversion { index: usize, token: String },

    /// The analog reading is not a usable number.
    #[error("voltage is not a finite number")]
    Input,
}

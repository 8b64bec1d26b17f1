//! # Error Types
//!
//! Defines the error type produced by every wire decoder in the workspace.

use thiserror::Error;

/// Errors that can occur while decoding a versioned envelope or its payload.
///
/// Every variant is recoverable: the caller abandons the decode attempt and
/// the bytes are treated as malformed input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Buffer ended before a field could be read.
    #[error("insufficient data for {what}: need {needed} bytes, {remaining} remaining")]
    InsufficientData {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// The encoder requires a newer decoder than this one.
    #[error("unsupported {what} encoding: compat version {compat} > supported {supported}")]
    UnsupportedVersion {
        what: &'static str,
        compat: u8,
        supported: u8,
    },

    /// Structurally valid bytes that carry a meaningless value (unknown tag,
    /// impossible length, out-of-range field).
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A length-prefixed string was not valid UTF-8.
    #[error("invalid utf-8 in {what}")]
    InvalidUtf8 { what: &'static str },
}

impl DecodeError {
    /// Shorthand for [`DecodeError::MalformedInput`].
    pub fn malformed(msg: impl Into<String>) -> Self {
        DecodeError::MalformedInput(msg.into())
    }

    /// Returns true for errors caused by an unrecognized or invalid value
    /// rather than by running out of bytes.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(self, DecodeError::MalformedInput(_))
    }
}

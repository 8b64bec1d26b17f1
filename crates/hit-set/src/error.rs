//! Error types for the hit set subsystem
//!
//! Wire failures use [`DecodeError`] from `shared-types`; this module adds the
//! configuration errors.

use thiserror::Error;

pub use shared_types::DecodeError;

/// Errors raised while building or validating a hit set configuration
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Unknown hit set type: {0}")]
    UnknownType(String),

    #[error("Invalid false positive rate: {fpr} (must be in (0, {max}])")]
    InvalidFPR { fpr: f64, max: f64 },

    #[error("Invalid target size: {size} (must be in 1..={max})")]
    InvalidTargetSize { size: u64, max: u64 },

    #[error("Invalid value for {var}: {value:?}")]
    InvalidEnv { var: &'static str, value: String },
}

//! Error types for session setup.
//!
//! The per-tick pipeline never fails; these errors only come out of
//! constructors and configuration loading.

use thiserror::Error;

/// Errors returned while building a listening session.
#[derive(Debug, Error)]
pub enum ChordError {
    /// Transform size must be a power of two and at least 2.
    #[error("invalid transform size {0}: expected a power of two >= 2")]
    InvalidTransformSize(usize),

    /// Sample rate must be finite and positive.
    #[error("invalid sample rate {0} Hz")]
    InvalidSampleRate(f64),

    /// A configuration value was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A snapshot did not have the length the session was built for.
    #[error("expected snapshot of length {expected}, got {got}")]
    SnapshotLength {
        /// The expected number of values.
        expected: usize,
        /// The number of values received.
        got: usize,
    },

    #[error("config file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias so callers can write `Result<T>` instead of `Result<T, ChordError>`.
pub type Result<T> = std::result::Result<T, ChordError>;

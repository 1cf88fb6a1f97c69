//! Error types for fidelity evaluation.

use thiserror::Error;

/// Errors raised by feature extraction, metric computation, and quantization.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A state batch does not have the expected rank, dtype, or column count.
    #[error("invalid state batch: {0}")]
    InvalidShape(String),

    /// Two batches that must agree in shape do not.
    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Latent dimension mismatch on quantizer input.
    #[error("latent dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Two metric groups produced the same key; the flat evaluation map
    /// must never silently overwrite.
    #[error("metric key collision: {key}")]
    MetricKeyCollision { key: String },

    /// Underlying tensor operation failed.
    #[error("tensor operation failed: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// IO error while reading configuration.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

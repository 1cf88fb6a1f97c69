//! Agent Fidelity Core
//!
//! Quantitative evaluation of how well a compressed representation preserves
//! the semantic content of structured agent-state vectors.
//!
//! This crate provides:
//! - Semantic feature extraction from state batches (`features`)
//! - The semantic metrics engine: equivalence scores, classification
//!   metrics, numeric error metrics (`metrics`)
//! - Discrete latent quantization with codebook usage statistics
//!   (`quantizer`)
//! - Latent-space diagnostics (`latent`)
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_fidelity_core::metrics::SemanticMetrics;
//!
//! let engine = SemanticMetrics::new();
//! let evaluation = engine.evaluate(&original, &reconstructed)?;
//! let overall = evaluation["overall"].as_scalar().unwrap();
//! ```

pub mod config;
pub mod error;
pub mod features;
pub mod latent;
pub mod metrics;
pub mod quantizer;

// Re-exports for convenience
pub use config::{FeatureWeights, FidelityConfig, MetricsConfig, QuantizerConfig, TrackingConfig};
pub use error::{CoreError, CoreResult};
pub use metrics::{Evaluation, MetricValue, SemanticMetrics};
pub use quantizer::{Quantization, VectorQuantizer};

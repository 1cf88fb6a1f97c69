//! Agent Fidelity Tracking
//!
//! Longitudinal semantic drift tracking and compression threshold search on
//! top of the `agent-fidelity-core` metrics engine.
//!
//! This crate provides:
//! - `DriftTracker`: repeated evaluation across iterations/compression
//!   levels with synchronous per-iteration snapshot persistence and drift
//!   report synthesis
//! - `CompressionThresholdFinder`: sweeps compression levels and selects the
//!   operating point that still satisfies a fidelity threshold
//!
//! All state is append-only and single-writer; see `DriftTracker` docs.

pub mod drift;
pub mod error;
mod report;
pub mod snapshot;
pub mod threshold;

pub use drift::DriftTracker;
pub use error::{TrackingError, TrackingResult};
pub use snapshot::IterationSnapshot;
pub use threshold::{CompressionEvaluation, CompressionThresholdFinder, ThresholdOutcome};

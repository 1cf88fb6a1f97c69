//! Longitudinal drift tracking across iterations and compression levels.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use candle_core::Tensor;
use tracing::debug;

use agent_fidelity_core::config::TrackingConfig;
use agent_fidelity_core::{Evaluation, MetricValue, SemanticMetrics};

use crate::error::TrackingResult;
use crate::report;
use crate::snapshot::IterationSnapshot;

/// Tracks semantic drift over repeated evaluations.
///
/// The per-key history and the compression-level history are append-only and
/// aligned by logging order. Re-logging an iteration index appends duplicate
/// entries rather than overwriting; callers must not double-log. A tracker
/// has a single logical writer; wrap it externally if evaluations are
/// parallelized.
pub struct DriftTracker {
    log_dir: PathBuf,
    engine: SemanticMetrics,
    history: BTreeMap<String, Vec<f64>>,
    compression_levels: Vec<f64>,
}

impl DriftTracker {
    /// Create a tracker with the default metrics engine.
    ///
    /// The log directory is created if it does not exist.
    pub fn new(config: &TrackingConfig) -> TrackingResult<Self> {
        Self::with_engine(&config.log_dir, SemanticMetrics::new())
    }

    /// Create a tracker around an explicitly configured engine.
    pub fn with_engine(log_dir: impl Into<PathBuf>, engine: SemanticMetrics) -> TrackingResult<Self> {
        let log_dir = log_dir.into();
        fs::create_dir_all(&log_dir)?;
        Ok(Self {
            log_dir,
            engine,
            history: BTreeMap::new(),
            compression_levels: Vec::new(),
        })
    }

    /// Evaluate one iteration and append it to the history.
    ///
    /// Runs the full metrics engine, attaches `iteration` and
    /// `compression_level` as scalar metadata, appends every scalar to the
    /// per-key history (matrices stay in the returned evaluation only), and
    /// synchronously persists a scalars-only snapshot.
    pub fn log_iteration(
        &mut self,
        iteration: u64,
        compression_level: f64,
        original: &Tensor,
        reconstructed: &Tensor,
    ) -> TrackingResult<Evaluation> {
        let mut evaluation = self.engine.evaluate(original, reconstructed)?;
        evaluation.insert("iteration".to_string(), MetricValue::Scalar(iteration as f64));
        evaluation.insert(
            "compression_level".to_string(),
            MetricValue::Scalar(compression_level),
        );

        for (key, value) in &evaluation {
            if let MetricValue::Scalar(v) = value {
                self.history.entry(key.clone()).or_default().push(*v);
            }
        }
        self.compression_levels.push(compression_level);

        let snapshot = IterationSnapshot::from_evaluation(iteration, compression_level, &evaluation);
        snapshot.persist(&self.log_dir)?;
        debug!(
            iteration,
            compression_level,
            tracked_keys = self.history.len(),
            "logged drift iteration"
        );

        Ok(evaluation)
    }

    /// Scalar history per metric key, in logging order.
    pub fn history(&self) -> &BTreeMap<String, Vec<f64>> {
        &self.history
    }

    /// Compression level of every logged iteration, in logging order.
    pub fn compression_levels(&self) -> &[f64] {
        &self.compression_levels
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    /// Synthesize the drift analysis report.
    ///
    /// Returns the sentinel `"No drift history to report."` when nothing has
    /// been logged. With `output_path`, the report text is also written to
    /// that file.
    pub fn generate_report(&self, output_path: Option<&Path>) -> TrackingResult<String> {
        if self.history.is_empty() {
            return Ok(report::NO_HISTORY.to_string());
        }

        let text = report::render(&self.history, &self.compression_levels);
        if let Some(path) = output_path {
            fs::write(path, &text)?;
            debug!(path = %path.display(), "wrote drift report");
        }
        Ok(text)
    }
}

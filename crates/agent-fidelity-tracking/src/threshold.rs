//! Compression threshold search.

use candle_core::Tensor;
use serde::Serialize;
use tracing::debug;

use agent_fidelity_core::config::TrackingConfig;
use agent_fidelity_core::{Evaluation, SemanticMetrics};

use crate::error::TrackingResult;

/// One evaluated compression level.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionEvaluation {
    pub compression_level: f64,
    pub overall_score: f64,
    pub meets_threshold: bool,
    pub metrics: Evaluation,
}

impl CompressionEvaluation {
    /// Build a record from a computed evaluation.
    ///
    /// The overall score is read from the `"overall"` key; a map without it
    /// scores 0.0 and therefore never meets the threshold.
    pub fn from_metrics(compression_level: f64, metrics: Evaluation, threshold: f64) -> Self {
        let overall_score = metrics
            .get("overall")
            .and_then(|v| v.as_scalar())
            .unwrap_or(0.0);
        Self {
            compression_level,
            overall_score,
            meets_threshold: overall_score >= threshold,
            metrics,
        }
    }
}

/// Outcome of the optimal-threshold search.
///
/// Early sweeps legitimately have no data, so empty and all-failing states
/// are structured variants rather than errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ThresholdOutcome {
    /// No compression levels evaluated yet.
    NoEvaluations,
    /// Every evaluated level fell below the threshold.
    NoneAcceptable { threshold: f64, recommendation: String },
    /// At least one level passed.
    Found {
        /// Largest passing compression-level value. NOTE: the scalar is
        /// bits-per-dimension, where smaller usually means more compressed;
        /// this search keeps the maximum-value convention of the system it
        /// reproduces. The drift report's minimum-acceptable-level figure is
        /// the complementary view.
        optimal_level: f64,
        optimal_score: f64,
        /// Smallest evaluated level strictly above the optimal one, with its
        /// score, for interpolation between the two.
        next_level: Option<f64>,
        next_level_score: Option<f64>,
        threshold_used: f64,
        /// Every evaluated level, sorted ascending, duplicates preserved.
        evaluated_levels: Vec<f64>,
    },
}

/// Sweeps compression levels and finds the most aggressive one that still
/// satisfies the semantic threshold.
pub struct CompressionThresholdFinder {
    semantic_threshold: f64,
    engine: SemanticMetrics,
    evaluations: Vec<CompressionEvaluation>,
}

impl CompressionThresholdFinder {
    /// Finder with the configured threshold and the default engine.
    pub fn new(config: &TrackingConfig) -> Self {
        Self::with_engine(config.semantic_threshold, SemanticMetrics::new())
    }

    /// Finder around an explicitly configured engine.
    pub fn with_engine(semantic_threshold: f64, engine: SemanticMetrics) -> Self {
        Self {
            semantic_threshold,
            engine,
            evaluations: Vec::new(),
        }
    }

    pub fn semantic_threshold(&self) -> f64 {
        self.semantic_threshold
    }

    /// Records accumulated so far, in evaluation order.
    pub fn evaluations(&self) -> &[CompressionEvaluation] {
        &self.evaluations
    }

    /// Evaluate one compression level and record the result.
    ///
    /// Repeat evaluations of the same level accumulate as separate records.
    pub fn evaluate_compression_level(
        &mut self,
        compression_level: f64,
        original: &Tensor,
        reconstructed: &Tensor,
    ) -> TrackingResult<CompressionEvaluation> {
        let metrics = self.engine.evaluate(original, reconstructed)?;
        let record =
            CompressionEvaluation::from_metrics(compression_level, metrics, self.semantic_threshold);
        debug!(
            compression_level,
            overall_score = record.overall_score,
            meets_threshold = record.meets_threshold,
            "evaluated compression level"
        );
        self.evaluations.push(record.clone());
        Ok(record)
    }

    /// Record an externally computed evaluation.
    pub fn record(&mut self, record: CompressionEvaluation) {
        self.evaluations.push(record);
    }

    /// Determine the optimal compression level from the recorded sweep.
    pub fn find_optimal_threshold(&self) -> ThresholdOutcome {
        if self.evaluations.is_empty() {
            return ThresholdOutcome::NoEvaluations;
        }

        let mut optimal: Option<&CompressionEvaluation> = None;
        for record in self.evaluations.iter().filter(|r| r.meets_threshold) {
            let replace = match optimal {
                Some(best) => record.compression_level > best.compression_level,
                None => true,
            };
            if replace {
                optimal = Some(record);
            }
        }

        let Some(optimal) = optimal else {
            return ThresholdOutcome::NoneAcceptable {
                threshold: self.semantic_threshold,
                recommendation: "try lower compression or adjust the threshold".to_string(),
            };
        };

        let next = self
            .evaluations
            .iter()
            .filter(|r| r.compression_level > optimal.compression_level)
            .min_by(|a, b| a.compression_level.total_cmp(&b.compression_level));

        let mut evaluated_levels: Vec<f64> =
            self.evaluations.iter().map(|r| r.compression_level).collect();
        evaluated_levels.sort_by(f64::total_cmp);

        ThresholdOutcome::Found {
            optimal_level: optimal.compression_level,
            optimal_score: optimal.overall_score,
            next_level: next.map(|r| r.compression_level),
            next_level_score: next.map(|r| r.overall_score),
            threshold_used: self.semantic_threshold,
            evaluated_levels,
        }
    }
}

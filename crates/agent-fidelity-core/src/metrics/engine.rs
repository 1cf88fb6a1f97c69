//! The semantic metrics engine.

use std::collections::BTreeMap;

use candle_core::Tensor;

use crate::config::{FeatureConfig, MetricsConfig};
use crate::error::{CoreError, CoreResult};
use crate::features::{
    AgentStateExtractor, FeatureMap, SemanticFeatureExtractor, BINARY_THRESHOLD, ROLE_COUNT,
};
use crate::metrics::classification::{categorical_metrics, decode_roles, BinaryCounts, ROLE_COLUMNS};
use crate::metrics::regression::numeric_errors;
use crate::metrics::similarity::equivalence_scores;
use crate::metrics::{Evaluation, MetricValue};

/// Binary status flags evaluated as classifications.
const BINARY_FEATURES: [&str; 3] = ["has_target", "is_alive", "threatened"];

/// Continuous features evaluated with error metrics.
const NUMERIC_FEATURES: [&str; 3] = ["position", "health", "energy"];

/// Computes semantic equivalence metrics between an original and a
/// reconstructed state batch.
///
/// All operations are pure functions of the two input batches; the engine
/// itself only carries the extractor and its configuration.
pub struct SemanticMetrics {
    extractor: Box<dyn SemanticFeatureExtractor + Send + Sync>,
    config: MetricsConfig,
}

impl SemanticMetrics {
    /// Engine over the default feature set and configuration.
    pub fn new() -> Self {
        Self::from_config(&FeatureConfig::default(), MetricsConfig::default())
    }

    /// Engine over the standard extractor with explicit configuration.
    pub fn from_config(features: &FeatureConfig, config: MetricsConfig) -> Self {
        Self {
            extractor: Box::new(AgentStateExtractor::new(features.extractors.clone())),
            config,
        }
    }

    /// Engine over a custom feature-extractor collaborator.
    pub fn with_extractor(
        extractor: Box<dyn SemanticFeatureExtractor + Send + Sync>,
        config: MetricsConfig,
    ) -> Self {
        Self { extractor, config }
    }

    /// Extract semantic features from one batch.
    pub fn extract_features(&self, batch: &Tensor) -> CoreResult<FeatureMap> {
        self.extractor.extract_semantic_features(batch)
    }

    /// Per-feature similarity scores plus the weighted `"overall"` score.
    ///
    /// Each feature's loss from the extractor breakdown is mapped through
    /// `1 / (1 + sqrt(loss))` and aggregated with the configured importance
    /// weights.
    pub fn compute_equivalence_scores(
        &self,
        original: &Tensor,
        reconstructed: &Tensor,
    ) -> CoreResult<BTreeMap<String, f64>> {
        let breakdown = self.extractor.detailed_breakdown(reconstructed, original)?;
        Ok(equivalence_scores(&breakdown, &self.config.weights))
    }

    /// Accuracy, precision, recall, F1, and a 2x2 confusion matrix for each
    /// binary status flag present in the feature map.
    pub fn binary_feature_accuracy(
        &self,
        original: &Tensor,
        reconstructed: &Tensor,
    ) -> CoreResult<Evaluation> {
        ensure_same_shape(original, reconstructed)?;
        let original_features = self.extract_features(original)?;
        let reconstructed_features = self.extract_features(reconstructed)?;

        let mut metrics = Evaluation::new();
        for feature in BINARY_FEATURES {
            let (Some(orig), Some(recon)) = (
                original_features.get(feature),
                reconstructed_features.get(feature),
            ) else {
                continue;
            };

            let orig_labels = binarize(orig)?;
            let recon_labels = binarize(recon)?;
            let counts = BinaryCounts::from_labels(&orig_labels, &recon_labels);
            let fallback = self.config.undefined_metric_default;

            metrics.insert(format!("{feature}_accuracy"), counts.accuracy().into());
            metrics.insert(format!("{feature}_precision"), counts.precision(fallback).into());
            metrics.insert(format!("{feature}_recall"), counts.recall(fallback).into());
            metrics.insert(format!("{feature}_f1"), counts.f1(fallback).into());
            metrics.insert(
                format!("{feature}_confusion_matrix"),
                MetricValue::Matrix(counts.matrix()),
            );
        }
        Ok(metrics)
    }

    /// Role classification accuracy and confusion matrix.
    ///
    /// Roles are decoded by arg-max over the fixed one-hot block (columns
    /// 5..10); the confusion matrix is always 5x5 over the full role set.
    pub fn role_accuracy(&self, original: &Tensor, reconstructed: &Tensor) -> CoreResult<Evaluation> {
        ensure_same_shape(original, reconstructed)?;
        let cols = original.dims()[1];
        if cols < ROLE_COLUMNS.end {
            return Err(CoreError::InvalidShape(format!(
                "state batch has {} columns, role block needs {}",
                cols, ROLE_COLUMNS.end
            )));
        }

        let orig_rows = original.to_vec2::<f32>()?;
        let recon_rows = reconstructed.to_vec2::<f32>()?;
        let orig_roles = decode_roles(&orig_rows, ROLE_COLUMNS);
        let recon_roles = decode_roles(&recon_rows, ROLE_COLUMNS);
        let (accuracy, matrix) = categorical_metrics(&orig_roles, &recon_roles, ROLE_COUNT);

        let mut metrics = Evaluation::new();
        metrics.insert("role_accuracy".to_string(), accuracy.into());
        metrics.insert("role_confusion_matrix".to_string(), MetricValue::Matrix(matrix));
        Ok(metrics)
    }

    /// MAE, RMSE, and MAPE for each continuous feature present.
    pub fn numeric_feature_errors(
        &self,
        original: &Tensor,
        reconstructed: &Tensor,
    ) -> CoreResult<Evaluation> {
        ensure_same_shape(original, reconstructed)?;
        let original_features = self.extract_features(original)?;
        let reconstructed_features = self.extract_features(reconstructed)?;

        let mut metrics = Evaluation::new();
        for feature in NUMERIC_FEATURES {
            let (Some(orig), Some(recon)) = (
                original_features.get(feature),
                reconstructed_features.get(feature),
            ) else {
                continue;
            };

            let orig_vals = flatten(orig)?;
            let recon_vals = flatten(recon)?;
            let errors = numeric_errors(&orig_vals, &recon_vals, self.config.mape_epsilon);

            metrics.insert(format!("{feature}_mae"), errors.mae.into());
            metrics.insert(format!("{feature}_rmse"), errors.rmse.into());
            metrics.insert(format!("{feature}_mape"), errors.mape.into());
        }
        Ok(metrics)
    }

    /// Union of all metric groups as one flat map.
    ///
    /// A key produced by two groups is a programming error and surfaces as
    /// [`CoreError::MetricKeyCollision`] rather than a silent overwrite.
    pub fn evaluate(&self, original: &Tensor, reconstructed: &Tensor) -> CoreResult<Evaluation> {
        let mut evaluation = Evaluation::new();

        let scores = self.compute_equivalence_scores(original, reconstructed)?;
        merge_into(
            &mut evaluation,
            scores.into_iter().map(|(k, v)| (k, MetricValue::Scalar(v))).collect(),
        )?;
        merge_into(&mut evaluation, self.binary_feature_accuracy(original, reconstructed)?)?;
        merge_into(&mut evaluation, self.role_accuracy(original, reconstructed)?)?;
        merge_into(&mut evaluation, self.numeric_feature_errors(original, reconstructed)?)?;

        Ok(evaluation)
    }
}

impl Default for SemanticMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Similarity scores between two batches using the default engine.
///
/// Convenience wrapper for callers that do not hold a configured engine.
pub fn semantic_similarity(
    original: &Tensor,
    reconstructed: &Tensor,
) -> CoreResult<BTreeMap<String, f64>> {
    SemanticMetrics::new().compute_equivalence_scores(original, reconstructed)
}

fn ensure_same_shape(original: &Tensor, reconstructed: &Tensor) -> CoreResult<()> {
    if original.dims() != reconstructed.dims() {
        return Err(CoreError::ShapeMismatch {
            expected: original.dims().to_vec(),
            actual: reconstructed.dims().to_vec(),
        });
    }
    Ok(())
}

/// Threshold a feature tensor into boolean labels.
fn binarize(feature: &Tensor) -> CoreResult<Vec<bool>> {
    Ok(flatten(feature)?.into_iter().map(|v| v > BINARY_THRESHOLD).collect())
}

fn flatten(feature: &Tensor) -> CoreResult<Vec<f32>> {
    Ok(feature.to_vec2::<f32>()?.into_iter().flatten().collect())
}

fn merge_into(evaluation: &mut Evaluation, group: Evaluation) -> CoreResult<()> {
    for (key, value) in group {
        if evaluation.contains_key(&key) {
            return Err(CoreError::MetricKeyCollision { key });
        }
        evaluation.insert(key, value);
    }
    Ok(())
}

//! Standard feature extractor over the canonical agent-state layout.

use candle_core::{DType, Tensor};

use crate::error::{CoreError, CoreResult};
use crate::features::{FeatureMap, LossBreakdown, SemanticFeatureExtractor, StateLayout};

/// Extracts semantic sub-fields from agent-state batches by column slicing.
///
/// Features requested at construction that the layout does not know are
/// silently skipped, so the extractor list can be shared with richer
/// collaborators.
#[derive(Debug, Clone)]
pub struct AgentStateExtractor {
    layout: StateLayout,
    features: Vec<String>,
}

impl AgentStateExtractor {
    /// Create an extractor for the given feature list over the default layout.
    pub fn new(features: Vec<String>) -> Self {
        Self::with_layout(features, StateLayout::default())
    }

    /// Create an extractor over an explicit column layout.
    pub fn with_layout(features: Vec<String>, layout: StateLayout) -> Self {
        Self { layout, features }
    }

    pub fn layout(&self) -> &StateLayout {
        &self.layout
    }

    /// Validate rank, dtype, and column count of one batch.
    fn check_batch(&self, batch: &Tensor) -> CoreResult<(usize, usize)> {
        if batch.dtype() != DType::F32 {
            return Err(CoreError::InvalidShape(format!(
                "expected f32 state batch, got {:?}",
                batch.dtype()
            )));
        }
        let dims = batch.dims();
        if dims.len() != 2 {
            return Err(CoreError::InvalidShape(format!(
                "expected rank-2 state batch, got rank {}",
                dims.len()
            )));
        }
        let (rows, cols) = (dims[0], dims[1]);
        if rows == 0 {
            return Err(CoreError::InvalidShape(
                "state batch must contain at least one row".into(),
            ));
        }
        let required = self.layout.min_columns();
        if cols < required {
            return Err(CoreError::InvalidShape(format!(
                "state batch has {} columns, layout requires at least {}",
                cols, required
            )));
        }
        Ok((rows, cols))
    }

    /// Validate that two batches agree in shape.
    fn check_pair(&self, original: &Tensor, reconstructed: &Tensor) -> CoreResult<()> {
        self.check_batch(original)?;
        self.check_batch(reconstructed)?;
        if original.dims() != reconstructed.dims() {
            return Err(CoreError::ShapeMismatch {
                expected: original.dims().to_vec(),
                actual: reconstructed.dims().to_vec(),
            });
        }
        Ok(())
    }
}

impl SemanticFeatureExtractor for AgentStateExtractor {
    fn feature_names(&self) -> &[String] {
        &self.features
    }

    fn extract_semantic_features(&self, batch: &Tensor) -> CoreResult<FeatureMap> {
        self.check_batch(batch)?;

        let mut map = FeatureMap::new();
        for feature in &self.features {
            if let Some(range) = self.layout.columns(feature) {
                let sub = batch.narrow(1, range.start, range.end - range.start)?;
                map.insert(feature.clone(), sub);
            }
        }
        Ok(map)
    }

    fn detailed_breakdown(
        &self,
        reconstructed: &Tensor,
        original: &Tensor,
    ) -> CoreResult<LossBreakdown> {
        self.check_pair(original, reconstructed)?;

        let orig = original.to_vec2::<f32>()?;
        let recon = reconstructed.to_vec2::<f32>()?;

        let mut breakdown = LossBreakdown::new();
        for feature in &self.features {
            let Some(range) = self.layout.columns(feature) else {
                continue;
            };
            let mut sum_sq = 0.0f64;
            let mut count = 0usize;
            for (o_row, r_row) in orig.iter().zip(recon.iter()) {
                for col in range.clone() {
                    let diff = (o_row[col] - r_row[col]) as f64;
                    sum_sq += diff * diff;
                    count += 1;
                }
            }
            breakdown.insert(feature.clone(), (sum_sq / count as f64) as f32);
        }
        Ok(breakdown)
    }
}

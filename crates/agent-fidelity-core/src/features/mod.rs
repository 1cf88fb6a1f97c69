//! Semantic feature extraction from agent-state batches.
//!
//! A state batch is a rank-2 `f32` tensor: rows are agents, columns follow a
//! fixed semantic layout. `SemanticFeatureExtractor` is the seam between the
//! metrics engine and whatever produces the feature decomposition;
//! `AgentStateExtractor` is the standard implementation over [`StateLayout`].

mod extractor;

pub use extractor::AgentStateExtractor;

use std::collections::BTreeMap;
use std::ops::Range;

use candle_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::CoreResult;

/// Named sub-tensors extracted from one batch. Built fresh per call.
pub type FeatureMap = BTreeMap<String, Tensor>;

/// Per-feature non-negative reconstruction losses.
pub type LossBreakdown = BTreeMap<String, f32>;

/// Number of agent roles encoded in the one-hot role block.
pub const ROLE_COUNT: usize = 5;

/// Classification threshold for binary feature columns.
pub const BINARY_THRESHOLD: f32 = 0.5;

/// Column layout of an agent-state vector.
///
/// The defaults match the canonical encoding: position (x, y) in columns
/// 0..2, scalar health/has_target/energy, the role one-hot block in columns
/// 5..10, then is_alive and threatened flags.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StateLayout {
    pub position: Range<usize>,
    pub health: usize,
    pub has_target: usize,
    pub energy: usize,
    pub role: Range<usize>,
    pub is_alive: usize,
    pub threatened: usize,
}

impl Default for StateLayout {
    fn default() -> Self {
        Self {
            position: 0..2,
            health: 2,
            has_target: 3,
            energy: 4,
            role: 5..5 + ROLE_COUNT,
            is_alive: 10,
            threatened: 11,
        }
    }
}

impl StateLayout {
    /// Column range occupied by a named feature, if the layout knows it.
    pub fn columns(&self, feature: &str) -> Option<Range<usize>> {
        match feature {
            "position" => Some(self.position.clone()),
            "health" => Some(self.health..self.health + 1),
            "has_target" => Some(self.has_target..self.has_target + 1),
            "energy" => Some(self.energy..self.energy + 1),
            "role" => Some(self.role.clone()),
            "is_alive" => Some(self.is_alive..self.is_alive + 1),
            "threatened" => Some(self.threatened..self.threatened + 1),
            _ => None,
        }
    }

    /// Minimum number of columns a batch must carry for this layout.
    pub fn min_columns(&self) -> usize {
        [
            self.position.end,
            self.health + 1,
            self.has_target + 1,
            self.energy + 1,
            self.role.end,
            self.is_alive + 1,
            self.threatened + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Maps a raw state batch to named semantic sub-fields and produces the
/// per-feature loss decomposition the equivalence scores are built from.
pub trait SemanticFeatureExtractor {
    /// Features this extractor is configured to produce.
    fn feature_names(&self) -> &[String];

    /// Extract the configured features from one batch.
    fn extract_semantic_features(&self, batch: &Tensor) -> CoreResult<FeatureMap>;

    /// Non-negative per-feature reconstruction losses between two batches.
    fn detailed_breakdown(
        &self,
        reconstructed: &Tensor,
        original: &Tensor,
    ) -> CoreResult<LossBreakdown>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_columns() {
        let layout = StateLayout::default();
        assert_eq!(layout.columns("position"), Some(0..2));
        assert_eq!(layout.columns("role"), Some(5..10));
        assert_eq!(layout.columns("threatened"), Some(11..12));
        assert_eq!(layout.columns("unknown"), None);
    }

    #[test]
    fn test_default_layout_min_columns() {
        assert_eq!(StateLayout::default().min_columns(), 12);
    }
}

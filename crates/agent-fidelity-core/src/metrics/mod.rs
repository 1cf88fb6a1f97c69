//! Semantic equivalence metrics between original and reconstructed batches.
//!
//! The engine produces a single flat [`Evaluation`] map per call: similarity
//! scores, binary classification metrics, role classification metrics, and
//! numeric error metrics, with confusion matrices carried alongside scalars
//! as [`MetricValue`] variants.

mod classification;
mod engine;
mod regression;
mod similarity;
mod state_drift;

pub use engine::{semantic_similarity, SemanticMetrics};
pub use state_drift::{feature_drift, AgentStateSummary};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One metric: either a scalar or a confusion matrix.
///
/// Untagged serialization keeps persisted snapshots plain JSON objects of
/// numbers and nested arrays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Scalar(f64),
    Matrix(Vec<Vec<u64>>),
}

impl MetricValue {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&[Vec<u64>]> {
        match self {
            Self::Scalar(_) => None,
            Self::Matrix(m) => Some(m),
        }
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

/// Flat, collision-checked union of all metric groups for one evaluation.
pub type Evaluation = BTreeMap<String, MetricValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_value_accessors() {
        let s = MetricValue::Scalar(0.5);
        assert_eq!(s.as_scalar(), Some(0.5));
        assert!(s.as_matrix().is_none());

        let m = MetricValue::Matrix(vec![vec![3, 0], vec![0, 2]]);
        assert!(m.as_scalar().is_none());
        assert_eq!(m.as_matrix().unwrap()[0][0], 3);
    }

    #[test]
    fn test_metric_value_serializes_untagged() {
        let s = serde_json::to_string(&MetricValue::Scalar(1.0)).unwrap();
        assert_eq!(s, "1.0");

        let m = serde_json::to_string(&MetricValue::Matrix(vec![vec![1, 2], vec![3, 4]])).unwrap();
        assert_eq!(m, "[[1,2],[3,4]]");
    }
}

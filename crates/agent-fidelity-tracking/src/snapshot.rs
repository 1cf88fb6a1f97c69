//! Per-iteration snapshot persistence.
//!
//! One JSON file per logged iteration, named by zero-padded iteration index.
//! Confusion matrices are stripped before writing; the scalar metrics stay a
//! flat key/value object so snapshots diff cleanly across runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use agent_fidelity_core::{Evaluation, MetricValue};

use crate::error::{TrackingError, TrackingResult};

/// The scalar portion of one iteration's evaluation, plus metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSnapshot {
    pub iteration: u64,
    pub compression_level: f64,
    pub recorded_at: DateTime<Utc>,
    pub metrics: BTreeMap<String, f64>,
}

impl IterationSnapshot {
    /// Build a snapshot from a full evaluation, keeping scalars only.
    pub fn from_evaluation(iteration: u64, compression_level: f64, evaluation: &Evaluation) -> Self {
        let metrics = evaluation
            .iter()
            .filter_map(|(key, value)| match value {
                MetricValue::Scalar(v) => Some((key.clone(), *v)),
                MetricValue::Matrix(_) => None,
            })
            .collect();

        Self {
            iteration,
            compression_level,
            recorded_at: Utc::now(),
            metrics,
        }
    }

    /// File name for this snapshot: `iteration_000042.json`.
    pub fn file_name(&self) -> String {
        format!("iteration_{:06}.json", self.iteration)
    }

    /// Write the snapshot under `log_dir`, returning the written path.
    pub fn persist(&self, log_dir: &Path) -> TrackingResult<PathBuf> {
        let path = log_dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json).map_err(|source| TrackingError::SnapshotIo {
            path: path.clone(),
            source,
        })?;
        debug!(iteration = self.iteration, path = %path.display(), "persisted drift snapshot");
        Ok(path)
    }

    /// Read a snapshot back from disk.
    pub fn load(path: &Path) -> TrackingResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn evaluation() -> Evaluation {
        let mut evaluation = Evaluation::new();
        evaluation.insert("overall".into(), MetricValue::Scalar(0.95));
        evaluation.insert("position".into(), MetricValue::Scalar(0.97));
        evaluation.insert(
            "is_alive_confusion_matrix".into(),
            MetricValue::Matrix(vec![vec![2, 0], vec![0, 2]]),
        );
        evaluation
    }

    #[test]
    fn test_snapshot_strips_matrices() {
        let snapshot = IterationSnapshot::from_evaluation(3, 2.0, &evaluation());
        assert_eq!(snapshot.metrics.len(), 2);
        assert!(!snapshot.metrics.contains_key("is_alive_confusion_matrix"));
        assert_eq!(snapshot.metrics["overall"], 0.95);
    }

    #[test]
    fn test_file_name_zero_padding() {
        let snapshot = IterationSnapshot::from_evaluation(42, 1.0, &Evaluation::new());
        assert_eq!(snapshot.file_name(), "iteration_000042.json");
    }

    #[test]
    fn test_persist_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = IterationSnapshot::from_evaluation(7, 4.0, &evaluation());

        let path = snapshot.persist(dir.path()).unwrap();
        assert!(path.ends_with("iteration_000007.json"));

        let restored = IterationSnapshot::load(&path).unwrap();
        assert_eq!(restored.iteration, 7);
        assert_eq!(restored.compression_level, 4.0);
        assert_eq!(restored.metrics, snapshot.metrics);
    }
}

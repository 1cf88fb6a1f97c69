//! Per-agent drift between symbolic state summaries.
//!
//! Operates on decoded agent states rather than tensor batches; useful when
//! a caller wants drift attribution for a single agent without building a
//! one-row batch. Lower values mean better preservation.

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A decoded agent state. Optional fields are compared only when present on
/// both sides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentStateSummary {
    pub position: [f32; 2],
    pub health: f32,
    pub energy: f32,
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_alive: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_target: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threatened: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inventory: Option<BTreeSet<String>>,
}

/// Per-feature drift between an original and a reconstructed agent state.
///
/// Position uses Euclidean distance; health and energy use absolute
/// difference; role and the binary flags are 0.0 on match and 1.0 on
/// mismatch; goal and inventory sets use Jaccard distance.
pub fn feature_drift(
    original: &AgentStateSummary,
    reconstructed: &AgentStateSummary,
) -> BTreeMap<String, f64> {
    let mut drift = BTreeMap::new();

    let dx = (original.position[0] - reconstructed.position[0]) as f64;
    let dy = (original.position[1] - reconstructed.position[1]) as f64;
    drift.insert("position".to_string(), (dx * dx + dy * dy).sqrt());

    drift.insert(
        "health".to_string(),
        (original.health - reconstructed.health).abs() as f64,
    );
    drift.insert(
        "energy".to_string(),
        (original.energy - reconstructed.energy).abs() as f64,
    );
    drift.insert(
        "role".to_string(),
        if original.role == reconstructed.role { 0.0 } else { 1.0 },
    );

    if let (Some(o), Some(r)) = (original.is_alive, reconstructed.is_alive) {
        drift.insert("is_alive".to_string(), if o == r { 0.0 } else { 1.0 });
    }
    if let (Some(o), Some(r)) = (original.has_target, reconstructed.has_target) {
        drift.insert("has_target".to_string(), if o == r { 0.0 } else { 1.0 });
    }
    if let (Some(o), Some(r)) = (original.threatened, reconstructed.threatened) {
        drift.insert("threatened".to_string(), if o == r { 0.0 } else { 1.0 });
    }

    if let (Some(o), Some(r)) = (&original.goals, &reconstructed.goals) {
        drift.insert("goals".to_string(), jaccard_distance(o, r));
    }
    if let (Some(o), Some(r)) = (&original.inventory, &reconstructed.inventory) {
        drift.insert("inventory".to_string(), jaccard_distance(o, r));
    }

    drift
}

/// `1 - |A ∩ B| / |A ∪ B|`; two empty sets count as identical.
fn jaccard_distance(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    1.0 - intersection / union
}

//! Loss-to-similarity transform and weighted aggregation.

use std::collections::BTreeMap;

use crate::config::FeatureWeights;
use crate::features::LossBreakdown;

/// Map a non-negative reconstruction loss to a similarity in (0, 1].
///
/// `1 / (1 + sqrt(loss))`: loss 0 gives similarity 1, strictly decreasing in
/// loss, with a gentler decay than `exp(-loss)` so moderate losses are not
/// over-penalized.
pub(crate) fn similarity_from_loss(loss: f32) -> f64 {
    1.0 / (1.0 + (loss.max(0.0) as f64).sqrt())
}

/// Per-feature similarities plus the weighted `"overall"` score.
///
/// The overall score is a convex combination of the per-feature similarities,
/// normalized by the sum of weights actually present in the breakdown.
pub(crate) fn equivalence_scores(
    breakdown: &LossBreakdown,
    weights: &FeatureWeights,
) -> BTreeMap<String, f64> {
    let mut scores: BTreeMap<String, f64> = breakdown
        .iter()
        .map(|(feature, &loss)| (feature.clone(), similarity_from_loss(loss)))
        .collect();

    let total_weight: f64 = scores.keys().map(|f| weights.weight(f)).sum();
    if total_weight > 0.0 {
        let weighted: f64 = scores
            .iter()
            .map(|(f, &s)| s * weights.weight(f))
            .sum();
        scores.insert("overall".to_string(), weighted / total_weight);
    }
    scores
}

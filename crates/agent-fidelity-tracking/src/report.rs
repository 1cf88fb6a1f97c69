//! Drift report synthesis.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Sentinel returned when nothing has been logged yet.
pub(crate) const NO_HISTORY: &str = "No drift history to report.";

/// Overall score at or above which an iteration counts as preserving
/// semantics for reporting purposes. Distinct from the threshold finder's
/// configurable threshold.
const PRESERVATION_THRESHOLD: f64 = 0.9;

/// Metrics summarized in the report table, in display order.
const SUMMARY_METRICS: [&str; 9] = [
    "overall",
    "position",
    "health",
    "energy",
    "is_alive",
    "role",
    "has_target_accuracy",
    "is_alive_accuracy",
    "role_accuracy",
];

/// Features ranked by degradation rate.
const DRIFT_FEATURES: [&str; 6] = ["position", "health", "energy", "is_alive", "role", "threatened"];

/// Render the markdown drift report from a non-empty history.
pub(crate) fn render(history: &BTreeMap<String, Vec<f64>>, compression_levels: &[f64]) -> String {
    let mut report = String::new();
    report.push_str("# Semantic Drift Analysis Report\n\n");

    report.push_str("## Summary Statistics\n\n");
    report.push_str("| Metric | Mean | Min | Max | Std Dev |\n");
    report.push_str("|--------|------|-----|-----|--------|\n");
    for metric in SUMMARY_METRICS {
        if let Some(values) = history.get(metric) {
            let _ = writeln!(
                report,
                "| {} | {:.4} | {:.4} | {:.4} | {:.4} |",
                metric,
                mean(values),
                min(values),
                max(values),
                sample_std(values),
            );
        }
    }

    report.push_str("\n## Compression Analysis\n\n");
    report.push_str("Relationship between compression level and semantic preservation:\n\n");

    if let Some(level) = minimum_acceptable_level(history, compression_levels) {
        let _ = writeln!(
            report,
            "- **Minimum acceptable compression level**: {:.2} bits per dimension",
            level
        );
        let _ = writeln!(
            report,
            "  (maintains at least {:.0}% semantic preservation)\n",
            PRESERVATION_THRESHOLD * 100.0
        );
    }

    let rates = degradation_rates(history);
    if !rates.is_empty() {
        report.push_str("### Feature Degradation Order (fastest to slowest):\n\n");
        for (feature, rate) in rates {
            let _ = writeln!(report, "- **{}**: degrades at {:.4} per step", feature, rate);
        }
    }

    report
}

/// Minimum compression level among iterations whose overall score meets the
/// preservation threshold.
fn minimum_acceptable_level(
    history: &BTreeMap<String, Vec<f64>>,
    compression_levels: &[f64],
) -> Option<f64> {
    let overall = history.get("overall")?;
    overall
        .iter()
        .zip(compression_levels.iter())
        .filter(|(&score, _)| score >= PRESERVATION_THRESHOLD)
        .map(|(_, &level)| level)
        .min_by(f64::total_cmp)
}

/// Average per-step degradation `(first - last) / count`, fastest first.
fn degradation_rates(history: &BTreeMap<String, Vec<f64>>) -> Vec<(&'static str, f64)> {
    let mut rates: Vec<(&'static str, f64)> = DRIFT_FEATURES
        .iter()
        .filter_map(|&feature| {
            let values = history.get(feature)?;
            if values.len() < 2 {
                return None;
            }
            let rate = (values[0] - values[values.len() - 1]) / values.len() as f64;
            Some((feature, rate))
        })
        .collect();
    rates.sort_by(|a, b| b.1.total_cmp(&a.1));
    rates
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Sample standard deviation; 0.0 with fewer than two values.
fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history_with(entries: &[(&str, &[f64])]) -> BTreeMap<String, Vec<f64>> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_vec()))
            .collect()
    }

    #[test]
    fn test_summary_table_contains_tracked_metrics() {
        let history = history_with(&[
            ("overall", &[0.95, 0.92, 0.85]),
            ("position", &[0.99, 0.97, 0.90]),
            ("role_accuracy", &[1.0, 1.0, 0.9]),
        ]);
        let report = render(&history, &[2.0, 1.0, 0.5]);

        assert!(report.contains("# Semantic Drift Analysis Report"));
        assert!(report.contains("| overall | 0.9067 |"));
        assert!(report.contains("| position |"));
        assert!(report.contains("| role_accuracy |"));
        // Metrics absent from the history are skipped, not zero-filled.
        assert!(!report.contains("| energy |"));
    }

    #[test]
    fn test_minimum_acceptable_level() {
        let history = history_with(&[("overall", &[0.95, 0.92, 0.85])]);
        let level = minimum_acceptable_level(&history, &[2.0, 1.0, 0.5]);
        // 0.5 fails the threshold; 1.0 is the smallest passing level.
        assert_eq!(level, Some(1.0));
    }

    #[test]
    fn test_no_acceptable_level_omits_section() {
        let history = history_with(&[("overall", &[0.5, 0.4])]);
        let report = render(&history, &[2.0, 1.0]);
        assert!(!report.contains("Minimum acceptable compression level"));
    }

    #[test]
    fn test_degradation_order_fastest_first() {
        let history = history_with(&[
            ("position", &[1.0, 0.6]), // rate 0.2
            ("health", &[1.0, 0.9]),   // rate 0.05
            ("energy", &[0.8, 0.8]),   // rate 0.0
        ]);
        let rates = degradation_rates(&history);
        assert_eq!(
            rates.iter().map(|(f, _)| *f).collect::<Vec<_>>(),
            vec!["position", "health", "energy"]
        );
        assert!((rates[0].1 - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_single_entry_features_are_skipped() {
        let history = history_with(&[("position", &[1.0])]);
        assert!(degradation_rates(&history).is_empty());
    }

    #[test]
    fn test_sample_std() {
        assert_eq!(sample_std(&[1.0]), 0.0);
        // Sample variance of {1, 3} is 2.
        assert!((sample_std(&[1.0, 3.0]) - 2.0f64.sqrt()).abs() < 1e-12);
    }
}

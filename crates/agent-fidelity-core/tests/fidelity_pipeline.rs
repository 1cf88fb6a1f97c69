//! End-to-end checks across the metrics engine, quantizer, and latent
//! diagnostics.

use candle_core::{Device, Tensor};

use agent_fidelity_core::latent::analyze_latent_space;
use agent_fidelity_core::metrics::SemanticMetrics;
use agent_fidelity_core::{QuantizerConfig, VectorQuantizer};

/// Build a state batch with the canonical 12-column layout.
fn state_batch(rows: &[[f32; 12]]) -> Tensor {
    let flat: Vec<f32> = rows.iter().flatten().copied().collect();
    Tensor::from_vec(flat, (rows.len(), 12), &Device::Cpu).unwrap()
}

fn original_rows() -> Vec<[f32; 12]> {
    vec![
        [0.2, 0.8, 1.0, 1.0, 0.9, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
        [0.5, 0.5, 0.6, 0.0, 0.4, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 1.0],
        [0.9, 0.1, 0.2, 0.0, 0.1, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0],
        [0.3, 0.3, 0.9, 1.0, 0.7, 0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0],
    ]
}

/// Perturb positions and flip one binary flag, leaving roles intact.
fn reconstructed_rows() -> Vec<[f32; 12]> {
    let mut rows = original_rows();
    for row in rows.iter_mut() {
        row[0] += 0.05;
        row[1] -= 0.05;
    }
    rows[1][3] = 1.0; // has_target false -> true
    rows
}

#[test]
fn evaluation_degrades_gracefully_under_perturbation() {
    let engine = SemanticMetrics::new();
    let original = state_batch(&original_rows());
    let reconstructed = state_batch(&reconstructed_rows());

    let evaluation = engine.evaluate(&original, &reconstructed).unwrap();

    let overall = evaluation["overall"].as_scalar().unwrap();
    assert!(overall > 0.0 && overall < 1.0, "perturbed batch must land strictly inside (0, 1), got {overall}");

    // Position was perturbed on every row, health untouched.
    assert!(evaluation["position_mae"].as_scalar().unwrap() > 0.0);
    assert_eq!(evaluation["health_mae"].as_scalar().unwrap(), 0.0);

    // One of four has_target labels flipped.
    let has_target_accuracy = evaluation["has_target_accuracy"].as_scalar().unwrap();
    assert!((has_target_accuracy - 0.75).abs() < 1e-12);

    // Roles untouched: perfect accuracy, diagonal confusion.
    assert_eq!(evaluation["role_accuracy"].as_scalar().unwrap(), 1.0);
}

#[test]
fn overall_score_stays_within_feature_score_envelope() {
    let engine = SemanticMetrics::new();
    let original = state_batch(&original_rows());
    let reconstructed = state_batch(&reconstructed_rows());

    let scores = engine
        .compute_equivalence_scores(&original, &reconstructed)
        .unwrap();

    let overall = scores["overall"];
    let feature_scores: Vec<f64> = scores
        .iter()
        .filter(|(k, _)| *k != "overall")
        .map(|(_, &v)| v)
        .collect();
    let lo = feature_scores.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = feature_scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    assert!(
        overall >= lo && overall <= hi,
        "overall {overall} must lie within [{lo}, {hi}]"
    );
}

#[test]
fn quantizer_feeds_latent_diagnostics() {
    let quantizer = VectorQuantizer::new(
        &QuantizerConfig {
            latent_dim: 4,
            num_embeddings: 16,
            commitment_cost: 0.25,
            seed: Some(17),
        },
        &Device::Cpu,
    )
    .unwrap();

    // A spread of latent vectors; values intentionally exceed the codebook
    // range so quantization has visible error.
    let flat: Vec<f32> = (0..32).map(|i| (i as f32 / 8.0) - 2.0).collect();
    let z = Tensor::from_vec(flat, (8, 4), &Device::Cpu).unwrap();

    let out = quantizer.forward(&z).unwrap();
    assert!(out.vq_loss > 0.0);
    assert!(out.perplexity >= 1.0 && out.perplexity <= 16.0);

    // Quantized output is a valid latent batch for the analyzer.
    let report = analyze_latent_space(&out.quantized, None).unwrap();
    assert!(report.std >= 0.0);
    assert!(report.max >= report.min);

    // All quantized values live inside the codebook init range.
    assert!(report.max <= 1.0 / 16.0 + 1e-6);
    assert!(report.min >= -1.0 / 16.0 - 1e-6);
}

#[test]
fn compression_rate_sweep_is_strictly_decreasing() {
    let mut previous = f64::INFINITY;
    for num_embeddings in [16usize, 64, 256, 1024] {
        let quantizer = VectorQuantizer::new(
            &QuantizerConfig {
                latent_dim: 16,
                num_embeddings,
                commitment_cost: 0.25,
                seed: Some(0),
            },
            &Device::Cpu,
        )
        .unwrap();
        let rate = quantizer.compression_rate();
        assert!(
            rate < previous,
            "rate {rate} at {num_embeddings} entries must be below {previous}"
        );
        previous = rate;
    }
}

//! Configuration for the fidelity evaluation system.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Main configuration structure.
///
/// All components take their configuration section by value at construction;
/// nothing reads global state after that point.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FidelityConfig {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub quantizer: QuantizerConfig,
}

impl FidelityConfig {
    /// Load configuration from files and environment.
    ///
    /// Configuration is loaded in order:
    /// 1. config/default.toml (base settings)
    /// 2. config/{AGENT_FIDELITY_ENV}.toml (environment-specific)
    /// 3. Environment variables with AGENT_FIDELITY_ prefix
    pub fn load() -> CoreResult<Self> {
        let env =
            std::env::var("AGENT_FIDELITY_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", env)).required(false))
            .add_source(config::Environment::with_prefix("AGENT_FIDELITY").separator("__"));

        let config: FidelityConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FidelityConfig = toml::from_str(&content).map_err(|e| {
            CoreError::ConfigInvalid(format!("failed to parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> CoreResult<()> {
        if self.features.extractors.is_empty() {
            return Err(CoreError::ConfigInvalid(
                "features.extractors must not be empty".into(),
            ));
        }
        if !(self.metrics.mape_epsilon > 0.0) {
            return Err(CoreError::ConfigInvalid(
                "metrics.mape_epsilon must be positive".into(),
            ));
        }
        if !(self.tracking.semantic_threshold > 0.0 && self.tracking.semantic_threshold <= 1.0) {
            return Err(CoreError::ConfigInvalid(
                "tracking.semantic_threshold must lie in (0, 1]".into(),
            ));
        }
        self.quantizer.validate()
    }
}

impl Default for FidelityConfig {
    fn default() -> Self {
        Self {
            features: FeatureConfig::default(),
            metrics: MetricsConfig::default(),
            tracking: TrackingConfig::default(),
            quantizer: QuantizerConfig::default(),
        }
    }
}

/// Which semantic features the extractor produces and compares.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeatureConfig {
    pub extractors: Vec<String>,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            extractors: [
                "position",
                "health",
                "has_target",
                "energy",
                "is_alive",
                "role",
                "threatened",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Feature importance table used to aggregate per-feature similarities.
///
/// Features absent from the table weigh 1.0.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FeatureWeights(BTreeMap<String, f64>);

impl FeatureWeights {
    /// Weight for a feature; unknown features weigh 1.0.
    pub fn weight(&self, feature: &str) -> f64 {
        self.0.get(feature).copied().unwrap_or(1.0)
    }
}

impl Default for FeatureWeights {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert("position".to_string(), 0.55);
        weights.insert("health".to_string(), 0.15);
        weights.insert("energy".to_string(), 0.15);
        weights.insert("is_alive".to_string(), 0.05);
        weights.insert("role".to_string(), 0.05);
        weights.insert("has_target".to_string(), 0.03);
        weights.insert("threatened".to_string(), 0.02);
        Self(weights)
    }
}

/// Tunables of the semantic metrics engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Value substituted for precision/recall/F1 when the denominator is
    /// zero (degenerate single-class batches).
    pub undefined_metric_default: f64,
    /// Denominator stabilizer for mean-absolute-percentage-error.
    pub mape_epsilon: f64,
    /// Feature importance weights for the overall equivalence score.
    #[serde(default)]
    pub weights: FeatureWeights,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            undefined_metric_default: 1.0,
            mape_epsilon: 1e-6,
            weights: FeatureWeights::default(),
        }
    }
}

/// Drift tracking configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackingConfig {
    /// Directory receiving one snapshot file per logged iteration.
    pub log_dir: String,
    /// Minimum acceptable overall similarity for the threshold finder.
    pub semantic_threshold: f64,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            log_dir: "results/drift_tracking".to_string(),
            semantic_threshold: 0.9,
        }
    }
}

/// Vector quantizer hyperparameters.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QuantizerConfig {
    /// Dimension of the latent vectors being quantized.
    pub latent_dim: usize,
    /// Number of codebook entries.
    pub num_embeddings: usize,
    /// Weight of the commitment term in the quantization loss.
    pub commitment_cost: f64,
    /// Optional seed; identical seeds produce identical codebooks.
    pub seed: Option<u64>,
}

impl QuantizerConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.latent_dim == 0 {
            return Err(CoreError::ConfigInvalid(
                "quantizer.latent_dim must be positive".into(),
            ));
        }
        if self.num_embeddings < 2 {
            return Err(CoreError::ConfigInvalid(
                "quantizer.num_embeddings must be at least 2".into(),
            ));
        }
        if self.commitment_cost < 0.0 {
            return Err(CoreError::ConfigInvalid(
                "quantizer.commitment_cost must be non-negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for QuantizerConfig {
    fn default() -> Self {
        Self {
            latent_dim: 16,
            num_embeddings: 512,
            commitment_cost: 0.25,
            seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        let config = FidelityConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_weights_match_importance_table() {
        let weights = FeatureWeights::default();
        assert_eq!(weights.weight("position"), 0.55);
        assert_eq!(weights.weight("health"), 0.15);
        assert_eq!(weights.weight("threatened"), 0.02);
        // Unknown features fall back to 1.0
        assert_eq!(weights.weight("goals"), 1.0);
    }

    #[test]
    fn test_validation_rejects_degenerate_codebook() {
        let mut config = FidelityConfig::default();
        config.quantizer.num_embeddings = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_extractors() {
        let mut config = FidelityConfig::default();
        config.features.extractors.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = FidelityConfig::default();
        let toml_str = toml::to_string(&config).expect("config must serialize to TOML");
        let restored: FidelityConfig =
            toml::from_str(&toml_str).expect("config must deserialize from TOML");

        assert_eq!(restored.tracking.semantic_threshold, 0.9);
        assert_eq!(restored.quantizer.num_embeddings, 512);
        assert_eq!(restored.features.extractors.len(), 7);
    }

    #[test]
    fn test_config_from_toml_string() {
        let toml_str = r#"
            [features]
            extractors = ["position", "health"]

            [metrics]
            undefined_metric_default = 1.0
            mape_epsilon = 1e-6

            [tracking]
            log_dir = "/tmp/drift"
            semantic_threshold = 0.85

            [quantizer]
            latent_dim = 8
            num_embeddings = 64
            commitment_cost = 0.25
            seed = 42
        "#;

        let config: FidelityConfig = toml::from_str(toml_str).expect("config must parse");
        assert_eq!(config.tracking.semantic_threshold, 0.85);
        assert_eq!(config.quantizer.seed, Some(42));
        assert_eq!(config.features.extractors, vec!["position", "health"]);
    }
}

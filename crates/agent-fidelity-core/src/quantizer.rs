//! Discrete latent quantization against a fixed codebook.

use candle_core::{DType, Device, Tensor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::config::QuantizerConfig;
use crate::error::{CoreError, CoreResult};

/// Epsilon added to codebook usage probabilities before `log2`.
const PERPLEXITY_EPS: f64 = 1e-10;

/// Bits per dimension of the full-precision latent baseline.
const FULL_PRECISION_BITS: f64 = 32.0;

/// Maps continuous latent vectors onto the nearest entries of a fixed
/// codebook.
///
/// The codebook has shape `(num_embeddings, latent_dim)` and is initialized
/// uniformly in `[-1/num_embeddings, 1/num_embeddings]`; construction with
/// the same seed yields the same codebook.
pub struct VectorQuantizer {
    latent_dim: usize,
    num_embeddings: usize,
    commitment_cost: f64,
    codebook: Tensor,
}

/// Result of quantizing one batch of latent vectors.
#[derive(Debug, Clone)]
pub struct Quantization {
    /// Rows replaced by their nearest codebook vectors.
    pub quantized: Tensor,
    /// Chosen codebook index per input row.
    pub indices: Vec<u32>,
    /// `codebook_loss + commitment_cost * commitment_loss`.
    pub vq_loss: f64,
    /// Pulls codebook entries toward encoder outputs during training.
    pub codebook_loss: f64,
    /// Pulls encoder outputs toward their chosen codebook entries.
    pub commitment_loss: f64,
    /// Effective number of codebook entries in use, in `[1, num_embeddings]`.
    pub perplexity: f64,
}

impl Quantization {
    /// Constant offset `quantized - z`.
    ///
    /// A training loop applies the straight-through estimator by forming
    /// `z + residual` and treating the residual as a constant: the forward
    /// value is the quantized vector while gradients pass through `z`
    /// unchanged.
    pub fn residual(&self, z: &Tensor) -> CoreResult<Tensor> {
        Ok((&self.quantized - z)?)
    }

    /// `z + residual(z)`: numerically equal to `quantized`, spelled the way
    /// the straight-through estimator composes it.
    pub fn straight_through(&self, z: &Tensor) -> CoreResult<Tensor> {
        Ok((z + &self.residual(z)?)?)
    }
}

impl VectorQuantizer {
    /// Build a quantizer with a freshly initialized codebook on `device`.
    pub fn new(config: &QuantizerConfig, device: &Device) -> CoreResult<Self> {
        config.validate()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let bound = 1.0 / config.num_embeddings as f32;
        let values: Vec<f32> = (0..config.num_embeddings * config.latent_dim)
            .map(|_| rng.gen_range(-bound..bound))
            .collect();
        let codebook =
            Tensor::from_vec(values, (config.num_embeddings, config.latent_dim), device)?;

        Ok(Self {
            latent_dim: config.latent_dim,
            num_embeddings: config.num_embeddings,
            commitment_cost: config.commitment_cost,
            codebook,
        })
    }

    pub fn latent_dim(&self) -> usize {
        self.latent_dim
    }

    pub fn num_embeddings(&self) -> usize {
        self.num_embeddings
    }

    /// The codebook tensor, shape `(num_embeddings, latent_dim)`.
    pub fn codebook(&self) -> &Tensor {
        &self.codebook
    }

    /// Quantize a batch of latent vectors.
    ///
    /// `z` must be rank-2 `f32` with trailing dimension `latent_dim`; each
    /// row is replaced by the nearest codebook row under squared Euclidean
    /// distance, ties broken by the first minimal index.
    pub fn forward(&self, z: &Tensor) -> CoreResult<Quantization> {
        if z.dtype() != DType::F32 {
            return Err(CoreError::InvalidShape(format!(
                "expected f32 latent batch, got {:?}",
                z.dtype()
            )));
        }
        let dims = z.dims();
        if dims.len() != 2 {
            return Err(CoreError::InvalidShape(format!(
                "expected rank-2 latent batch, got rank {}",
                dims.len()
            )));
        }
        if dims[0] == 0 {
            return Err(CoreError::InvalidShape(
                "latent batch must contain at least one row".into(),
            ));
        }
        if dims[1] != self.latent_dim {
            return Err(CoreError::DimensionMismatch {
                expected: self.latent_dim,
                actual: dims[1],
            });
        }

        let rows = z.to_vec2::<f32>()?;
        let codebook = self.codebook.to_vec2::<f32>()?;
        let batch = rows.len();

        let mut indices = Vec::with_capacity(batch);
        let mut counts = vec![0u64; self.num_embeddings];
        let mut quantized_flat = Vec::with_capacity(batch * self.latent_dim);
        let mut sq_error = 0.0f64;

        for row in &rows {
            let mut best = 0usize;
            let mut best_dist = f64::INFINITY;
            for (idx, entry) in codebook.iter().enumerate() {
                let mut dist = 0.0f64;
                for (a, b) in row.iter().zip(entry.iter()) {
                    let d = (a - b) as f64;
                    dist += d * d;
                }
                if dist < best_dist {
                    best_dist = dist;
                    best = idx;
                }
            }
            indices.push(best as u32);
            counts[best] += 1;
            quantized_flat.extend_from_slice(&codebook[best]);
            sq_error += best_dist;
        }

        let mse = sq_error / (batch * self.latent_dim) as f64;
        let codebook_loss = mse;
        let commitment_loss = mse;
        let vq_loss = codebook_loss + self.commitment_cost * commitment_loss;

        let perplexity = self.perplexity(&counts, batch);
        let quantized =
            Tensor::from_vec(quantized_flat, (batch, self.latent_dim), z.device())?;

        Ok(Quantization {
            quantized,
            indices,
            vq_loss,
            codebook_loss,
            commitment_loss,
            perplexity,
        })
    }

    /// Exponentiated base-2 entropy of the codebook usage distribution.
    ///
    /// Equals `num_embeddings` only under perfectly uniform usage; a
    /// non-finite intermediate collapses to 1.0 (degenerate single-code
    /// usage).
    fn perplexity(&self, counts: &[u64], batch: usize) -> f64 {
        let probs: Vec<f64> = counts.iter().map(|&c| c as f64 / batch as f64).collect();
        let filtered_sum: f64 = probs.iter().map(|p| p + PERPLEXITY_EPS).sum();

        let entropy: f64 = -probs
            .iter()
            .map(|&p| {
                let normalized = (p + PERPLEXITY_EPS) / filtered_sum;
                p * (normalized + PERPLEXITY_EPS).log2()
            })
            .sum::<f64>();
        let perplexity = entropy.exp2();

        if perplexity.is_finite() {
            perplexity
        } else {
            warn!(entropy, "degenerate codebook usage entropy, reporting perplexity 1.0");
            1.0
        }
    }

    /// Ratio of full-precision latent bits to codebook index bits.
    ///
    /// A property of the configuration alone; doubling `num_embeddings`
    /// strictly decreases the rate.
    pub fn compression_rate(&self) -> f64 {
        let bits_full_precision = self.latent_dim as f64 * FULL_PRECISION_BITS;
        let bits_codebook_index = (self.num_embeddings as f64).log2();
        bits_full_precision / bits_codebook_index
    }
}

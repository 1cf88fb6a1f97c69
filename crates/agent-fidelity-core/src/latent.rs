//! Descriptive diagnostics over encoded latent vectors.
//!
//! Everything here is best-effort: the cluster-separation scores are
//! `Option`s that stay absent on degenerate input (a single cluster, one
//! point per cluster, coincident centroids) instead of failing the report.

use candle_core::{DType, Tensor};
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

/// Variance below which a latent dimension counts as dead.
const DEAD_VARIANCE: f64 = 1e-6;

/// Summary statistics of a latent batch.
#[derive(Debug, Clone, Serialize)]
pub struct LatentSpaceReport {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    /// Percentage of dimensions with near-zero variance across the batch.
    pub dead_dimensions_percent: f64,
    /// Mean pairwise Euclidean distance; absent for fewer than two points.
    pub avg_distance: Option<f64>,
    pub max_distance: Option<f64>,
    /// Mean silhouette coefficient; higher is better separation.
    pub silhouette_score: Option<f64>,
    /// Davies-Bouldin index; lower is better separation.
    pub davies_bouldin_score: Option<f64>,
}

/// Compute descriptive statistics of `latent`, optionally with cluster
/// quality scores when per-row `labels` are supplied.
pub fn analyze_latent_space(
    latent: &Tensor,
    labels: Option<&[u32]>,
) -> CoreResult<LatentSpaceReport> {
    if latent.dtype() != DType::F32 {
        return Err(CoreError::InvalidShape(format!(
            "expected f32 latent batch, got {:?}",
            latent.dtype()
        )));
    }
    let dims = latent.dims();
    if dims.len() != 2 || dims[0] == 0 || dims[1] == 0 {
        return Err(CoreError::InvalidShape(format!(
            "expected non-empty rank-2 latent batch, got {:?}",
            dims
        )));
    }
    if let Some(labels) = labels {
        if labels.len() != dims[0] {
            return Err(CoreError::InvalidShape(format!(
                "{} labels for {} latent rows",
                labels.len(),
                dims[0]
            )));
        }
    }

    let rows = latent.to_vec2::<f32>()?;
    let (n, d) = (rows.len(), rows[0].len());

    let mut sum = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for row in &rows {
        for &v in row {
            let v = v as f64;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
    }
    let count = (n * d) as f64;
    let mean = sum / count;
    let variance = rows
        .iter()
        .flat_map(|row| row.iter())
        .map(|&v| {
            let diff = v as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / count;

    let dead = (0..d)
        .filter(|&col| column_variance(&rows, col) < DEAD_VARIANCE)
        .count();

    let (avg_distance, max_distance) = pairwise_distances(&rows);
    let (silhouette_score, davies_bouldin_score) = match labels {
        Some(labels) => (silhouette(&rows, labels), davies_bouldin(&rows, labels)),
        None => (None, None),
    };

    Ok(LatentSpaceReport {
        mean,
        std: variance.sqrt(),
        min,
        max,
        dead_dimensions_percent: dead as f64 / d as f64 * 100.0,
        avg_distance,
        max_distance,
        silhouette_score,
        davies_bouldin_score,
    })
}

fn column_variance(rows: &[Vec<f32>], col: usize) -> f64 {
    let n = rows.len() as f64;
    let mean = rows.iter().map(|r| r[col] as f64).sum::<f64>() / n;
    rows.iter()
        .map(|r| {
            let diff = r[col] as f64 - mean;
            diff * diff
        })
        .sum::<f64>()
        / n
}

fn euclidean(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let d = (x - y) as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

fn pairwise_distances(rows: &[Vec<f32>]) -> (Option<f64>, Option<f64>) {
    if rows.len() < 2 {
        return (None, None);
    }
    let mut sum = 0.0f64;
    let mut max = 0.0f64;
    let mut count = 0usize;
    for i in 0..rows.len() {
        for j in (i + 1)..rows.len() {
            let dist = euclidean(&rows[i], &rows[j]);
            sum += dist;
            max = max.max(dist);
            count += 1;
        }
    }
    (Some(sum / count as f64), Some(max))
}

/// Unique labels with at least one member, in sorted order.
fn clusters(labels: &[u32]) -> Vec<u32> {
    let mut unique: Vec<u32> = labels.to_vec();
    unique.sort_unstable();
    unique.dedup();
    unique
}

/// Mean silhouette coefficient; `None` unless `1 < k < n`.
fn silhouette(rows: &[Vec<f32>], labels: &[u32]) -> Option<f64> {
    let unique = clusters(labels);
    let n = rows.len();
    if unique.len() < 2 || unique.len() >= n {
        return None;
    }

    let mut total = 0.0f64;
    for (i, row) in rows.iter().enumerate() {
        let own = labels[i];
        let own_size = labels.iter().filter(|&&l| l == own).count();

        // Singleton clusters contribute 0 by convention.
        if own_size < 2 {
            continue;
        }

        let a = rows
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i && labels[*j] == own)
            .map(|(_, other)| euclidean(row, other))
            .sum::<f64>()
            / (own_size - 1) as f64;

        let b = unique
            .iter()
            .filter(|&&label| label != own)
            .map(|&label| {
                let members: Vec<&Vec<f32>> = rows
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| labels[*j] == label)
                    .map(|(_, r)| r)
                    .collect();
                members.iter().map(|other| euclidean(row, other)).sum::<f64>()
                    / members.len() as f64
            })
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / n as f64)
}

/// Davies-Bouldin index; `None` unless `1 < k < n` and centroids are
/// pairwise distinct.
fn davies_bouldin(rows: &[Vec<f32>], labels: &[u32]) -> Option<f64> {
    let unique = clusters(labels);
    let k = unique.len();
    let n = rows.len();
    if k < 2 || k >= n {
        return None;
    }
    let d = rows[0].len();

    let mut centroids = Vec::with_capacity(k);
    let mut scatters = Vec::with_capacity(k);
    for &label in &unique {
        let members: Vec<&Vec<f32>> = rows
            .iter()
            .enumerate()
            .filter(|(j, _)| labels[*j] == label)
            .map(|(_, r)| r)
            .collect();

        let mut centroid = vec![0.0f32; d];
        for member in &members {
            for (c, &v) in centroid.iter_mut().zip(member.iter()) {
                *c += v;
            }
        }
        for c in centroid.iter_mut() {
            *c /= members.len() as f32;
        }

        let scatter = members
            .iter()
            .map(|member| euclidean(member, &centroid))
            .sum::<f64>()
            / members.len() as f64;

        centroids.push(centroid);
        scatters.push(scatter);
    }

    let mut total = 0.0f64;
    for i in 0..k {
        let mut worst = f64::NEG_INFINITY;
        for j in 0..k {
            if i == j {
                continue;
            }
            let separation = euclidean(&centroids[i], &centroids[j]);
            if separation == 0.0 {
                return None;
            }
            worst = worst.max((scatters[i] + scatters[j]) / separation);
        }
        total += worst;
    }
    Some(total / k as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::Device;

    fn tensor(rows: &[&[f32]]) -> Tensor {
        let flat: Vec<f32> = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Tensor::from_vec(flat, (rows.len(), rows[0].len()), &Device::Cpu).unwrap()
    }

    #[test]
    fn test_basic_statistics() {
        let latent = tensor(&[&[0.0, 1.0], &[2.0, 3.0]]);
        let report = analyze_latent_space(&latent, None).unwrap();

        assert_eq!(report.mean, 1.5);
        assert_eq!(report.min, 0.0);
        assert_eq!(report.max, 3.0);
        assert!(report.silhouette_score.is_none());
        assert!(report.davies_bouldin_score.is_none());
    }

    #[test]
    fn test_dead_dimensions() {
        // Second column is constant across the batch.
        let latent = tensor(&[&[0.0, 0.5], &[1.0, 0.5], &[2.0, 0.5]]);
        let report = analyze_latent_space(&latent, None).unwrap();
        assert_eq!(report.dead_dimensions_percent, 50.0);
    }

    #[test]
    fn test_pairwise_distances_absent_for_single_point() {
        let latent = tensor(&[&[1.0, 2.0]]);
        let report = analyze_latent_space(&latent, None).unwrap();
        assert!(report.avg_distance.is_none());
        assert!(report.max_distance.is_none());
    }

    #[test]
    fn test_pairwise_distance_values() {
        let latent = tensor(&[&[0.0, 0.0], &[3.0, 4.0]]);
        let report = analyze_latent_space(&latent, None).unwrap();
        assert_eq!(report.avg_distance, Some(5.0));
        assert_eq!(report.max_distance, Some(5.0));
    }

    #[test]
    fn test_well_separated_clusters_score_high() {
        let latent = tensor(&[
            &[0.0, 0.0],
            &[0.1, 0.0],
            &[10.0, 10.0],
            &[10.1, 10.0],
        ]);
        let labels = [0u32, 0, 1, 1];
        let report = analyze_latent_space(&latent, Some(&labels)).unwrap();

        let silhouette = report.silhouette_score.expect("two real clusters");
        assert!(silhouette > 0.9, "well-separated clusters, got {silhouette}");
        let db = report.davies_bouldin_score.expect("two real clusters");
        assert!(db < 0.1, "well-separated clusters give a low index, got {db}");
    }

    #[test]
    fn test_degenerate_clustering_is_omitted() {
        let latent = tensor(&[&[0.0, 0.0], &[1.0, 1.0], &[2.0, 2.0]]);

        // Single cluster
        let single = analyze_latent_space(&latent, Some(&[1, 1, 1])).unwrap();
        assert!(single.silhouette_score.is_none());
        assert!(single.davies_bouldin_score.is_none());

        // One point per cluster
        let all_distinct = analyze_latent_space(&latent, Some(&[0, 1, 2])).unwrap();
        assert!(all_distinct.silhouette_score.is_none());
        assert!(all_distinct.davies_bouldin_score.is_none());
    }

    #[test]
    fn test_label_count_mismatch_is_an_error() {
        let latent = tensor(&[&[0.0, 0.0], &[1.0, 1.0]]);
        assert!(analyze_latent_space(&latent, Some(&[0])).is_err());
    }
}

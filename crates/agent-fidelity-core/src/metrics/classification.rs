//! Binary and categorical classification metrics.

use std::ops::Range;

/// Fixed one-hot role block: columns 5..10 of the state vector.
pub(crate) const ROLE_COLUMNS: Range<usize> = 5..10;

/// Counts for a 2x2 binary confusion matrix.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct BinaryCounts {
    pub tn: u64,
    pub fp: u64,
    pub fn_: u64,
    pub tp: u64,
}

impl BinaryCounts {
    pub(crate) fn from_labels(original: &[bool], reconstructed: &[bool]) -> Self {
        let mut counts = Self::default();
        for (&o, &r) in original.iter().zip(reconstructed.iter()) {
            match (o, r) {
                (false, false) => counts.tn += 1,
                (false, true) => counts.fp += 1,
                (true, false) => counts.fn_ += 1,
                (true, true) => counts.tp += 1,
            }
        }
        counts
    }

    pub(crate) fn total(&self) -> u64 {
        self.tn + self.fp + self.fn_ + self.tp
    }

    pub(crate) fn accuracy(&self) -> f64 {
        (self.tn + self.tp) as f64 / self.total() as f64
    }

    /// Precision with the configured fallback when no positives were predicted.
    pub(crate) fn precision(&self, undefined_default: f64) -> f64 {
        let predicted_positive = self.tp + self.fp;
        if predicted_positive == 0 {
            undefined_default
        } else {
            self.tp as f64 / predicted_positive as f64
        }
    }

    /// Recall with the configured fallback when no positives exist.
    pub(crate) fn recall(&self, undefined_default: f64) -> f64 {
        let actual_positive = self.tp + self.fn_;
        if actual_positive == 0 {
            undefined_default
        } else {
            self.tp as f64 / actual_positive as f64
        }
    }

    /// F1 with the configured fallback when precision + recall is zero.
    pub(crate) fn f1(&self, undefined_default: f64) -> f64 {
        let p = self.precision(undefined_default);
        let r = self.recall(undefined_default);
        if p + r == 0.0 {
            undefined_default
        } else {
            2.0 * p * r / (p + r)
        }
    }

    /// `[[tn, fp], [fn, tp]]`, rows = actual, columns = predicted.
    pub(crate) fn matrix(&self) -> Vec<Vec<u64>> {
        vec![vec![self.tn, self.fp], vec![self.fn_, self.tp]]
    }
}

/// Arg-max decode of the one-hot role block, first-maximal index on ties.
pub(crate) fn decode_roles(rows: &[Vec<f32>], columns: Range<usize>) -> Vec<usize> {
    rows.iter()
        .map(|row| {
            let mut best = 0usize;
            let mut best_val = f32::NEG_INFINITY;
            for (offset, col) in columns.clone().enumerate() {
                if row[col] > best_val {
                    best_val = row[col];
                    best = offset;
                }
            }
            best
        })
        .collect()
}

/// Accuracy and an `n x n` confusion matrix over the full label set.
pub(crate) fn categorical_metrics(
    original: &[usize],
    reconstructed: &[usize],
    label_count: usize,
) -> (f64, Vec<Vec<u64>>) {
    let mut matrix = vec![vec![0u64; label_count]; label_count];
    let mut correct = 0u64;
    for (&o, &r) in original.iter().zip(reconstructed.iter()) {
        matrix[o][r] += 1;
        if o == r {
            correct += 1;
        }
    }
    (correct as f64 / original.len() as f64, matrix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_matrix_layout() {
        let original = [true, true, false, false, true];
        let reconstructed = [true, false, false, true, true];
        let counts = BinaryCounts::from_labels(&original, &reconstructed);

        assert_eq!(counts.tp, 2);
        assert_eq!(counts.fn_, 1);
        assert_eq!(counts.tn, 1);
        assert_eq!(counts.fp, 1);
        assert_eq!(counts.matrix(), vec![vec![1, 1], vec![1, 2]]);
        assert!((counts.accuracy() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_identical_labels_give_diagonal_matrix() {
        let labels = [true, false, true, true];
        let counts = BinaryCounts::from_labels(&labels, &labels);

        assert_eq!(counts.accuracy(), 1.0);
        assert_eq!(counts.fp, 0);
        assert_eq!(counts.fn_, 0);
        let m = counts.matrix();
        assert_eq!(m[0][1], 0);
        assert_eq!(m[1][0], 0);
    }

    #[test]
    fn test_degenerate_all_negative_batch_uses_default() {
        // No positives anywhere: precision, recall, and F1 are all undefined.
        let labels = [false, false, false];
        let counts = BinaryCounts::from_labels(&labels, &labels);

        assert_eq!(counts.accuracy(), 1.0);
        assert_eq!(counts.precision(1.0), 1.0);
        assert_eq!(counts.recall(1.0), 1.0);
        assert_eq!(counts.f1(1.0), 1.0);
    }

    #[test]
    fn test_decode_roles_argmax_and_ties() {
        let rows = vec![
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.1, 0.9, 0.0, 0.0, 0.0],
            // Tie between index 0 and index 2 of the block: first wins.
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.5, 0.1, 0.5, 0.0, 0.0],
        ];
        let roles = decode_roles(&rows, ROLE_COLUMNS);
        assert_eq!(roles, vec![1, 0]);
    }

    #[test]
    fn test_categorical_metrics_full_label_set() {
        let original = [0usize, 1, 2, 2];
        let reconstructed = [0usize, 2, 2, 2];
        let (accuracy, matrix) = categorical_metrics(&original, &reconstructed, 5);

        assert!((accuracy - 0.75).abs() < 1e-12);
        assert_eq!(matrix.len(), 5);
        assert_eq!(matrix[1][2], 1);
        assert_eq!(matrix[2][2], 2);
        // Labels never observed still contribute empty rows.
        assert_eq!(matrix[4], vec![0, 0, 0, 0, 0]);
    }
}

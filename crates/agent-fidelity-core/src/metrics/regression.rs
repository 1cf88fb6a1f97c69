//! Numeric error metrics for continuous features.

/// Mean absolute error, root mean squared error, and mean absolute
/// percentage error over paired values.
///
/// MAPE stabilizes the denominator with `epsilon` and reports percent.
pub(crate) fn numeric_errors(original: &[f32], reconstructed: &[f32], epsilon: f64) -> NumericErrors {
    let n = original.len() as f64;
    let mut abs_sum = 0.0f64;
    let mut sq_sum = 0.0f64;
    let mut pct_sum = 0.0f64;

    for (&o, &r) in original.iter().zip(reconstructed.iter()) {
        let diff = (o - r) as f64;
        abs_sum += diff.abs();
        sq_sum += diff * diff;
        pct_sum += (diff / (o as f64 + epsilon)).abs();
    }

    NumericErrors {
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        mape: pct_sum / n * 100.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NumericErrors {
    pub mae: f64,
    pub rmse: f64,
    pub mape: f64,
}

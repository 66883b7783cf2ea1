//! Missing-value handling for observation series.
//!
//! Satellite and sensor series carry gaps as NaN. The stability test needs
//! gap-free input, so missing responses are removed together with the
//! regressor rows observed at the same time step, keeping both aligned.

use crate::errors::{validate_same_length, HistoryResult};
use crate::matrix::Matrix;

/// Indices of the entries of `y` that are not NaN, in order.
///
/// # Example
/// ```rust
/// use stable_history::preprocessing::finite_row_indices;
///
/// assert_eq!(finite_row_indices(&[1.0, f64::NAN, 3.0]), vec![0, 2]);
/// ```
pub fn finite_row_indices(y: &[f64]) -> Vec<usize> {
    y.iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, _)| i)
        .collect()
}

/// Removes NaN responses along with their regressor rows.
///
/// # Arguments
/// * `x` - `n x k` regressors, one row per time step
/// * `y` - Response of length `n`
///
/// # Returns
/// * `Ok((x_kept, y_kept))` - Rows with an observed response, original order preserved
/// * `Err(HistoryError::DimensionMismatch)` - `x` and `y` disagree on `n`
pub fn drop_missing(x: &Matrix, y: &[f64]) -> HistoryResult<(Matrix, Vec<f64>)> {
    validate_same_length(x.nrows(), y.len(), "drop_missing")?;
    let kept = finite_row_indices(y);
    let y_kept = kept.iter().map(|&i| y[i]).collect();
    Ok((x.select_rows(&kept), y_kept))
}

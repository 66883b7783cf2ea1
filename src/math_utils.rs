//! Mathematical utilities shared by the factorization, residual and boundary code.
//!
//! Everything here is a small pure function over slices. NaN handling is
//! explicit per function and matches what the callers rely on.

use statrs::function::erf::erfc;

/// Numerical constants used across the crate.
pub mod constants {
    /// Squared-norm reduction below which a Householder norm downdate is
    /// considered unreliable and the norm is recomputed from scratch.
    pub const NORM_DOWNDATE_THRESHOLD: f64 = 1e-6;

    /// Upper end of the bracket searched when calibrating the boundary constant.
    pub const CALIBRATION_UPPER_BOUND: f64 = 20.0;

    /// Default significance level for the structural-change test.
    pub const DEFAULT_ALPHA: f64 = 0.05;

    /// Absolute tolerance on the calibration root.
    pub const ROOT_XTOL: f64 = 2e-12;

    /// Relative tolerance on the calibration root.
    pub const ROOT_RTOL: f64 = 4.0 * f64::EPSILON;

    /// Iteration cap for bracketed root finding.
    pub const ROOT_MAX_ITER: usize = 200;
}

/// Default tolerance for a problem with `columns` regressors: `sqrt(eps) / columns`.
///
/// Used both as the negligible-column cutoff of the pivoted QR and as the
/// closeness tolerance of the recursive residual stability check.
#[inline]
pub fn default_tolerance(columns: usize) -> f64 {
    f64::EPSILON.sqrt() / columns.max(1) as f64
}

/// Euclidean norm of a slice.
#[inline]
pub fn norm2(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

/// Plain dot product of two equally long slices.
#[inline]
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Dot product that drops every pairwise product which is NaN.
///
/// A NaN in either operand (or an `inf * 0` product) contributes zero instead
/// of poisoning the sum.
///
/// # Example
/// ```rust
/// use stable_history::math_utils::nan_safe_dot;
///
/// assert_eq!(nan_safe_dot(&[1.0, f64::NAN, 2.0], &[3.0, 4.0, 0.5]), 4.0);
/// ```
pub fn nan_safe_dot(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| x * y)
        .filter(|p| !p.is_nan())
        .sum()
}

/// Sample standard deviation with the `n - 1` divisor.
///
/// Returns NaN for fewer than two values and whenever a value is NaN.
pub fn sample_std_dev(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = data.iter().sum::<f64>() / n as f64;
    let ss: f64 = data.iter().map(|&x| (x - mean) * (x - mean)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// `num` evenly spaced points over `[start, end]`, both endpoints included.
///
/// A single point is `start`; zero points is an empty vector.
pub fn linspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            let mut points: Vec<f64> = (0..num).map(|i| start + step * i as f64).collect();
            points[num - 1] = end;
            points
        }
    }
}

/// Upper tail `P(Z > x)` of the standard normal distribution.
#[inline]
pub fn standard_normal_sf(x: f64) -> f64 {
    0.5 * erfc(x / std::f64::consts::SQRT_2)
}

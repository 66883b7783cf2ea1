//! Calibration of the Rec-CUSUM boundary constant.
//!
//! Under the no-change hypothesis the scaled Rec-CUSUM process converges to a
//! standard Brownian motion `W(t)` on `[0, 1]`. The boundary used by the
//! stability test is `c (1 + 2t)`, and the probability that `|W|` ever crosses
//! it has a closed form. The boundary constant for a significance level is the
//! root of that probability minus the level.

use crate::errors::{validate_open_unit_interval, HistoryError, HistoryResult};
use crate::math_utils::constants::{CALIBRATION_UPPER_BOUND, ROOT_MAX_ITER, ROOT_RTOL, ROOT_XTOL};
use crate::math_utils::standard_normal_sf;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for bracketed root finding.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootOptions {
    /// Absolute tolerance on the bracket width.
    pub xtol: f64,
    /// Relative tolerance on the bracket width.
    pub rtol: f64,
    /// Maximum number of bisection steps.
    pub max_iter: usize,
}

impl Default for RootOptions {
    fn default() -> Self {
        Self {
            xtol: ROOT_XTOL,
            rtol: ROOT_RTOL,
            max_iter: ROOT_MAX_ITER,
        }
    }
}

/// Outcome of a root search.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RootResult {
    /// Approximate root.
    pub root: f64,
    /// Function value at the root.
    pub function_value: f64,
    /// Number of bisection steps taken.
    pub iterations: usize,
    /// Width of the final bracket.
    pub bracket_width: f64,
}

/// Probability that a standard Brownian motion on `[0, 1]` crosses `x (1 + 2t)`.
///
/// `2 (Q(3x) + e^{-4x^2} - e^{-4x^2} Q(x))` with `Q` the standard normal upper
/// tail. Equals 2 at `x = 0` and decreases towards 0; NaN propagates.
///
/// # Example
/// ```rust
/// use stable_history::calibration::brownian_motion_max_p_value;
///
/// assert!((brownian_motion_max_p_value(0.0) - 2.0).abs() < 1e-15);
/// assert!(brownian_motion_max_p_value(3.0) < 1e-6);
/// ```
pub fn brownian_motion_max_p_value(x: f64) -> f64 {
    let decay = (-4.0 * x * x).exp();
    2.0 * (standard_normal_sf(3.0 * x) + decay - decay * standard_normal_sf(x))
}

/// Bisection for a root of `f` inside `[a, b]`.
///
/// # Arguments
/// * `f` - Continuous function changing sign over the bracket
/// * `a` - Left bracket endpoint
/// * `b` - Right bracket endpoint
/// * `options` - Tolerances and iteration cap
///
/// # Errors
/// * `InvalidParameter` if `a >= b`
/// * `NumericalError` if `f(a)` and `f(b)` have the same sign or the bracket
///   does not shrink below tolerance within `max_iter` steps
pub fn find_root_bracketed<F>(
    f: F,
    a: f64,
    b: f64,
    options: &RootOptions,
) -> HistoryResult<RootResult>
where
    F: Fn(f64) -> f64,
{
    if a.is_nan() || b.is_nan() || a >= b {
        return Err(HistoryError::InvalidParameter {
            parameter: "bracket".to_string(),
            value: a,
            constraint: format!("left endpoint below right endpoint {}", b),
        });
    }

    let fa = f(a);
    let fb = f(b);
    if fa == 0.0 {
        return Ok(RootResult {
            root: a,
            function_value: fa,
            iterations: 0,
            bracket_width: b - a,
        });
    }
    if fb == 0.0 {
        return Ok(RootResult {
            root: b,
            function_value: fb,
            iterations: 0,
            bracket_width: b - a,
        });
    }
    if fa.is_nan() || fb.is_nan() || (fa > 0.0) == (fb > 0.0) {
        return Err(HistoryError::NumericalError {
            reason: format!("f(a) = {} and f(b) = {} do not bracket a root", fa, fb),
            operation: Some("find_root_bracketed".to_string()),
        });
    }

    let mut left = a;
    let mut right = b;
    let mut f_left = fa;

    for iter in 0..options.max_iter {
        let mid = 0.5 * (left + right);
        let f_mid = f(mid);

        let width = right - left;
        if f_mid == 0.0 || width < options.xtol || width / mid.abs().max(1.0) < options.rtol {
            return Ok(RootResult {
                root: mid,
                function_value: f_mid,
                iterations: iter + 1,
                bracket_width: width,
            });
        }

        if (f_mid > 0.0) == (f_left > 0.0) {
            left = mid;
            f_left = f_mid;
        } else {
            right = mid;
        }
    }

    Err(HistoryError::NumericalError {
        reason: format!(
            "bisection did not converge within {} iterations (xtol {})",
            options.max_iter, options.xtol
        ),
        operation: Some("find_root_bracketed".to_string()),
    })
}

/// Boundary constant whose crossing probability equals `alpha`.
///
/// # Arguments
/// * `alpha` - Significance level, strictly inside `(0, 1)`
///
/// # Example
/// ```rust
/// use stable_history::calibration::calibrate;
///
/// let c = calibrate(0.05).unwrap();
/// assert!((c - 0.9479).abs() < 1e-3);
/// ```
pub fn calibrate(alpha: f64) -> HistoryResult<f64> {
    validate_open_unit_interval(alpha, "alpha")?;
    let result = find_root_bracketed(
        |x| brownian_motion_max_p_value(x) - alpha,
        0.0,
        CALIBRATION_UPPER_BOUND,
        &RootOptions::default(),
    )?;
    Ok(result.root)
}

//! Recursive residuals of an OLS fit over a growing window.
//!
//! Starting from an exact fit on the first `k` rows, each appended row gets a
//! standardized one-step-ahead prediction error, and the inverse normal matrix
//! and coefficients are moved forward with a rank-one (Sherman-Morrison)
//! update instead of a new factorization.
//!
//! The rank-one recurrence drifts on ill-conditioned windows, so the engine
//! starts out verifying: after every update it refits the window exactly and
//! continues from the exact values. Once a refit agrees with the recurrence on
//! a full-rank window, the engine trusts the recurrence for the rest of the
//! series and stops refitting. That switch happens at most once.

use crate::config::RecursiveResidualConfig;
use crate::errors::{validate_same_length, HistoryError, HistoryResult};
use crate::least_squares::{least_squares_with_tolerance, LeastSquaresFit};
use crate::math_utils::{default_tolerance, dot, nan_safe_dot};
use crate::matrix::Matrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Whether the engine still cross-checks the recurrence against exact refits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StabilityCheck {
    /// Refit the window after every row and continue from the exact fit.
    Verifying,
    /// Rely on the rank-one recurrence only. Terminal.
    Trusting,
}

/// How refit coefficients are compared with the recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Closeness {
    /// `mean|t - c|`, divided by `mean|t|` when that exceeds the tolerance
    /// (the relative criterion of R's `all.equal`).
    #[default]
    MeanRelative,
    /// `mean|t - c|` only (strucchangeRcpp).
    MeanAbsolute,
}

impl Closeness {
    /// True when `current` is within `tolerance` of `target`.
    ///
    /// Any NaN in either vector makes the comparison fail.
    ///
    /// # Example
    /// ```rust
    /// use stable_history::recursive_residuals::Closeness;
    ///
    /// let target = [100.0, 200.0];
    /// let current = [100.001, 200.001];
    /// // Relative error 1e-5 passes a 1e-4 tolerance, absolute error 1e-3 does not
    /// assert!(Closeness::MeanRelative.is_close(&target, &current, 1e-4));
    /// assert!(!Closeness::MeanAbsolute.is_close(&target, &current, 1e-4));
    /// ```
    pub fn is_close(self, target: &[f64], current: &[f64], tolerance: f64) -> bool {
        debug_assert_eq!(target.len(), current.len());
        if target.is_empty() {
            return true;
        }
        let len = target.len() as f64;
        let difference = target
            .iter()
            .zip(current)
            .map(|(t, c)| (t - c).abs())
            .sum::<f64>()
            / len;

        match self {
            Closeness::MeanAbsolute => difference <= tolerance,
            Closeness::MeanRelative => {
                let scale = target.iter().map(|t| t.abs()).sum::<f64>() / len;
                if scale > tolerance {
                    difference / scale <= tolerance
                } else {
                    difference <= tolerance
                }
            }
        }
    }
}

/// Residuals plus a record of how the engine got them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecursiveResiduals {
    /// Standardized residuals for rows `k..n`.
    pub residuals: Vec<f64>,
    /// Number of exact refits performed while verifying.
    pub full_refits: usize,
    /// Row whose refit confirmed the recurrence, if that ever happened.
    pub trusted_from: Option<usize>,
}

/// Running state of the recurrence.
struct RecursionState {
    /// `(X^T X)^-1` of the current window, NaN-free after every refit.
    inverse_covariance: Matrix,
    /// Coefficients of the current window, NaN-free after every refit.
    coefficients: Vec<f64>,
    stability: StabilityCheck,
    rank: usize,
}

impl RecursionState {
    fn from_fit(fit: LeastSquaresFit) -> Self {
        let mut state = Self {
            inverse_covariance: Matrix::zeros(0, 0),
            coefficients: Vec::new(),
            stability: StabilityCheck::Verifying,
            rank: 0,
        };
        state.reset_to(fit);
        state
    }

    fn reset_to(&mut self, fit: LeastSquaresFit) {
        let mut covariance = fit.covariance;
        covariance.replace_nan(0.0);
        self.inverse_covariance = covariance;
        self.coefficients = fit
            .coefficients
            .into_iter()
            .map(|b| if b.is_nan() { 0.0 } else { b })
            .collect();
        self.rank = fit.rank;
    }

    /// Standardized prediction error of `row`, then the rank-one update.
    fn advance(&mut self, row: &[f64], response: f64) -> f64 {
        let leverage_direction = self.inverse_covariance.mul_vec(row);
        let denominator = 1.0 + dot(row, &leverage_direction);
        let raw = response - nan_safe_dot(row, &self.coefficients);
        let standardized = raw / denominator.sqrt();

        let k = row.len();
        for j in 0..k {
            for i in 0..k {
                self.inverse_covariance[(i, j)] -=
                    leverage_direction[i] * leverage_direction[j] / denominator;
            }
        }
        let gain = self.inverse_covariance.mul_vec(row);
        for (b, g) in self.coefficients.iter_mut().zip(gain) {
            *b += g * raw;
        }

        standardized
    }
}

/// Recursive residuals of `y` on the rows of `x` (`n x k`).
///
/// # Arguments
/// * `x` - Regressors, one row per observation in time order
/// * `y` - Response, same length as `x` has rows
/// * `tolerance` - Closeness tolerance of the stability check, `sqrt(eps) / k` when `None`
///
/// # Returns
/// * `Ok(residuals)` - `n - k` standardized residuals (empty for `n == 0`)
/// * `Err(HistoryError::InsufficientData)` - Fewer rows than regressors
/// * `Err(HistoryError::DegenerateFit)` - A window with no informative column
///
/// # Example
/// ```rust
/// use stable_history::matrix::Matrix;
/// use stable_history::recursive_residuals::recursive_residuals;
///
/// let rows: Vec<Vec<f64>> = (0..6).map(|t| vec![1.0, t as f64]).collect();
/// let x = Matrix::from_rows(&rows).unwrap();
/// let y = [1.0, 3.0, 5.0, 7.0, 9.0, 11.0];
/// let w = recursive_residuals(&x, &y, None).unwrap();
/// assert_eq!(w.len(), 4);
/// assert!(w.iter().all(|r| r.abs() < 1e-9));
/// ```
pub fn recursive_residuals(
    x: &Matrix,
    y: &[f64],
    tolerance: Option<f64>,
) -> HistoryResult<Vec<f64>> {
    let config = RecursiveResidualConfig {
        tolerance,
        ..RecursiveResidualConfig::default()
    };
    recursive_residuals_with_config(x, y, &config).map(|result| result.residuals)
}

/// Recursive residuals with full control over tolerance and closeness.
pub fn recursive_residuals_with_config(
    x: &Matrix,
    y: &[f64],
    config: &RecursiveResidualConfig,
) -> HistoryResult<RecursiveResiduals> {
    let (n, k) = x.shape();
    validate_same_length(n, y.len(), "recursive_residuals")?;

    if n == 0 {
        return Ok(RecursiveResiduals {
            residuals: Vec::new(),
            full_refits: 0,
            trusted_from: None,
        });
    }
    if n < k {
        return Err(HistoryError::InsufficientData {
            required: k,
            actual: n,
        });
    }

    let tolerance = config.tolerance.unwrap_or_else(|| default_tolerance(k));
    let qr_tolerance = default_tolerance(k);

    let mut state = RecursionState::from_fit(least_squares_with_tolerance(
        &x.top_rows(k),
        &y[..k],
        qr_tolerance,
    )?);

    let mut residuals = Vec::with_capacity(n - k);
    let mut full_refits = 0;
    let mut trusted_from = None;

    for r in k..n {
        let previous_rank = state.rank;
        let residual = state.advance(&x.row(r), y[r]);
        residuals.push(residual);

        #[cfg(feature = "debug_logging")]
        log::trace!("row {}: recursive residual {}", r, residual);

        if state.stability == StabilityCheck::Verifying {
            let fit = least_squares_with_tolerance(&x.top_rows(r + 1), &y[..=r], qr_tolerance)?;
            full_refits += 1;

            let confirmed = fit.rank == k
                && previous_rank == k
                && !residual.is_nan()
                && config
                    .closeness
                    .is_close(&fit.coefficients, &state.coefficients, tolerance);
            if confirmed {
                state.stability = StabilityCheck::Trusting;
                trusted_from = Some(r);
                log::debug!("recurrence confirmed at row {} of {}, refits stop", r, n);
            }
            state.reset_to(fit);
        }
    }

    log::debug!("recursive residuals: {} rows, {} refits", n, full_refits);

    Ok(RecursiveResiduals {
        residuals,
        full_refits,
        trusted_from,
    })
}

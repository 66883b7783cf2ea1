//! Ordinary least squares on top of the pivoted QR factorization.
//!
//! Coefficients and covariance come back in the caller's original column
//! order. Columns the factorization excluded get a NaN coefficient and a zero
//! row and column in the covariance matrix.

use crate::errors::{validate_same_length, HistoryError, HistoryResult};
use crate::linear_algebra::QrFactorization;
use crate::math_utils::default_tolerance;
use crate::matrix::Matrix;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of a least-squares fit.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LeastSquaresFit {
    /// Coefficients in original column order, NaN for excluded columns.
    pub coefficients: Vec<f64>,
    /// `(X^T X)^-1` on the retained columns, zero elsewhere.
    pub covariance: Matrix,
    /// Numerical rank of the design.
    pub rank: usize,
    /// Triangular factor in pivoted column order.
    pub r: Matrix,
    /// Householder scaling information in pivoted column order.
    pub qraux: Vec<f64>,
    /// Column permutation applied by the factorization.
    pub pivot: Vec<usize>,
}

/// Least-squares fit of `y` on the columns of `x` with the default tolerance.
///
/// # Arguments
/// * `x` - `n x p` design, one row per observation
/// * `y` - Response of length `n`
///
/// # Returns
/// * `Ok(LeastSquaresFit)` - Coefficients, covariance and factorization details
/// * `Err(HistoryError::DegenerateFit)` - No column carries signal
///
/// # Example
/// ```rust
/// use stable_history::least_squares::least_squares;
/// use stable_history::matrix::Matrix;
///
/// let x = Matrix::from_rows(&[
///     vec![1.0, 0.0],
///     vec![1.0, 1.0],
///     vec![1.0, 2.0],
/// ]).unwrap();
/// let fit = least_squares(&x, &[1.0, 3.0, 5.0]).unwrap();
/// assert_eq!(fit.rank, 2);
/// assert!((fit.coefficients[0] - 1.0).abs() < 1e-12);
/// assert!((fit.coefficients[1] - 2.0).abs() < 1e-12);
/// ```
pub fn least_squares(x: &Matrix, y: &[f64]) -> HistoryResult<LeastSquaresFit> {
    least_squares_with_tolerance(x, y, default_tolerance(x.ncols()))
}

/// Least-squares fit with an explicit negligible-column tolerance.
///
/// R's `lm.fit` uses `1e-7`.
pub fn least_squares_with_tolerance(
    x: &Matrix,
    y: &[f64],
    tolerance: f64,
) -> HistoryResult<LeastSquaresFit> {
    validate_same_length(x.nrows(), y.len(), "least_squares")?;

    let qr = QrFactorization::with_tolerance(x, tolerance);
    let rank = qr.rank();
    if rank == 0 {
        return Err(HistoryError::DegenerateFit {
            rows: x.nrows(),
            columns: x.ncols(),
        });
    }

    let pivot = qr.pivot().to_vec();
    let pivoted = qr.solve(y)?;
    let mut coefficients = vec![f64::NAN; x.ncols()];
    for (l, &c) in pivot.iter().enumerate() {
        coefficients[c] = pivoted[l];
    }

    let r_inverse = triangular_inverse(&qr);
    let mut covariance = Matrix::zeros(x.ncols(), x.ncols());
    for a in 0..rank {
        for b in 0..rank {
            // Row a of R^-1 times row b of R^-1; R^-1 is upper triangular.
            let value: f64 = (a.max(b)..rank)
                .map(|m| r_inverse[(a, m)] * r_inverse[(b, m)])
                .sum();
            covariance[(pivot[a], pivot[b])] = value;
        }
    }

    Ok(LeastSquaresFit {
        coefficients,
        covariance,
        rank,
        r: qr.r(),
        qraux: qr.qraux().to_vec(),
        pivot,
    })
}

/// Inverse of the leading `rank x rank` block of `R`, column by column from `R C = I`.
fn triangular_inverse(qr: &QrFactorization) -> Matrix {
    let rank = qr.rank();
    let mut inverse = Matrix::zeros(rank, rank);
    let mut unit = vec![0.0; rank];
    for j in 0..rank {
        unit[j] = 1.0;
        inverse
            .column_mut(j)
            .copy_from_slice(&qr.solve_triangular(&unit));
        unit[j] = 0.0;
    }
    inverse
}

//! Rank-revealing Householder QR factorization.
//!
//! The factorization follows the limited pivoting strategy of LINPACK's
//! `dqrdc2` as used by R's `lm.fit`: columns are processed left to right and a
//! column whose remaining norm has dropped below `tol` times its original norm
//! is rotated to the trailing edge, so the leading `rank` columns of the
//! permuted matrix are the ones that carry signal. Sequential one-degree-of-
//! freedom effects keep their natural order, which is what the recursive
//! residual engine relies on when it compares fits of growing windows.
//!
//! Storage: the factored matrix keeps every column at its original physical
//! position. The logical order is the `pivot` vector (`pivot[l]` is the
//! original column at logical position `l`), and cycling a negligible column
//! only rotates that vector.

use crate::errors::{validate_same_length, HistoryResult};
use crate::math_utils::{constants::NORM_DOWNDATE_THRESHOLD, default_tolerance, dot, norm2};
use crate::matrix::Matrix;

/// Cheap Householder downdate of a trailing column norm.
///
/// After a reflection has moved `leading` into the pivot row, the norm of the
/// rest of the column is `norm * sqrt(1 - (leading / norm)^2)`. When the
/// squared reduction factor falls below [`NORM_DOWNDATE_THRESHOLD`] the
/// subtraction has cancelled most significant digits; `None` tells the caller
/// to recompute the norm from the sub-column instead.
///
/// # Example
/// ```rust
/// use stable_history::linear_algebra::downdate_column_norm;
///
/// // Column [3, 4, 12]: removing the leading 3 leaves norm sqrt(160)
/// let updated = downdate_column_norm(13.0, 3.0).unwrap();
/// assert!((updated - 160f64.sqrt()).abs() < 1e-12);
///
/// // Almost the whole norm removed: recompute
/// assert!(downdate_column_norm(1.0, 1.0).is_none());
/// ```
pub fn downdate_column_norm(norm: f64, leading: f64) -> Option<f64> {
    let ratio = leading.abs() / norm;
    let tt = (1.0 - ratio * ratio).max(0.0);
    if tt.abs() >= NORM_DOWNDATE_THRESHOLD {
        Some(norm * tt.sqrt())
    } else {
        None
    }
}

/// Pivoted QR factorization of an `n x p` matrix.
///
/// The upper triangle (in logical column order) holds `R`; below the diagonal
/// each logical column holds its Householder vector, whose leading entry is
/// kept separately in `qraux`. Only the first `min(rank, n - 1)` reflectors
/// define `Q`.
#[derive(Debug, Clone)]
pub struct QrFactorization {
    qr: Matrix,
    pivot: Vec<usize>,
    qraux: Vec<f64>,
    rank: usize,
    tolerance: f64,
}

impl QrFactorization {
    /// Factorizes a copy of `x` with the default tolerance `sqrt(eps) / p`.
    pub fn new(x: &Matrix) -> Self {
        Self::with_tolerance(x, default_tolerance(x.ncols()))
    }

    /// Factorizes a copy of `x` with an explicit negligible-column tolerance.
    pub fn with_tolerance(x: &Matrix, tolerance: f64) -> Self {
        let (n, p) = x.shape();
        let mut qr = x.clone();
        let mut pivot: Vec<usize> = (0..p).collect();
        // Indexed by physical column until the end of the factorization.
        let mut qraux = vec![0.0; p];
        let mut original_norm = vec![1.0; p];

        if n > 0 {
            for j in 0..p {
                let norm = norm2(qr.column(j));
                qraux[j] = norm;
                if norm != 0.0 {
                    original_norm[j] = norm;
                }
            }
        }

        let steps = n.min(p);
        // One past the last column not yet cycled to the trailing edge.
        let mut boundary = p + 1;

        for l in 0..steps {
            while l + 1 < boundary && qraux[pivot[l]] < original_norm[pivot[l]] * tolerance {
                let negligible = pivot.remove(l);
                pivot.push(negligible);
                boundary -= 1;
            }

            // The last row needs no reflector.
            if l + 1 == n {
                continue;
            }

            let c = pivot[l];
            let mut scale = norm2(&qr.column(c)[l..]);
            if scale == 0.0 {
                continue;
            }
            let head = qr[(l, c)];
            if head != 0.0 {
                scale = scale.abs().copysign(head);
            }

            let reflector: Vec<f64> = {
                let col = &mut qr.column_mut(c)[l..];
                for v in col.iter_mut() {
                    *v /= scale;
                }
                col[0] += 1.0;
                col.to_vec()
            };

            for &cj in &pivot[l + 1..] {
                let col = &mut qr.column_mut(cj)[l..];
                let t = -dot(&reflector, col) / reflector[0];
                for (v, &h) in col.iter_mut().zip(&reflector) {
                    *v += t * h;
                }
                if qraux[cj] != 0.0 {
                    qraux[cj] = match downdate_column_norm(qraux[cj], col[0]) {
                        Some(norm) => norm,
                        None => norm2(&col[1..]),
                    };
                }
            }

            qraux[c] = reflector[0];
            qr[(l, c)] = -scale;
        }

        let rank = (boundary - 1).min(n);
        let qraux = pivot.iter().map(|&c| qraux[c]).collect();

        Self {
            qr,
            pivot,
            qraux,
            rank,
            tolerance,
        }
    }

    /// Number of leading columns judged linearly independent.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// `pivot[l]` is the original column placed at logical position `l`.
    #[inline]
    pub fn pivot(&self) -> &[usize] {
        &self.pivot
    }

    /// Householder scaling information in logical column order.
    #[inline]
    pub fn qraux(&self) -> &[f64] {
        &self.qraux
    }

    /// Tolerance the factorization was computed with.
    #[inline]
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of observations of the factored matrix.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.qr.nrows()
    }

    /// Number of regressors of the factored matrix.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.qr.ncols()
    }

    /// Entry `(row, l)` of the factored buffer in logical column order.
    #[inline]
    fn at(&self, row: usize, l: usize) -> f64 {
        self.qr[(row, self.pivot[l])]
    }

    /// The triangular factor, `min(n, p) x p`, columns in logical order.
    pub fn r(&self) -> Matrix {
        let rows = self.nrows().min(self.ncols());
        let mut r = Matrix::zeros(rows, self.ncols());
        for l in 0..self.ncols() {
            for i in 0..rows.min(l + 1) {
                r[(i, l)] = self.at(i, l);
            }
        }
        r
    }

    fn reflector_count(&self) -> usize {
        self.rank.min(self.nrows().saturating_sub(1))
    }

    /// Applies reflector `j` to `v` in place. Reflections are their own inverse.
    fn reflect(&self, j: usize, v: &mut [f64]) {
        let scale = self.qraux[j];
        if scale == 0.0 {
            return;
        }
        let h = &self.qr.column(self.pivot[j])[j..];
        let tail = &mut v[j..];
        let s = scale * tail[0] + dot(&h[1..], &tail[1..]);
        let t = -s / scale;
        tail[0] += t * scale;
        for (x, &hi) in tail[1..].iter_mut().zip(&h[1..]) {
            *x += t * hi;
        }
    }

    fn apply_qt_in_place(&self, v: &mut [f64]) {
        for j in 0..self.reflector_count() {
            self.reflect(j, v);
        }
    }

    fn apply_q_in_place(&self, v: &mut [f64]) {
        for j in (0..self.reflector_count()).rev() {
            self.reflect(j, v);
        }
    }

    /// `Q^T y`.
    pub fn qty(&self, y: &[f64]) -> HistoryResult<Vec<f64>> {
        validate_same_length(self.nrows(), y.len(), "QrFactorization::qty")?;
        let mut out = y.to_vec();
        self.apply_qt_in_place(&mut out);
        Ok(out)
    }

    /// `Q y`.
    pub fn qy(&self, y: &[f64]) -> HistoryResult<Vec<f64>> {
        validate_same_length(self.nrows(), y.len(), "QrFactorization::qy")?;
        let mut out = y.to_vec();
        self.apply_q_in_place(&mut out);
        Ok(out)
    }

    /// Back-substitution with the leading `rank x rank` block of `R`.
    ///
    /// Only the first `rank` entries of `rhs` are read.
    pub fn solve_triangular(&self, rhs: &[f64]) -> Vec<f64> {
        let k = self.rank;
        let mut x = rhs[..k].to_vec();
        for j in (0..k).rev() {
            x[j] /= self.at(j, j);
            let t = x[j];
            for (i, xi) in x.iter_mut().enumerate().take(j) {
                *xi -= t * self.at(i, j);
            }
        }
        x
    }

    /// Least-squares coefficients in logical (pivoted) order.
    ///
    /// Entries at positions `rank..p` are NaN: those columns were excluded.
    pub fn solve(&self, y: &[f64]) -> HistoryResult<Vec<f64>> {
        let qty = self.qty(y)?;
        let mut coefficients = vec![f64::NAN; self.ncols()];
        coefficients[..self.rank].copy_from_slice(&self.solve_triangular(&qty));
        Ok(coefficients)
    }

    /// Projection of `y` onto the orthogonal complement of the retained columns.
    pub fn residuals(&self, y: &[f64]) -> HistoryResult<Vec<f64>> {
        let mut v = self.qty(y)?;
        for x in v.iter_mut().take(self.rank) {
            *x = 0.0;
        }
        self.apply_q_in_place(&mut v);
        Ok(v)
    }

    /// Projection of `y` onto the span of the retained columns.
    pub fn fitted(&self, y: &[f64]) -> HistoryResult<Vec<f64>> {
        let mut v = self.qty(y)?;
        for x in v.iter_mut().skip(self.rank) {
            *x = 0.0;
        }
        self.apply_q_in_place(&mut v);
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HistoryError;

    fn quadratic_design() -> Matrix {
        Matrix::from_rows(&[
            vec![1.0, 1.0, 1.0],
            vec![1.0, 2.0, 4.0],
            vec![1.0, 3.0, 9.0],
            vec![1.0, 4.0, 16.0],
            vec![1.0, 5.0, 25.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_downdate_matches_brute_force_above_threshold() {
        let column = [3.0, 4.0, 12.0];
        let norm = norm2(&column);
        let updated = downdate_column_norm(norm, column[0]).unwrap();
        assert!((updated - norm2(&column[1..])).abs() < 1e-12);
    }

    #[test]
    fn test_downdate_near_threshold_boundary() {
        // Squared reduction 2e-6: cheap path, still accurate
        let remaining_sq: f64 = 2e-6;
        let column = [(1.0 - remaining_sq).sqrt(), remaining_sq.sqrt()];
        let norm = norm2(&column);
        let updated = downdate_column_norm(norm, column[0]).expect("above threshold");
        let exact = norm2(&column[1..]);
        assert!(
            ((updated - exact) / exact).abs() < 1e-8,
            "downdated {} vs exact {}",
            updated,
            exact
        );

        // Squared reduction 5e-7: below threshold, must ask for recomputation
        let remaining_sq: f64 = 5e-7;
        let column = [(1.0 - remaining_sq).sqrt(), remaining_sq.sqrt()];
        assert!(downdate_column_norm(norm2(&column), column[0]).is_none());

        // Rounding pushing the leading entry above the norm clamps to zero
        assert!(downdate_column_norm(1.0, 1.0 + 1e-15).is_none());
    }

    #[test]
    fn test_full_rank_keeps_natural_order() {
        let qr = QrFactorization::new(&quadratic_design());
        assert_eq!(qr.rank(), 3);
        assert_eq!(qr.pivot(), &[0, 1, 2]);
        assert_eq!(qr.qraux().len(), 3);
    }

    #[test]
    fn test_reconstruction_x_equals_q_r() {
        let x = quadratic_design();
        let qr = QrFactorization::new(&x);
        let r = qr.r();
        let n = x.nrows();

        for l in 0..x.ncols() {
            let mut padded = vec![0.0; n];
            for i in 0..r.nrows() {
                padded[i] = r[(i, l)];
            }
            let column = qr.qy(&padded).unwrap();
            let original = x.column(qr.pivot()[l]);
            for (a, b) in column.iter().zip(original) {
                assert!((a - b).abs() < 1e-10, "column {}: {} vs {}", l, a, b);
            }
        }

        // R is upper triangular by construction
        for i in 1..r.nrows() {
            for j in 0..i {
                assert_eq!(r[(i, j)], 0.0);
            }
        }
    }

    #[test]
    fn test_zero_column_cycles_to_trailing_edge() {
        let x = Matrix::from_rows(&[
            vec![1.0, 0.0, 2.0],
            vec![1.0, 0.0, 3.0],
            vec![1.0, 0.0, 5.0],
            vec![1.0, 0.0, 7.0],
        ])
        .unwrap();
        let qr = QrFactorization::new(&x);
        assert_eq!(qr.rank(), 2);
        assert_eq!(qr.pivot(), &[0, 2, 1]);
    }

    #[test]
    fn test_collinear_column_is_detected() {
        // Column 1 is exactly twice column 0
        let x = Matrix::from_rows(&[
            vec![1.0, 2.0, 0.3],
            vec![2.0, 4.0, -1.0],
            vec![3.0, 6.0, 0.5],
            vec![4.0, 8.0, 2.0],
            vec![5.0, 10.0, -0.7],
        ])
        .unwrap();
        let qr = QrFactorization::new(&x);
        assert_eq!(qr.rank(), 2);
        assert_eq!(qr.pivot()[2], 1, "collinear column should trail");
    }

    #[test]
    fn test_rank_capped_by_rows() {
        let x = Matrix::from_rows(&[vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 7.0]]).unwrap();
        let qr = QrFactorization::new(&x);
        assert_eq!(qr.rank(), 2);
        assert_eq!(qr.r().shape(), (2, 3));
    }

    #[test]
    fn test_all_zero_matrix_has_rank_zero() {
        let qr = QrFactorization::new(&Matrix::zeros(4, 2));
        assert_eq!(qr.rank(), 0);
        let coefficients = qr.solve(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!(coefficients.iter().all(|b| b.is_nan()));
    }

    #[test]
    fn test_projections_split_response() {
        let x = quadratic_design();
        let y = [1.0, 2.3, 4.6, 3.1, 1.2];
        let qr = QrFactorization::new(&x);

        let fitted = qr.fitted(&y).unwrap();
        let residuals = qr.residuals(&y).unwrap();
        for i in 0..y.len() {
            assert!((fitted[i] + residuals[i] - y[i]).abs() < 1e-12);
        }

        // Residuals are orthogonal to every column
        for j in 0..x.ncols() {
            assert!(dot(x.column(j), &residuals).abs() < 1e-10);
        }

        // Q is orthogonal, so Q^T preserves the norm
        let qty = qr.qty(&y).unwrap();
        assert!((norm2(&qty) - norm2(&y)).abs() < 1e-12);
        let back = qr.qy(&qty).unwrap();
        for (a, b) in back.iter().zip(&y) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_solve_matches_reference_solution() {
        let qr = QrFactorization::new(&quadratic_design());
        let b = qr.solve(&[1.0, 2.3, 4.6, 3.1, 1.2]).unwrap();
        let expected = [-3.02, 4.491_428_571_428_57, -0.728_571_428_571_43];
        for (got, want) in b.iter().zip(&expected) {
            assert!((got - want).abs() < 1e-9, "got {} want {}", got, want);
        }
    }

    #[test]
    fn test_qty_rejects_wrong_length() {
        let qr = QrFactorization::new(&quadratic_design());
        assert!(matches!(
            qr.qty(&[1.0, 2.0]),
            Err(HistoryError::DimensionMismatch {
                expected: 5,
                actual: 2,
                ..
            })
        ));
    }
}

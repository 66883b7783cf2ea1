//! Dense column-major matrix used for regressor windows and factorizations.
//!
//! Columns are contiguous so Householder reflections and norm updates work on
//! plain slices. Column reordering during pivoting is expressed through a
//! separate permutation vector by the QR code; the buffer itself never moves
//! data around.

use std::ops::{Index, IndexMut};

use crate::errors::{HistoryError, HistoryResult};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Dense `nrows x ncols` matrix of `f64` stored column by column.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Matrix {
    nrows: usize,
    ncols: usize,
    data: Vec<f64>,
}

impl Matrix {
    /// Matrix of zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![0.0; nrows * ncols],
        }
    }

    /// `n x n` identity matrix.
    pub fn identity(n: usize) -> Self {
        let mut m = Self::zeros(n, n);
        for i in 0..n {
            m[(i, i)] = 1.0;
        }
        m
    }

    /// Builds a matrix from row vectors, rejecting ragged input.
    ///
    /// An empty slice yields a `0 x 0` matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> HistoryResult<Self> {
        let nrows = rows.len();
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|row| row.len() != ncols) {
            return Err(HistoryError::DimensionMismatch {
                operation: "Matrix::from_rows".to_string(),
                expected: ncols,
                actual: bad.len(),
            });
        }
        let mut m = Self::zeros(nrows, ncols);
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                m[(i, j)] = v;
            }
        }
        Ok(m)
    }

    /// Builds a matrix from a row-major buffer.
    pub fn from_row_major(nrows: usize, ncols: usize, data: &[f64]) -> HistoryResult<Self> {
        if data.len() != nrows * ncols {
            return Err(HistoryError::DimensionMismatch {
                operation: "Matrix::from_row_major".to_string(),
                expected: nrows * ncols,
                actual: data.len(),
            });
        }
        let mut m = Self::zeros(nrows, ncols);
        for i in 0..nrows {
            for j in 0..ncols {
                m[(i, j)] = data[i * ncols + j];
            }
        }
        Ok(m)
    }

    /// Wraps a column-major buffer without copying.
    pub fn from_column_major(nrows: usize, ncols: usize, data: Vec<f64>) -> HistoryResult<Self> {
        if data.len() != nrows * ncols {
            return Err(HistoryError::DimensionMismatch {
                operation: "Matrix::from_column_major".to_string(),
                expected: nrows * ncols,
                actual: data.len(),
            });
        }
        Ok(Self { nrows, ncols, data })
    }

    /// Number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// True when the matrix holds no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Entry at `(row, col)`.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self[(row, col)]
    }

    /// Overwrites the entry at `(row, col)`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self[(row, col)] = value;
    }

    /// Contiguous view of column `col`.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Mutable contiguous view of column `col`.
    #[inline]
    pub fn column_mut(&mut self, col: usize) -> &mut [f64] {
        let start = col * self.nrows;
        &mut self.data[start..start + self.nrows]
    }

    /// Copies row `row` out of the buffer.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols).map(|j| self[(row, j)]).collect()
    }

    /// The leading `count` rows as a new matrix.
    pub fn top_rows(&self, count: usize) -> Self {
        let count = count.min(self.nrows);
        let mut out = Self::zeros(count, self.ncols);
        for j in 0..self.ncols {
            out.column_mut(j).copy_from_slice(&self.column(j)[..count]);
        }
        out
    }

    /// The rows listed in `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let mut out = Self::zeros(indices.len(), self.ncols);
        for j in 0..self.ncols {
            let src = self.column(j);
            for (dst, &i) in out.column_mut(j).iter_mut().zip(indices) {
                *dst = src[i];
            }
        }
        out
    }

    /// Transposed copy.
    pub fn transpose(&self) -> Self {
        let mut out = Self::zeros(self.ncols, self.nrows);
        for j in 0..self.ncols {
            for (i, &v) in self.column(j).iter().enumerate() {
                out[(j, i)] = v;
            }
        }
        out
    }

    /// Copy with the column order reversed.
    ///
    /// For a `k x n` regressor matrix whose columns are time steps this is the
    /// time-reversed design.
    pub fn reverse_columns(&self) -> Self {
        let mut out = Self::zeros(self.nrows, self.ncols);
        for j in 0..self.ncols {
            let target = self.ncols - 1 - j;
            out.column_mut(target).copy_from_slice(self.column(j));
        }
        out
    }

    /// Matrix-vector product `self * v`.
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.ncols);
        let mut out = vec![0.0; self.nrows];
        for (j, &vj) in v.iter().enumerate() {
            for (o, &a) in out.iter_mut().zip(self.column(j)) {
                *o += a * vj;
            }
        }
        out
    }

    /// Replaces every NaN entry with `value`.
    pub fn replace_nan(&mut self, value: f64) {
        for v in self.data.iter_mut().filter(|v| v.is_nan()) {
            *v = value;
        }
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(row < self.nrows && col < self.ncols);
        &self.data[col * self.nrows + row]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(row < self.nrows && col < self.ncols);
        &mut self.data[col * self.nrows + row]
    }
}

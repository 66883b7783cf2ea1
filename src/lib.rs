//! # Stable History
//!
//! Locates the stable history of a linear time-series model: the earliest
//! observation from which the regression on a fixed set of regressors (trend,
//! harmonics, ...) fits without a structural break. This is the history
//! selection step of BFAST-style disturbance monitoring.
//!
//! The work happens in two layers:
//!
//! - **Recursive residuals**: standardized one-step-ahead prediction errors of
//!   an OLS fit as observations are appended one at a time, computed with a
//!   rank-one recurrence that is cross-checked against exact pivoted-QR refits
//!   until the two agree.
//! - **Rec-CUSUM test**: the cumulative sum of those residuals on the
//!   time-reversed series, compared against the linear boundary `c (1 + 2t)`
//!   with a Brownian-motion crossing p-value. The first boundary crossing marks
//!   where the stable history starts.
//!
//! ## Quick Start
//!
//! ```rust
//! use stable_history::{history_roc_batch, HistoryConfig, Matrix};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let n = 80;
//!     // Intercept and trend, one row per time step
//!     let rows: Vec<Vec<f64>> = (0..n).map(|t| vec![1.0, t as f64 / n as f64]).collect();
//!     let x = Matrix::from_rows(&rows)?;
//!
//!     // A series whose level dropped at t = 40
//!     let y: Vec<f64> = (0..n)
//!         .map(|t| 0.05 * (t as f64 * 2.3).sin() + if t < 40 { 2.0 } else { 0.0 })
//!         .collect();
//!
//!     let config = HistoryConfig::new(0.05)?;
//!     let starts = history_roc_batch(&x, &[y], &config);
//!     let start = starts[0].clone()?;
//!     assert!(start > 0 && start <= 40);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! [`linear_algebra::QrFactorization`] implements the limited-pivoting
//! Householder QR used by R's `lm.fit`; [`least_squares`] builds coefficients
//! and covariance on it; [`recursive_residuals`] runs the residual recurrence;
//! [`calibration`] inverts the Brownian-motion crossing probability; and
//! [`statistical_tests`] combines them into the boundary test. [`batch_testing`]
//! applies the test to many series sharing one regressor matrix.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod config;
pub mod errors;
pub mod linear_algebra;
pub mod math_utils;
pub mod matrix;
pub mod preprocessing;

// Estimation and testing
pub mod batch_testing;
pub mod calibration;
pub mod least_squares;
pub mod recursive_residuals;

// Re-exports for convenience - main public API
pub use config::{HistoryConfig, RecursiveResidualConfig};
pub use errors::{HistoryError, HistoryResult};
pub use matrix::Matrix;

// Factorization and fitting exports
pub use least_squares::{least_squares, least_squares_with_tolerance, LeastSquaresFit};
pub use linear_algebra::{downdate_column_norm, QrFactorization};

// Recursive residual exports
pub use recursive_residuals::{
    recursive_residuals, recursive_residuals_with_config, Closeness, RecursiveResiduals,
    StabilityCheck,
};

// Calibration exports
pub use calibration::{
    brownian_motion_max_p_value, calibrate, find_root_bracketed, RootOptions, RootResult,
};

// Boundary test exports
pub use statistical_tests::{
    history_boundary, history_roc, history_roc_diagnostics, history_roc_with_config,
    linear_boundary, recursive_cusum, structural_change_p_value, FluctuationProcess,
    HistoryDiagnostics,
};

// Batch and preprocessing exports
pub use batch_testing::{history_roc_batch, history_roc_series};
pub use preprocessing::{drop_missing, finite_row_indices};

//! # Test Configuration
//!
//! Configuration structures for the recursive residual engine and the
//! stable-history boundary test. The boundary constant is calibrated once when
//! a [`HistoryConfig`] is built and then travels with it, so batches of series
//! never recalibrate.

use crate::calibration::calibrate;
use crate::errors::{validate_open_unit_interval, validate_parameter, HistoryResult};
use crate::math_utils::constants::DEFAULT_ALPHA;
use crate::recursive_residuals::Closeness;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration of the recursive residual engine
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RecursiveResidualConfig {
    /// Closeness tolerance of the stability check, `sqrt(eps) / k` when `None`
    pub tolerance: Option<f64>,
    /// Comparison of refit coefficients against the recurrence
    pub closeness: Closeness,
}

impl RecursiveResidualConfig {
    /// Relative closeness check (R `strucchange`), the default
    pub fn relative() -> Self {
        Self::default()
    }

    /// Absolute closeness check (`strucchangeRcpp`)
    pub fn absolute() -> Self {
        Self {
            tolerance: None,
            closeness: Closeness::MeanAbsolute,
        }
    }
}

/// Configuration of the stable-history boundary test
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryConfig {
    /// Significance level of the structural-change test
    pub alpha: f64,
    /// Boundary constant matching `alpha`
    pub confidence: f64,
    /// Recursive residual settings
    pub residuals: RecursiveResidualConfig,
}

impl HistoryConfig {
    /// Configuration for significance level `alpha`, calibrating the boundary constant.
    ///
    /// # Example
    /// ```rust
    /// use stable_history::config::HistoryConfig;
    ///
    /// let config = HistoryConfig::new(0.05).unwrap();
    /// assert!((config.confidence - 0.9479).abs() < 1e-3);
    /// assert!(HistoryConfig::new(1.0).is_err());
    /// ```
    pub fn new(alpha: f64) -> HistoryResult<Self> {
        let confidence = calibrate(alpha)?;
        Ok(Self {
            alpha,
            confidence,
            residuals: RecursiveResidualConfig::default(),
        })
    }

    /// Standard configuration: `alpha = 0.05`
    pub fn standard() -> HistoryResult<Self> {
        Self::new(DEFAULT_ALPHA)
    }

    /// Configuration with a boundary constant calibrated elsewhere.
    pub fn with_confidence(alpha: f64, confidence: f64) -> HistoryResult<Self> {
        validate_open_unit_interval(alpha, "alpha")?;
        validate_parameter(confidence, 0.0, f64::MAX, "confidence")?;
        Ok(Self {
            alpha,
            confidence,
            residuals: RecursiveResidualConfig::default(),
        })
    }

    /// Overrides the closeness tolerance of the residual engine
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.residuals.tolerance = Some(tolerance);
        self
    }

    /// Overrides the closeness criterion of the residual engine
    pub fn with_closeness(mut self, closeness: Closeness) -> Self {
        self.residuals.closeness = closeness;
        self
    }
}

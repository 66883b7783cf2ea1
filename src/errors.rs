//! Error types and validation functions for the stable-history engine.
//!
//! Numerical trouble inside a series (near-zero leverage denominators, NaN
//! statistics) is not an error here: it flows through as NaN residuals or a
//! NaN p-value and the boundary test reports the series as stable. Errors are
//! reserved for inputs that cannot be processed at all and for windows where
//! no regressor carries signal.

use thiserror::Error;

/// Error conditions raised by the factorization, residual and boundary code.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum HistoryError {
    /// A least-squares window in which every column was judged negligible.
    #[error("Degenerate fit: no columns carry signal in a {rows}x{columns} window")]
    DegenerateFit {
        /// Number of observations in the window
        rows: usize,
        /// Number of regressors in the window
        columns: usize,
    },

    /// Two inputs that must be aligned have different sizes.
    #[error("Dimension mismatch in {operation}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Operation that detected the mismatch
        operation: String,
        /// Size implied by the first operand
        expected: usize,
        /// Size actually provided
        actual: usize,
    },

    /// Fewer observations than the operation needs.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData {
        /// Minimum required data points
        required: usize,
        /// Actual number of data points provided
        actual: usize,
    },

    /// Parameter outside its admissible range.
    #[error("Invalid parameter: {parameter} = {value}, expected {constraint}")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value provided
        value: f64,
        /// Valid range or constraint description
        constraint: String,
    },

    /// Numerical procedure that could not produce a result (e.g. root bracketing).
    #[error("Numerical computation failed: {reason}")]
    NumericalError {
        /// Detailed reason for numerical failure
        reason: String,
        /// Operation that failed
        operation: Option<String>,
    },
}

/// Result type for stable-history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Validates that a parameter lies in the closed interval `[min, max]`.
///
/// # Arguments
/// * `value` - Parameter value to validate
/// * `min` - Minimum acceptable value (inclusive)
/// * `max` - Maximum acceptable value (inclusive)
/// * `name` - Parameter name for error reporting
///
/// # Example
/// ```rust
/// use stable_history::errors::validate_parameter;
///
/// assert!(validate_parameter(0.5, 0.0, 1.0, "alpha").is_ok());
/// assert!(validate_parameter(1.5, 0.0, 1.0, "alpha").is_err());
/// ```
pub fn validate_parameter(value: f64, min: f64, max: f64, name: &str) -> HistoryResult<()> {
    if value.is_nan() {
        return Err(HistoryError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "must not be NaN".to_string(),
        });
    }

    if min.is_nan() || max.is_nan() || min > max {
        return Err(HistoryError::NumericalError {
            reason: format!(
                "Invalid bounds for parameter {}: min={}, max={}",
                name, min, max
            ),
            operation: None,
        });
    }

    if value < min || value > max {
        Err(HistoryError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: format!("[{}, {}]", min, max),
        })
    } else {
        Ok(())
    }
}

/// Validates that a parameter lies strictly inside `(0, 1)`.
///
/// Significance levels must exclude both endpoints: the calibration root does
/// not exist for `alpha = 0` or `alpha = 1`.
///
/// # Example
/// ```rust
/// use stable_history::errors::validate_open_unit_interval;
///
/// assert!(validate_open_unit_interval(0.05, "alpha").is_ok());
/// assert!(validate_open_unit_interval(0.0, "alpha").is_err());
/// assert!(validate_open_unit_interval(1.0, "alpha").is_err());
/// ```
pub fn validate_open_unit_interval(value: f64, name: &str) -> HistoryResult<()> {
    if value.is_nan() || value <= 0.0 || value >= 1.0 {
        return Err(HistoryError::InvalidParameter {
            parameter: name.to_string(),
            value,
            constraint: "(0, 1)".to_string(),
        });
    }
    Ok(())
}

/// Validates that two aligned inputs have the same length.
///
/// # Arguments
/// * `expected` - Length of the reference operand (e.g. regressor rows)
/// * `actual` - Length of the operand that must match (e.g. response length)
/// * `operation` - Name of the operation for error reporting
pub fn validate_same_length(expected: usize, actual: usize, operation: &str) -> HistoryResult<()> {
    if expected != actual {
        return Err(HistoryError::DimensionMismatch {
            operation: operation.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_parameter_valid_range() {
        assert!(validate_parameter(0.5, 0.0, 1.0, "alpha").is_ok());
        // Endpoints are inclusive
        assert!(validate_parameter(0.0, 0.0, 1.0, "alpha").is_ok());
        assert!(validate_parameter(1.0, 0.0, 1.0, "alpha").is_ok());
    }

    #[test]
    fn test_validate_parameter_out_of_range() {
        match validate_parameter(1.5, 0.0, 1.0, "alpha") {
            Err(HistoryError::InvalidParameter {
                parameter, value, ..
            }) => {
                assert_eq!(parameter, "alpha");
                assert_eq!(value, 1.5);
            }
            other => panic!("Expected InvalidParameter error, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_parameter_nan_value_and_bounds() {
        assert!(matches!(
            validate_parameter(f64::NAN, 0.0, 1.0, "alpha"),
            Err(HistoryError::InvalidParameter { .. })
        ));
        assert!(matches!(
            validate_parameter(0.5, 1.0, 0.0, "alpha"),
            Err(HistoryError::NumericalError { .. })
        ));
    }

    #[test]
    fn test_validate_open_unit_interval_excludes_endpoints() {
        assert!(validate_open_unit_interval(1e-9, "alpha").is_ok());
        assert!(validate_open_unit_interval(0.999, "alpha").is_ok());
        assert!(validate_open_unit_interval(0.0, "alpha").is_err());
        assert!(validate_open_unit_interval(1.0, "alpha").is_err());
        assert!(validate_open_unit_interval(f64::NAN, "alpha").is_err());
    }

    #[test]
    fn test_validate_same_length_reports_sizes() {
        assert!(validate_same_length(4, 4, "fit").is_ok());
        match validate_same_length(4, 3, "fit") {
            Err(HistoryError::DimensionMismatch {
                operation,
                expected,
                actual,
            }) => {
                assert_eq!(operation, "fit");
                assert_eq!(expected, 4);
                assert_eq!(actual, 3);
            }
            other => panic!("Expected DimensionMismatch error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_display_embeds_payload() {
        let err = HistoryError::DegenerateFit {
            rows: 3,
            columns: 2,
        };
        assert!(err.to_string().contains("3x2"));

        let err = HistoryError::InsufficientData {
            required: 5,
            actual: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('5') && msg.contains('2'), "Got: {}", msg);
    }
}

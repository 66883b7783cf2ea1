//! Stable-history tests over many series that share one regressor matrix.
//!
//! Every pixel of an image stack, or every sensor of a network, is an
//! independent series observed at the same time steps. The series are tested
//! independently: one failing series produces its own error entry and leaves
//! the rest of the batch untouched. With the `parallel` feature the series are
//! spread over the rayon thread pool; results keep the input order either way.

use crate::config::HistoryConfig;
use crate::errors::HistoryResult;
use crate::matrix::Matrix;
use crate::preprocessing::drop_missing;
use crate::statistical_tests::history_roc_with_config;

/// Stable-history start of a single series against the shared `n x k` regressors.
///
/// Missing responses are dropped together with their regressor rows first.
pub fn history_roc_series(x: &Matrix, y: &[f64], config: &HistoryConfig) -> HistoryResult<usize> {
    let (x_kept, y_kept) = drop_missing(x, y)?;
    history_roc_with_config(&x_kept.transpose(), &y_kept, config)
}

/// Stable-history start of every series in `series`.
///
/// # Arguments
/// * `x` - `n x k` regressors shared by all series, one row per time step
/// * `series` - Responses of length `n`, NaN marking missing observations
/// * `config` - Significance level, boundary constant and residual settings
///
/// # Returns
/// One entry per series, in input order.
///
/// # Example
/// ```rust
/// use stable_history::batch_testing::history_roc_batch;
/// use stable_history::config::HistoryConfig;
/// use stable_history::matrix::Matrix;
///
/// let n = 30;
/// let rows: Vec<Vec<f64>> = (0..n).map(|_| vec![1.0]).collect();
/// let x = Matrix::from_rows(&rows).unwrap();
/// let quiet: Vec<f64> = (0..n).map(|t| 0.1 * (t as f64 * 1.7).sin()).collect();
/// let config = HistoryConfig::standard().unwrap();
///
/// let results = history_roc_batch(&x, &[quiet, vec![1.0; 3]], &config);
/// assert_eq!(results[0], Ok(0));
/// assert!(results[1].is_err());
/// ```
pub fn history_roc_batch(
    x: &Matrix,
    series: &[Vec<f64>],
    config: &HistoryConfig,
) -> Vec<HistoryResult<usize>> {
    let results: Vec<HistoryResult<usize>>;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        results = series
            .par_iter()
            .map(|y| history_roc_series(x, y, config))
            .collect();
    }

    #[cfg(not(feature = "parallel"))]
    {
        results = series
            .iter()
            .map(|y| history_roc_series(x, y, config))
            .collect();
    }

    let mut failed = 0;
    for (index, result) in results.iter().enumerate() {
        if let Err(e) = result {
            log::warn!("Series {} failed during batch stability test: {}", index, e);
            failed += 1;
        }
    }
    if failed > 0 {
        log::warn!(
            "{} of {} series failed during batch stability test",
            failed,
            series.len()
        );
    }

    results
}

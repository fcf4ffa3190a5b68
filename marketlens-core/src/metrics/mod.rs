//! Derived-metrics engine.
//!
//! Everything here is a pure function of its input values. Missing entries
//! are dropped before computing unless a function says otherwise; an empty
//! input yields an empty output, never an error.
//!
//! Windowed transforms implement [`Derivation`] so they can be appended to a
//! [`SeriesTable`](crate::domain::SeriesTable) via `derive`.

pub mod ewm;
pub mod format;
pub mod liquidity;
pub mod pct_change;
pub mod ratio;
pub mod returns;
pub mod rsi;
pub mod sentiment;
pub mod sma;
pub mod summary;

pub use ewm::ewm_mean;
pub use format::big_number;
pub use liquidity::{liquidity_index, ScaledSeries, Unit, LIQUIDITY_COLUMN};
pub use pct_change::{pct_change, PctChange};
pub use ratio::{ratio, ratio_series};
pub use returns::{returns, Returns, ThirtyDayBasis};
pub use rsi::{Rsi, RsiSmoothing};
pub use sentiment::SentimentRating;
pub use sma::{moving_average, MovingAverage};
pub use summary::{summarize, value_range, SeriesSummary};

use crate::domain::TimeSeries;

/// A windowed transform over one dense column of values.
///
/// `compute` returns one entry per input value; the first `lookback()`
/// entries (at least) are `None`.
pub trait Derivation: Send + Sync {
    /// Column name the result is published under.
    fn name(&self) -> &str;

    /// Number of leading positions that can never be defined.
    fn lookback(&self) -> usize;

    fn compute(&self, values: &[f64]) -> Vec<Option<f64>>;
}

/// Apply `derivation` to a series, keeping only the defined points.
pub fn derive_series(series: &TimeSeries, derivation: &dyn Derivation) -> TimeSeries {
    let computed = derivation.compute(&series.values());
    TimeSeries::from_unsorted(
        series
            .iter()
            .zip(computed)
            .filter_map(|(p, v)| v.map(|v| crate::domain::Observation::new(p.date, v)))
            .collect(),
    )
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for metric tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;

/// Consecutive daily series starting 2024-01-02, for tests.
#[cfg(test)]
pub fn make_series(values: &[f64]) -> TimeSeries {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    TimeSeries::from_pairs(
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| (base + chrono::Duration::days(i as i64), v)),
    )
    .unwrap()
}

//! Elementwise ratios of aligned columns.

use crate::domain::{Observation, TimeSeries};

/// `numerator / denominator` position by position.
///
/// `None` where either side is missing or the denominator is zero. Inputs
/// are expected to share one index; extra trailing positions are ignored.
pub fn ratio(numerator: &[Option<f64>], denominator: &[Option<f64>]) -> Vec<Option<f64>> {
    numerator
        .iter()
        .zip(denominator)
        .map(|(n, d)| match (n, d) {
            (Some(n), Some(d)) if *d != 0.0 => Some(n / d),
            _ => None,
        })
        .collect()
}

/// Ratio over the dates both series observe.
pub fn ratio_series(numerator: &TimeSeries, denominator: &TimeSeries) -> TimeSeries {
    TimeSeries::from_unsorted(
        numerator
            .iter()
            .filter_map(|p| {
                let d = denominator.value_at(p.date)?;
                (d != 0.0).then(|| Observation::new(p.date, p.value / d))
            })
            .collect(),
    )
}

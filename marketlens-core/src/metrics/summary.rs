//! Headline statistics for a series.

use crate::domain::{DateRange, TimeSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub latest_value: f64,
    pub latest_date: NaiveDate,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub count: usize,
}

/// Latest observation plus mean/min/max. Empty series → `None`.
pub fn summarize(series: &TimeSeries) -> Option<SeriesSummary> {
    let latest = series.last()?;
    let (min, max) = min_max(series)?;
    let sum: f64 = series.iter().map(|p| p.value).sum();
    Some(SeriesSummary {
        latest_value: latest.value,
        latest_date: latest.date,
        mean: sum / series.len() as f64,
        min,
        max,
        count: series.len(),
    })
}

/// Min and max inside `range` (chart zoom bounds). No points → `None`.
pub fn value_range(series: &TimeSeries, range: &DateRange) -> Option<(f64, f64)> {
    min_max(&series.between(range))
}

fn min_max(series: &TimeSeries) -> Option<(f64, f64)> {
    series.iter().fold(None, |acc, p| match acc {
        None => Some((p.value, p.value)),
        Some((lo, hi)) => Some((f64::min(lo, p.value), f64::max(hi, p.value))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{assert_approx, make_series, DEFAULT_EPSILON};

    #[test]
    fn summary_of_series() {
        let s = make_series(&[3.0, 1.0, 4.0, 1.0, 5.0]);
        let sum = summarize(&s).unwrap();
        assert_eq!(sum.latest_value, 5.0);
        assert_eq!(sum.latest_date, s.last().unwrap().date);
        assert_approx(sum.mean, 2.8, DEFAULT_EPSILON);
        assert_eq!((sum.min, sum.max, sum.count), (1.0, 5.0, 5));
    }

    #[test]
    fn empty_has_no_summary() {
        assert!(summarize(&TimeSeries::empty()).is_none());
    }

    #[test]
    fn zoom_range_bounds() {
        let s = make_series(&[10.0, 2.0, 8.0, 6.0]);
        let dates = s.dates();
        let range = DateRange::new(dates[2], dates[3]).unwrap();
        assert_eq!(value_range(&s, &range), Some((6.0, 8.0)));

        let later = DateRange::new(dates[3] + chrono::Duration::days(1), dates[3] + chrono::Duration::days(9)).unwrap();
        assert_eq!(value_range(&s, &later), None);
    }
}

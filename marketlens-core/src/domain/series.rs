//! TimeSeries — ordered daily observations on a naive calendar.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single dated value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

impl Observation {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Errors raised when constructing series or ranges.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SeriesError {
    #[error("dates must be strictly increasing: {date} follows {previous}")]
    Unordered { previous: NaiveDate, date: NaiveDate },

    #[error("non-finite value {value} at {date}")]
    NonFinite { date: NaiveDate, value: f64 },

    #[error("inverted date range: {start} is after {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Inclusive calendar range used for provider requests and zoom windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SeriesError> {
        if start > end {
            return Err(SeriesError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Ordered sequence of daily observations.
///
/// Dates are strictly increasing and every value is finite. Gaps (weekends,
/// holidays, outages) are simply absent dates; a `TimeSeries` never carries a
/// "missing" marker. Missing positions only appear once series are aligned
/// into a [`SeriesTable`](super::SeriesTable).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    points: Vec<Observation>,
}

impl TimeSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from already-ordered observations, rejecting disorder and NaN/inf.
    pub fn new(points: Vec<Observation>) -> Result<Self, SeriesError> {
        for (i, obs) in points.iter().enumerate() {
            if !obs.value.is_finite() {
                return Err(SeriesError::NonFinite {
                    date: obs.date,
                    value: obs.value,
                });
            }
            if i > 0 && points[i - 1].date >= obs.date {
                return Err(SeriesError::Unordered {
                    previous: points[i - 1].date,
                    date: obs.date,
                });
            }
        }
        Ok(Self { points })
    }

    /// Build from `(date, value)` pairs that are already ordered.
    pub fn from_pairs(
        pairs: impl IntoIterator<Item = (NaiveDate, f64)>,
    ) -> Result<Self, SeriesError> {
        Self::new(
            pairs
                .into_iter()
                .map(|(date, value)| Observation::new(date, value))
                .collect(),
        )
    }

    /// Sort, drop non-finite values and collapse duplicate dates (last write wins).
    pub fn from_unsorted(mut points: Vec<Observation>) -> Self {
        points.retain(|p| p.value.is_finite());
        points.sort_by_key(|p| p.date);

        let mut deduped: Vec<Observation> = Vec::with_capacity(points.len());
        for obs in points {
            match deduped.last_mut() {
                Some(last) if last.date == obs.date => *last = obs,
                _ => deduped.push(obs),
            }
        }
        Self { points: deduped }
    }

    /// Build from provider rows that may contain missing values.
    ///
    /// Interior gaps are forward-filled from the previous observation.
    /// Leading missing rows are dropped (nothing to carry forward) and rows
    /// after the last real observation are dropped, so no value is ever
    /// fabricated past the latest data point.
    pub fn from_sparse(rows: Vec<(NaiveDate, Option<f64>)>) -> Self {
        let mut rows = rows;
        rows.sort_by_key(|(date, _)| *date);

        let clean = |v: Option<f64>| v.filter(|x| x.is_finite());
        let last_known = match rows.iter().rposition(|(_, v)| clean(*v).is_some()) {
            Some(i) => i,
            None => return Self::empty(),
        };
        rows.truncate(last_known + 1);

        let mut points: Vec<Observation> = Vec::with_capacity(rows.len());
        let mut carry: Option<f64> = None;
        for (date, value) in rows {
            if let Some(v) = clean(value) {
                carry = Some(v);
            }
            if let Some(v) = carry {
                match points.last_mut() {
                    Some(last) if last.date == date => {
                        // Duplicate date: a real value replaces a filled one.
                        if clean(value).is_some() {
                            last.value = v;
                        }
                    }
                    _ => points.push(Observation::new(date, v)),
                }
            }
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &Observation> {
        self.points.iter()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn first(&self) -> Option<&Observation> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Observation> {
        self.points.last()
    }

    /// Value observed on exactly `date`, if any.
    pub fn value_at(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .map(|i| self.points[i].value)
    }

    /// Observations inside `range` (inclusive).
    pub fn between(&self, range: &DateRange) -> Self {
        Self {
            points: self
                .points
                .iter()
                .filter(|p| range.contains(p.date))
                .copied()
                .collect(),
        }
    }

    /// Multiply every value by `factor` (unit conversion).
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_unsorted(
            self.points
                .iter()
                .map(|p| Observation::new(p.date, p.value * factor))
                .collect(),
        )
    }
}

//! Static recession intervals used to shade charts.

use super::series::TimeSeries;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Interval {
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && start <= self.end
    }
}

// US recessions (NBER peak month to trough month) since 1980.
const RECESSIONS: [((i32, u32, u32), (i32, u32, u32)); 6] = [
    ((1980, 1, 1), (1980, 7, 1)),
    ((1981, 7, 1), (1982, 11, 1)),
    ((1990, 7, 1), (1991, 3, 1)),
    ((2001, 3, 1), (2001, 11, 1)),
    ((2007, 12, 1), (2009, 6, 1)),
    ((2020, 2, 1), (2020, 4, 1)),
];

/// All recession intervals, oldest first.
pub fn recessions() -> Vec<Interval> {
    RECESSIONS
        .iter()
        .filter_map(|&((sy, sm, sd), (ey, em, ed))| {
            Some(Interval {
                start: NaiveDate::from_ymd_opt(sy, sm, sd)?,
                end: NaiveDate::from_ymd_opt(ey, em, ed)?,
            })
        })
        .collect()
}

/// Recessions overlapping `start..=end`.
pub fn recessions_between(start: NaiveDate, end: NaiveDate) -> Vec<Interval> {
    recessions()
        .into_iter()
        .filter(|r| r.overlaps(start, end))
        .collect()
}

/// Recessions that overlap the span of `series`. Empty series → none.
pub fn recessions_within(series: &TimeSeries) -> Vec<Interval> {
    match (series.first(), series.last()) {
        (Some(first), Some(last)) => recessions_between(first.date, last.date),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_ordered_and_well_formed() {
        let all = recessions();
        assert_eq!(all.len(), RECESSIONS.len());
        for r in &all {
            assert!(r.start < r.end);
        }
        for w in all.windows(2) {
            assert!(w[0].end < w[1].start);
        }
    }

    #[test]
    fn filters_to_series_span() {
        let series = TimeSeries::from_pairs([
            (NaiveDate::from_ymd_opt(2005, 1, 3).unwrap(), 1.0),
            (NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(), 2.0),
        ])
        .unwrap();
        let hits = recessions_within(&series);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].start, NaiveDate::from_ymd_opt(2007, 12, 1).unwrap());
        assert!(recessions_within(&TimeSeries::empty()).is_empty());
    }

    #[test]
    fn bounds_are_inclusive() {
        let covid_start = NaiveDate::from_ymd_opt(2020, 2, 1).unwrap();
        let hits = recessions_between(NaiveDate::from_ymd_opt(2019, 6, 3).unwrap(), covid_start);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start, covid_start);
        assert!(recessions_between(
            NaiveDate::from_ymd_opt(2021, 1, 4).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 29).unwrap()
        )
        .is_empty());
    }
}

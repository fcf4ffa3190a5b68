//! Domain types: series, tables, overlays.

pub mod overlay;
pub mod series;
pub mod table;

pub use overlay::{recessions, recessions_between, recessions_within, Interval};
pub use series::{DateRange, Observation, SeriesError, TimeSeries};
pub use table::{Column, SeriesTable, TableError};

/// Either a single named series or a whole table.
///
/// Transforms never branch on the shape at runtime; they call
/// [`SeriesData::into_table`] and work on the table form.
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesData {
    Series { name: String, series: TimeSeries },
    Table(SeriesTable),
}

impl SeriesData {
    pub fn series(name: impl Into<String>, series: TimeSeries) -> Self {
        Self::Series {
            name: name.into(),
            series,
        }
    }

    /// Canonical table form.
    pub fn into_table(self) -> SeriesTable {
        match self {
            Self::Series { name, series } => SeriesTable::from_series(&name, &series),
            Self::Table(table) => table,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Series { series, .. } => series.is_empty(),
            Self::Table(table) => table.is_empty(),
        }
    }
}

impl From<SeriesTable> for SeriesData {
    fn from(table: SeriesTable) -> Self {
        Self::Table(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn series_variant_becomes_single_column_table() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let data = SeriesData::series("VIX", TimeSeries::from_pairs([(date, 13.5)]).unwrap());
        let table = data.into_table();
        assert_eq!(table.column_names(), vec!["VIX"]);
        assert_eq!(table.column("VIX").unwrap(), &[Some(13.5)]);
    }

    #[test]
    fn empty_detection_covers_both_shapes() {
        assert!(SeriesData::series("x", TimeSeries::empty()).is_empty());
        assert!(SeriesData::from(SeriesTable::default()).is_empty());
    }
}

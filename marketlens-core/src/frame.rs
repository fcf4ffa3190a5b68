//! Polars interop for presentation and export.
//!
//! A [`SeriesTable`] becomes a `DataFrame` with a `date` column (polars
//! `Date`) followed by one nullable `f64` column per series.

use crate::domain::SeriesTable;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

/// `num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

fn epoch_days(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Convert a table into a DataFrame. Missing values become nulls.
pub fn to_dataframe(table: &SeriesTable) -> PolarsResult<DataFrame> {
    let dates: Vec<i32> = table.index().iter().map(|d| epoch_days(*d)).collect();
    let mut columns = Vec::with_capacity(table.width() + 1);
    columns.push(Column::new("date".into(), dates).cast(&DataType::Date)?);
    for column in table.columns() {
        columns.push(Column::new(column.name.as_str().into(), column.values.clone()));
    }
    DataFrame::new(columns)
}

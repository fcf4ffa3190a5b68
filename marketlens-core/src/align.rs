//! Multi-series time alignment.
//!
//! Named series are joined onto one shared date index. Positions a series
//! does not cover are `None`; merging never fills. Forward fill and dropping
//! incomplete rows are separate, explicit steps on [`SeriesTable`].

use crate::domain::{SeriesTable, TableError, TimeSeries};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Which dates make up the merged index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinKind {
    /// Union of every input's dates.
    #[default]
    Outer,
    /// Dates of the first input only.
    Left,
}

fn build_index<'a>(
    kind: JoinKind,
    mut indices: impl Iterator<Item = &'a [NaiveDate]>,
) -> Vec<NaiveDate> {
    match kind {
        JoinKind::Outer => {
            let mut all = BTreeSet::new();
            for index in indices {
                all.extend(index.iter().copied());
            }
            all.into_iter().collect()
        }
        JoinKind::Left => indices.next().map(<[NaiveDate]>::to_vec).unwrap_or_default(),
    }
}

fn reindex(
    index: &[NaiveDate],
    dates: &[NaiveDate],
    values: impl Iterator<Item = Option<f64>>,
) -> Vec<Option<f64>> {
    let lookup: HashMap<NaiveDate, Option<f64>> = dates.iter().copied().zip(values).collect();
    index
        .iter()
        .map(|d| lookup.get(d).copied().flatten())
        .collect()
}

/// Align named series into one table.
///
/// Column order follows input order. Duplicate names are rejected. An empty
/// input list yields an empty table.
pub fn merge(inputs: &[(&str, &TimeSeries)], kind: JoinKind) -> Result<SeriesTable, TableError> {
    let dates: Vec<Vec<NaiveDate>> = inputs.iter().map(|(_, s)| s.dates()).collect();
    let index = build_index(kind, dates.iter().map(Vec::as_slice));

    let mut table = SeriesTable::new(index)?;
    for ((name, series), series_dates) in inputs.iter().zip(&dates) {
        let values = reindex(
            table.index(),
            series_dates,
            series.iter().map(|p| Some(p.value)),
        );
        table.push_column(*name, values)?;
    }
    Ok(table)
}

/// Join two tables. `Left` keeps `left`'s index; `Outer` takes the union.
pub fn join(
    left: &SeriesTable,
    right: &SeriesTable,
    kind: JoinKind,
) -> Result<SeriesTable, TableError> {
    let index = build_index(kind, [left.index(), right.index()].into_iter());
    let mut table = SeriesTable::new(index)?;
    for source in [left, right] {
        for column in source.columns() {
            let values = reindex(table.index(), source.index(), column.values.iter().copied());
            table.push_column(column.name.clone(), values)?;
        }
    }
    Ok(table)
}

//! SeriesTable — named columns aligned on one shared date index.

use super::series::{DateRange, Observation, TimeSeries};
use crate::metrics::Derivation;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from table construction and column access.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TableError {
    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    #[error("column '{column}' has {actual} rows, index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("table index must be strictly increasing")]
    UnorderedIndex,
}

/// One named column. `None` is the explicit "no value" marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Mapping from unique column name to values on a shared ascending index.
///
/// Invariant: every column has exactly `index.len()` entries. Missing
/// observations stay `None` until a caller explicitly fills or drops them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesTable {
    index: Vec<NaiveDate>,
    columns: Vec<Column>,
}

impl SeriesTable {
    /// Empty table over the given index.
    pub fn new(index: Vec<NaiveDate>) -> Result<Self, TableError> {
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(TableError::UnorderedIndex);
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Single-column table holding `series` under `name`.
    pub fn from_series(name: &str, series: &TimeSeries) -> Self {
        Self {
            index: series.dates(),
            columns: vec![Column {
                name: name.to_string(),
                values: series.iter().map(|p| Some(p.value)).collect(),
            }],
        }
    }

    pub fn index(&self) -> &[NaiveDate] {
        &self.index
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    fn require(&self, name: &str) -> Result<&[Option<f64>], TableError> {
        self.column(name)
            .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
    }

    /// Append a column. Rejects duplicate names and wrong lengths.
    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), TableError> {
        let name = name.into();
        if self.has_column(&name) {
            return Err(TableError::DuplicateColumn(name));
        }
        if values.len() != self.index.len() {
            return Err(TableError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                actual: values.len(),
            });
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    pub fn rename_column(&mut self, from: &str, to: &str) -> Result<(), TableError> {
        if from == to {
            return self.require(from).map(|_| ());
        }
        if self.has_column(to) {
            return Err(TableError::DuplicateColumn(to.to_string()));
        }
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == from)
            .ok_or_else(|| TableError::UnknownColumn(from.to_string()))?;
        column.name = to.to_string();
        Ok(())
    }

    /// Column as a `TimeSeries` with "no value" rows dropped.
    pub fn series(&self, name: &str) -> Result<TimeSeries, TableError> {
        let values = self.require(name)?;
        let points = self
            .index
            .iter()
            .zip(values)
            .filter_map(|(date, v)| v.map(|v| Observation::new(*date, v)))
            .collect();
        Ok(TimeSeries::from_unsorted(points))
    }

    /// Keep only the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Self, TableError> {
        let mut out = Self {
            index: self.index.clone(),
            columns: Vec::with_capacity(names.len()),
        };
        for name in names {
            out.push_column(*name, self.require(name)?.to_vec())?;
        }
        Ok(out)
    }

    /// Propagate the last known value forward across gaps, column by column.
    ///
    /// Leading gaps stay empty. This is always an explicit step; merging
    /// never fills.
    pub fn forward_fill(&mut self) {
        for column in &mut self.columns {
            let mut carry = None;
            for value in &mut column.values {
                match value {
                    Some(v) => carry = Some(*v),
                    None => *value = carry,
                }
            }
        }
    }

    pub fn forward_filled(mut self) -> Self {
        self.forward_fill();
        self
    }

    /// Drop every row where any column lacks a value.
    pub fn drop_incomplete(&self) -> Self {
        let keep: Vec<usize> = (0..self.index.len())
            .filter(|&row| self.columns.iter().all(|c| c.values[row].is_some()))
            .collect();
        self.take_rows(&keep)
    }

    /// Rows whose date falls inside `range`.
    pub fn between(&self, range: &DateRange) -> Self {
        let keep: Vec<usize> = self
            .index
            .iter()
            .enumerate()
            .filter(|(_, d)| range.contains(**d))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&keep)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            index: rows.iter().map(|&r| self.index[r]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: rows.iter().map(|&r| c.values[r]).collect(),
                })
                .collect(),
        }
    }

    /// Latest row where `name` has a value.
    pub fn last_valid(&self, name: &str) -> Result<Option<(NaiveDate, f64)>, TableError> {
        let values = self.require(name)?;
        Ok(self
            .index
            .iter()
            .zip(values)
            .rev()
            .find_map(|(d, v)| v.map(|v| (*d, v))))
    }

    /// Compute `derivation` over the non-missing values of `source` and append
    /// the result as `output`, re-aligned to this table's index.
    pub fn derive(
        &mut self,
        source: &str,
        output: &str,
        derivation: &dyn Derivation,
    ) -> Result<(), TableError> {
        let values = self.require(source)?;
        let (rows, dense): (Vec<usize>, Vec<f64>) = values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.map(|v| (i, v)))
            .unzip();

        let computed = derivation.compute(&dense);
        let mut aligned = vec![None; self.index.len()];
        for (row, value) in rows.into_iter().zip(computed) {
            aligned[row] = value;
        }
        self.push_column(output, aligned)
    }

    /// Elementwise `numerator / denominator` appended as `output`.
    pub fn add_ratio(
        &mut self,
        output: &str,
        numerator: &str,
        denominator: &str,
    ) -> Result<(), TableError> {
        let values = crate::metrics::ratio(self.require(numerator)?, self.require(denominator)?);
        self.push_column(output, values)
    }
}

//! Export of panel tables and the returns table.
//!
//! - **CSV**: `date` first, then one column per series; missing values are empty
//! - **Parquet**: the same table through a polars `DataFrame`

use crate::dashboard::ReturnsGroup;
use marketlens_core::domain::SeriesTable;
use marketlens_core::frame::to_dataframe;
use polars::prelude::{ParquetWriter, PolarsError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("flush CSV writer: {0}")]
    Flush(String),

    #[error("CSV output is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("polars: {0}")]
    Polars(#[from] PolarsError),

    #[error("unknown export format '{0}' (expected csv or parquet)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    #[default]
    Csv,
    Parquet,
}

impl ExportFormat {
    /// Format implied by a file extension, if any.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()?.to_str()?.parse().ok()
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
        })
    }
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let data = wtr
        .into_inner()
        .map_err(|e| ExportError::Flush(e.error().to_string()))?;
    Ok(String::from_utf8(data)?)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// Render a table as CSV: `date,<column>...`.
pub fn table_to_csv(table: &SeriesTable) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["date"];
    header.extend(table.column_names());
    wtr.write_record(&header)?;

    for (row, date) in table.index().iter().enumerate() {
        let mut record = vec![date.to_string()];
        record.extend(table.columns().iter().map(|c| cell(c.values[row])));
        wtr.write_record(&record)?;
    }
    finish(wtr)
}

/// Render the returns table as CSV, one line per instrument.
///
/// Columns: group, name, price, latest_pct, d7_pct, d30_pct, volume
pub fn returns_to_csv(groups: &[ReturnsGroup]) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "group",
        "name",
        "price",
        "latest_pct",
        "d7_pct",
        "d30_pct",
        "volume",
    ])?;
    for group in groups {
        for row in &group.rows {
            wtr.write_record([
                group.title.clone(),
                row.name.clone(),
                format!("{:.6}", row.price),
                cell(row.d1),
                cell(row.d7),
                cell(row.d30),
                row.volume.map(|v| format!("{v:.0}")).unwrap_or_default(),
            ])?;
        }
    }
    finish(wtr)
}

/// Write `table` to `path` in `format`.
pub fn write_table(table: &SeriesTable, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
    let io_err = |source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    };
    match format {
        ExportFormat::Csv => {
            let csv = table_to_csv(table)?;
            std::fs::write(path, csv).map_err(io_err)?;
        }
        ExportFormat::Parquet => {
            let mut df = to_dataframe(table)?;
            let file = std::fs::File::create(path).map_err(io_err)?;
            ParquetWriter::new(file).finish(&mut df)?;
        }
    }
    info!(path = %path.display(), %format, rows = table.len(), "table exported");
    Ok(())
}

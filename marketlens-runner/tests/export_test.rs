//! Export round-trips through the filesystem.

use chrono::NaiveDate;
use marketlens_core::domain::SeriesTable;
use marketlens_runner::{write_table, DashboardConfig, ExportFormat};
use polars::prelude::*;
use std::fs::File;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn ratios() -> SeriesTable {
    let mut t =
        SeriesTable::new(vec![d("2024-03-26"), d("2024-03-27"), d("2024-03-28")]).unwrap();
    t.push_column("Growth/Value Ratio", vec![Some(1.91), Some(1.93), None])
        .unwrap();
    t.push_column("Large-cap/Small-cap Ratio", vec![Some(12.4), Some(12.2), Some(12.3)])
        .unwrap();
    t
}

#[test]
fn csv_file_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratios.csv");
    write_table(&ratios(), &path, ExportFormat::Csv).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "date,Growth/Value Ratio,Large-cap/Small-cap Ratio");
    assert_eq!(lines[3], "2024-03-28,,12.300000");
}

#[test]
fn parquet_file_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ratios.parquet");
    write_table(&ratios(), &path, ExportFormat::Parquet).unwrap();

    let df = ParquetReader::new(File::open(&path).unwrap()).finish().unwrap();
    assert_eq!(df.height(), 3);
    assert_eq!(
        df.get_column_names_str(),
        vec!["date", "Growth/Value Ratio", "Large-cap/Small-cap Ratio"]
    );
    assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);
    assert_eq!(df.column("Growth/Value Ratio").unwrap().null_count(), 1);
}

#[test]
fn unwritable_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("ratios.csv");
    let err = write_table(&ratios(), &path, ExportFormat::Csv).unwrap_err();
    assert!(err.to_string().contains("ratios.csv"));
}

#[test]
fn config_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("marketlens.toml");
    let mut config = DashboardConfig::default();
    config.options.windows = vec!["10-Day".into(), "30-Day".into()];
    std::fs::write(&path, config.to_toml().unwrap()).unwrap();

    let loaded = DashboardConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.config_id().unwrap(), config.config_id().unwrap());
}

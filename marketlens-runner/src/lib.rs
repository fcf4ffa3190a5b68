//! MarketLens Runner — configuration, cached pipeline, quote fan-out, panels, export.
//!
//! This crate builds on `marketlens-core` to provide:
//! - TOML dashboard configuration with validated defaults
//! - A pipeline of TTL-cached entry points over injected providers
//! - Concurrent quote fetching with a batch deadline
//! - Panel assembly where each upstream failure stays local to its panel
//! - Markdown rendering and CSV/Parquet export

pub mod config;
pub mod dashboard;
pub mod export;
pub mod pipeline;
pub mod quotes;
pub mod report;

pub use config::{ConfigError, DashboardConfig, Instrument};
pub use dashboard::{
    build_panel, build_report, psych_pdf_url, returns_table, EmptyReason, Panel, PanelKind,
    PanelStatus, Report, ReturnsGroup, ReturnsRow,
};
pub use export::{returns_to_csv, table_to_csv, write_table, ExportError, ExportFormat};
pub use pipeline::{MarketData, Pipeline, PipelineError, Sources};
pub use quotes::{fetch_quotes, QuoteBoard};
pub use report::{render_panel, render_report};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
        assert_send::<Sources>();
        assert_sync::<Sources>();
    }

    #[test]
    fn report_types_are_send_sync() {
        assert_send::<Report>();
        assert_sync::<Report>();
        assert_send::<QuoteBoard>();
        assert_sync::<QuoteBoard>();
        assert_send::<PipelineError>();
        assert_sync::<PipelineError>();
    }

    #[test]
    fn config_is_send_sync() {
        assert_send::<DashboardConfig>();
        assert_sync::<DashboardConfig>();
    }
}

//! Dashboard assembly: returns table, chart panels and the overview report.
//!
//! Every panel is built independently. A failing upstream turns only the
//! panels that need it into `PanelStatus::Failed`; the report always builds.

use crate::pipeline::{Pipeline, PipelineError};
use crate::quotes::QuoteBoard;
use chrono::{Datelike, NaiveDate};
use marketlens_core::align::{join, merge, JoinKind};
use marketlens_core::calendar::previous_business_day;
use marketlens_core::data::DataError;
use marketlens_core::domain::{
    recessions_between, DateRange, Interval, SeriesTable, TableError, TimeSeries,
};
use marketlens_core::metrics::{
    big_number, returns, summarize, value_range, Derivation, MovingAverage, PctChange, Rsi,
    SentimentRating, SeriesSummary, LIQUIDITY_COLUMN,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

const FEAR_GREED_COLUMN: &str = "Fear & Greed";
const RSI_BANDS: [f64; 2] = [30.0, 70.0];
const SENTIMENT_BANDS: [f64; 2] = [25.0, 75.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Ratios,
    Trend,
    Rates,
    MoneySupply,
    Liquidity,
    Sentiment,
    PutCall,
}

impl PanelKind {
    pub const ALL: [PanelKind; 7] = [
        Self::Ratios,
        Self::Trend,
        Self::Rates,
        Self::MoneySupply,
        Self::Liquidity,
        Self::Sentiment,
        Self::PutCall,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Self::Ratios => "ratios",
            Self::Trend => "trend",
            Self::Rates => "rates",
            Self::MoneySupply => "money_supply",
            Self::Liquidity => "liquidity",
            Self::Sentiment => "sentiment",
            Self::PutCall => "put_call",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Ratios => "Equity Style Ratios",
            Self::Trend => "Moving Averages & RSI",
            Self::Rates => "Treasury Yields",
            Self::MoneySupply => "M2 vs Equities (YoY)",
            Self::Liquidity => "USD Liquidity",
            Self::Sentiment => "Fear & Greed Index",
            Self::PutCall => "Put/Call Ratio",
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown panel '{0}'")]
pub struct UnknownPanel(pub String);

impl FromStr for PanelKind {
    type Err = UnknownPanel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Self::ALL
            .into_iter()
            .find(|k| k.id() == wanted)
            .ok_or_else(|| UnknownPanel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyReason {
    /// Upstream answered with nothing.
    NoData,
    /// Inputs had data but never on the same dates.
    NoOverlap,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelStatus {
    Ready,
    Empty(EmptyReason),
    Failed(String),
}

/// Min and max of each column inside a zoom window.
#[derive(Debug, Clone, PartialEq)]
pub struct Zoom {
    pub range: DateRange,
    pub bounds: Vec<(String, f64, f64)>,
}

/// One chart: its data, headline figures and decorations.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub status: PanelStatus,
    pub table: SeriesTable,
    /// Formatted headline figures, label first.
    pub headlines: Vec<(String, String)>,
    pub summaries: Vec<(String, SeriesSummary)>,
    pub zoom: Option<Zoom>,
    pub overlays: Vec<Interval>,
    pub reference_lines: Vec<f64>,
}

impl Panel {
    fn with_status(kind: PanelKind, status: PanelStatus) -> Self {
        Self {
            kind,
            status,
            table: SeriesTable::default(),
            headlines: Vec::new(),
            summaries: Vec::new(),
            zoom: None,
            overlays: Vec::new(),
            reference_lines: Vec::new(),
        }
    }

    pub fn failed(kind: PanelKind, message: impl Into<String>) -> Self {
        Self::with_status(kind, PanelStatus::Failed(message.into()))
    }

    pub fn empty(kind: PanelKind, reason: EmptyReason) -> Self {
        Self::with_status(kind, PanelStatus::Empty(reason))
    }

    /// Panel over `table`. With no value anywhere it is empty: `NoOverlap`
    /// when the inputs had data of their own, `NoData` otherwise.
    fn settle(kind: PanelKind, table: SeriesTable, inputs_had_data: bool) -> Self {
        let has_value = table
            .columns()
            .iter()
            .any(|c| c.values.iter().any(Option::is_some));
        if !has_value {
            let reason = if inputs_had_data {
                EmptyReason::NoOverlap
            } else {
                EmptyReason::NoData
            };
            return Self::empty(kind, reason);
        }
        let summaries = table
            .columns()
            .iter()
            .filter_map(|c| {
                let series = table.series(&c.name).ok()?;
                Some((c.name.clone(), summarize(&series)?))
            })
            .collect();
        Self {
            summaries,
            table,
            ..Self::with_status(kind, PanelStatus::Ready)
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == PanelStatus::Ready
    }

    /// Recession shading over the table's span, and per-column value bounds
    /// inside the zoom window. A not-ready panel is left alone.
    fn decorate(mut self, zoom: Option<DateRange>) -> Self {
        if !self.is_ready() {
            return self;
        }
        if let (Some(first), Some(last)) = (self.table.index().first(), self.table.index().last()) {
            self.overlays = recessions_between(*first, *last);
        }
        if let Some(range) = zoom {
            let bounds: Vec<(String, f64, f64)> = self
                .table
                .columns()
                .iter()
                .filter_map(|c| {
                    let series = self.table.series(&c.name).ok()?;
                    let (lo, hi) = value_range(&series, &range)?;
                    Some((c.name.clone(), lo, hi))
                })
                .collect();
            self.zoom = Some(Zoom { range, bounds });
        }
        self
    }

    fn headline(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.headlines.push((label.into(), value.into()));
        self
    }
}

/// One line of the returns table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsRow {
    pub name: String,
    pub price: f64,
    pub d1: Option<f64>,
    pub d7: Option<f64>,
    pub d30: Option<f64>,
    /// Latest traded volume, when the instrument reports one.
    pub volume: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsGroup {
    pub title: String,
    pub rows: Vec<ReturnsRow>,
    /// Members with no data this render.
    pub missing: Vec<String>,
}

/// Everything one render shows.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub date: NaiveDate,
    pub quotes: QuoteBoard,
    pub returns: Vec<ReturnsGroup>,
    pub returns_status: PanelStatus,
    pub panels: Vec<Panel>,
    /// Upstream failures that did not sink a whole panel.
    pub warnings: Vec<String>,
    pub psych_url: String,
}

/// Daily market psychology PDF for the business day before `today`.
pub fn psych_pdf_url(today: NaiveDate) -> String {
    let day = previous_business_day(today);
    format!(
        "https://www.investors.com/wp-content/uploads/{year}/{month:02}/DailyPsycho_{month:02}{day:02}{yy:02}.pdf",
        year = day.year(),
        month = day.month(),
        day = day.day(),
        yy = day.year() % 100,
    )
}

/// Build every section. Never fails: broken sections carry their error.
pub fn build_report(pipeline: &Pipeline) -> Report {
    info!(date = %pipeline.today(), "building report");
    let quotes = pipeline.quotes();

    let (returns, returns_status) = match returns_table(pipeline) {
        Ok(groups) if groups.iter().all(|g| g.rows.is_empty()) => {
            (groups, PanelStatus::Empty(EmptyReason::NoData))
        }
        Ok(groups) => (groups, PanelStatus::Ready),
        Err(e) => {
            warn!(error = %e, "returns table failed");
            (Vec::new(), PanelStatus::Failed(e.to_string()))
        }
    };

    let panels = PanelKind::ALL
        .into_iter()
        .map(|kind| build_panel(pipeline, kind))
        .collect();

    let mut warnings = Vec::new();
    if let Ok(market) = pipeline.market_data() {
        warnings.extend(
            market
                .failures
                .iter()
                .map(|(name, e)| format!("{name}: {e}")),
        );
    }
    if let Ok(batch) = pipeline.macro_data() {
        warnings.extend(batch.failures.iter().map(|(name, e)| format!("{name}: {e}")));
    }

    Report {
        date: pipeline.today(),
        quotes,
        returns,
        returns_status,
        panels,
        warnings,
        psych_url: psych_pdf_url(pipeline.today()),
    }
}

/// Build one panel, folding any error into its status.
pub fn build_panel(pipeline: &Pipeline, kind: PanelKind) -> Panel {
    let built = match kind {
        PanelKind::Ratios => ratios_panel(pipeline),
        PanelKind::Trend => trend_panel(pipeline),
        PanelKind::Rates => rates_panel(pipeline),
        PanelKind::MoneySupply => money_supply_panel(pipeline),
        PanelKind::Liquidity => liquidity_panel(pipeline),
        PanelKind::Sentiment => sentiment_panel(pipeline),
        PanelKind::PutCall => put_call_panel(pipeline),
    };
    built.unwrap_or_else(|e| {
        warn!(panel = %kind, error = %e, "panel failed");
        Panel::failed(kind, e.to_string())
    })
}

/// Returns per configured group, computed on the market table with the
/// macro series attached.
pub fn returns_table(pipeline: &Pipeline) -> Result<Vec<ReturnsGroup>, PipelineError> {
    let market = pipeline.market_data()?;
    let prices = pipeline.market_with_macro()?;
    let basis = pipeline.config().metrics.thirty_day_basis;

    let groups = pipeline
        .config()
        .market
        .groups
        .iter()
        .map(|group| {
            let mut rows = Vec::new();
            let mut missing = Vec::new();
            for name in &group.members {
                let computed = prices
                    .series(name)
                    .ok()
                    .and_then(|series| returns(&series, basis));
                match computed {
                    Some(r) => rows.push(ReturnsRow {
                        name: name.clone(),
                        price: r.price,
                        d1: r.d1,
                        d7: r.d7,
                        d30: r.d30,
                        volume: market
                            .volumes
                            .last_valid(name)
                            .ok()
                            .flatten()
                            .map(|(_, v)| v),
                    }),
                    None => missing.push(name.clone()),
                }
            }
            ReturnsGroup {
                title: group.title.clone(),
                rows,
                missing,
            }
        })
        .collect();
    Ok(groups)
}

/// Configured zoom start through today; `None` when today is earlier.
fn zoom_range(pipeline: &Pipeline) -> Option<DateRange> {
    DateRange::new(pipeline.config().metrics.zoom_start, pipeline.today()).ok()
}

/// Column `name` of `table`, or the upstream error that kept it out.
fn column_or_failure(
    table: &SeriesTable,
    name: &str,
    failures: &[(String, DataError)],
) -> Result<TimeSeries, PipelineError> {
    if table.has_column(name) {
        return Ok(table.series(name)?);
    }
    match failures.iter().find(|(n, _)| n == name) {
        Some((_, e)) => Err(e.clone().into()),
        None => Err(TableError::UnknownColumn(name.to_string()).into()),
    }
}

fn ratios_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::Ratios;
    let market = pipeline.market_data()?;
    let names: Vec<&str> = pipeline
        .config()
        .market
        .ratios
        .iter()
        .map(|r| r.name.as_str())
        .filter(|n| market.prices.has_column(n))
        .collect();
    if names.is_empty() {
        return Ok(Panel::empty(kind, EmptyReason::NoData));
    }

    let table = market.prices.select(&names)?;
    let mut panel =
        Panel::settle(kind, table, !market.prices.is_empty()).decorate(zoom_range(pipeline));
    if panel.is_ready() {
        for (name, summary) in panel.summaries.clone() {
            panel = panel.headline(name, format!("{:.3}", summary.latest_value));
        }
    }
    Ok(panel)
}

fn trend_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::Trend;
    let config = pipeline.config();
    let market = pipeline.market_data()?;

    let mut combined: Option<SeriesTable> = None;
    let mut rsi_columns = Vec::new();
    for name in &config.metrics.ma_series {
        let series = match column_or_failure(&market.prices, name, &market.failures) {
            Ok(series) => series,
            Err(e) => {
                warn!(series = %name, error = %e, "trend input unavailable");
                continue;
            }
        };
        let mut table = SeriesTable::from_series(name, &series);
        for &window in &config.metrics.moving_averages {
            let ma = MovingAverage::new(window);
            table.derive(name, &format!("{name} {}", ma.name()), &ma)?;
        }
        for &period in &config.metrics.rsi_periods {
            let rsi = Rsi::new(period, config.metrics.rsi_smoothing);
            let column = format!("{name} {}", rsi.name());
            table.derive(name, &column, &rsi)?;
            rsi_columns.push(column);
        }
        combined = Some(match combined {
            Some(acc) => join(&acc, &table, JoinKind::Outer)?,
            None => table,
        });
    }

    let Some(table) = combined else {
        return Ok(Panel::empty(kind, EmptyReason::NoData));
    };
    let mut panel = Panel::settle(kind, table, true).decorate(zoom_range(pipeline));
    if panel.is_ready() {
        panel.reference_lines = RSI_BANDS.to_vec();
        for column in rsi_columns {
            if let Ok(Some((_, v))) = panel.table.last_valid(&column) {
                panel = panel.headline(column, format!("{v:.1}"));
            }
        }
    }
    Ok(panel)
}

fn rates_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::Rates;
    let batch = pipeline.macro_data()?;
    let mut inputs = Vec::new();
    for name in &pipeline.config().macro_data.rates {
        inputs.push((name.as_str(), column_or_failure(&batch.table, name, &batch.failures)?));
    }
    let refs: Vec<(&str, &TimeSeries)> = inputs.iter().map(|(n, s)| (*n, s)).collect();
    let table = merge(&refs, JoinKind::Outer)?;

    let mut panel = Panel::settle(kind, table, false).decorate(zoom_range(pipeline));
    if panel.is_ready() {
        // Spread inversion line.
        panel.reference_lines = vec![0.0];
        for (name, summary) in panel.summaries.clone() {
            panel = panel.headline(name, format!("{:.2}%", summary.latest_value));
        }
    }
    Ok(panel)
}

fn money_supply_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::MoneySupply;
    let config = pipeline.config();
    let batch = pipeline.macro_data()?;
    let market = pipeline.market_data()?;
    let money = &config.macro_data.money_supply;
    let benchmark = &config.market.benchmark;

    let m2 = column_or_failure(&batch.table, money, &batch.failures)?;
    let equities = column_or_failure(&market.prices, benchmark, &market.failures)?;
    let inputs_had_data = !m2.is_empty() && !equities.is_empty();

    // Rows where both are observed: the money-supply release dates.
    let mut table =
        merge(&[(money.as_str(), &m2), (benchmark.as_str(), &equities)], JoinKind::Outer)?
            .drop_incomplete();
    let periods = config.metrics.yoy_periods;
    let outputs = [format!("{money} YoY %"), format!("{benchmark} YoY %")];
    for (source, output) in [money, benchmark].into_iter().zip(&outputs) {
        table.derive(source, output, &PctChange::new(periods, output.as_str()))?;
    }
    let names: Vec<&str> = outputs.iter().map(String::as_str).collect();
    let table = table.select(&names)?;

    let mut panel = Panel::settle(kind, table, inputs_had_data).decorate(zoom_range(pipeline));
    if panel.is_ready() {
        panel.reference_lines = vec![0.0];
        for (name, summary) in panel.summaries.clone() {
            panel = panel.headline(name, format!("{:+.1}%", summary.latest_value));
        }
    }
    Ok(panel)
}

fn liquidity_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::Liquidity;
    let benchmark = &pipeline.config().market.benchmark;
    let liquidity = pipeline.liquidity_index()?;
    let market = pipeline.market_data()?;
    let equities = column_or_failure(&market.prices, benchmark, &market.failures)?;
    let inputs_had_data = !liquidity.is_empty() && !equities.is_empty();

    let table = merge(
        &[(LIQUIDITY_COLUMN, &liquidity), (benchmark.as_str(), &equities)],
        JoinKind::Outer,
    )?
    .forward_filled()
    .drop_incomplete();

    let mut panel = Panel::settle(kind, table, inputs_had_data).decorate(zoom_range(pipeline));
    if panel.is_ready() {
        if let Some(latest) = liquidity.last() {
            panel = panel.headline(LIQUIDITY_COLUMN, big_number(latest.value));
        }
    }
    Ok(panel)
}

fn sentiment_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::Sentiment;
    let reading = pipeline.sentiment()?;
    let table = SeriesTable::from_series(FEAR_GREED_COLUMN, &reading.scores);
    let mut panel = Panel::settle(kind, table, false);
    if panel.is_ready() {
        panel.reference_lines = SENTIMENT_BANDS.to_vec();
        if let Some(latest) = reading.scores.last() {
            let rating = reading
                .rating
                .clone()
                .unwrap_or_else(|| SentimentRating::from_score(latest.value).to_string());
            panel = panel.headline(FEAR_GREED_COLUMN, format!("{:.0} ({rating})", latest.value));
        }
    }
    Ok(panel)
}

fn put_call_panel(pipeline: &Pipeline) -> Result<Panel, PipelineError> {
    let kind = PanelKind::PutCall;
    let options = &pipeline.config().options;

    let mut fetched = Vec::new();
    let mut first_error = None;
    for window in &options.windows {
        match pipeline.put_call(window) {
            Ok(series) => fetched.push((format!("{} {window}", options.ticker), series)),
            Err(e) => {
                warn!(window = %window, error = %e, "put/call window failed");
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }
    if fetched.is_empty() {
        if let Some(e) = first_error {
            return Err(e);
        }
    }

    let refs: Vec<(&str, &TimeSeries)> = fetched.iter().map(|(n, s)| (n.as_str(), s)).collect();
    let mut panel = Panel::settle(kind, merge(&refs, JoinKind::Outer)?, false);
    if panel.is_ready() {
        panel.reference_lines = vec![1.0];
        for (name, summary) in panel.summaries.clone() {
            panel = panel.headline(name, format!("{:.2}", summary.latest_value));
        }
    }
    Ok(panel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn psych_url_uses_previous_business_day() {
        // Monday → previous Friday.
        assert_eq!(
            psych_pdf_url(d(2024, 3, 4)),
            "https://www.investors.com/wp-content/uploads/2024/03/DailyPsycho_030124.pdf"
        );
        // Crosses a year boundary.
        assert_eq!(
            psych_pdf_url(d(2025, 1, 1)),
            "https://www.investors.com/wp-content/uploads/2024/12/DailyPsycho_123124.pdf"
        );
    }

    #[test]
    fn panel_kind_parse() {
        assert_eq!("ratios".parse::<PanelKind>().unwrap(), PanelKind::Ratios);
        assert_eq!("Money-Supply".parse::<PanelKind>().unwrap(), PanelKind::MoneySupply);
        assert_eq!(" put_call ".parse::<PanelKind>().unwrap(), PanelKind::PutCall);
        assert!("heatmap".parse::<PanelKind>().is_err());
        for kind in PanelKind::ALL {
            assert_eq!(kind.to_string().parse::<PanelKind>().unwrap(), kind);
        }
    }

    #[test]
    fn settle_distinguishes_empty_reasons() {
        let table = SeriesTable::new(vec![d(2024, 1, 1)]).unwrap();
        let panel = Panel::settle(PanelKind::Liquidity, table.clone(), true);
        assert_eq!(panel.status, PanelStatus::Empty(EmptyReason::NoOverlap));
        let panel = Panel::settle(PanelKind::Liquidity, table, false);
        assert_eq!(panel.status, PanelStatus::Empty(EmptyReason::NoData));
    }

    #[test]
    fn settle_summarizes_columns() {
        let series = TimeSeries::from_pairs([(d(2024, 1, 1), 2.0), (d(2024, 1, 2), 4.0)]).unwrap();
        let panel = Panel::settle(PanelKind::Sentiment, SeriesTable::from_series("x", &series), false);
        assert!(panel.is_ready());
        assert_eq!(panel.summaries.len(), 1);
        assert_eq!(panel.summaries[0].1.mean, 3.0);
        assert_eq!(panel.summaries[0].1.latest_value, 4.0);
    }

    #[test]
    fn missing_column_reports_upstream_error() {
        let table = SeriesTable::default();
        let failures = vec![("M2".to_string(), DataError::CircuitBreakerTripped)];
        let err = column_or_failure(&table, "M2", &failures).unwrap_err();
        assert_eq!(err, PipelineError::Data(DataError::CircuitBreakerTripped));
        let err = column_or_failure(&table, "10Y", &failures).unwrap_err();
        assert!(matches!(err, PipelineError::Table(TableError::UnknownColumn(_))));
    }
}

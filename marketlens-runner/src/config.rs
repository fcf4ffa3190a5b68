//! Serializable dashboard configuration.
//!
//! Every static map the dashboard needs (instrument symbols and display
//! names, FRED series, ratio definitions, table groups, metric windows) is
//! carried here so a TOML file can override any of it. `Default` reproduces
//! the stock dashboard.

use chrono::NaiveDate;
use marketlens_core::cache::StalePolicy;
use marketlens_core::data::PutCallId;
use marketlens_core::metrics::{RsiSmoothing, ThirtyDayBasis, Unit};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Content hash of a configuration.
pub type ConfigId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration. Every section falls back to its default when
/// omitted from the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub cache: CacheConfig,
    pub fetch: FetchConfig,
    pub market: MarketConfig,
    #[serde(rename = "macro")]
    pub macro_data: MacroConfig,
    pub sentiment: SentimentConfig,
    pub options: OptionsConfig,
    pub metrics: MetricsConfig,
}

impl DashboardConfig {
    /// Load and validate a configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Deterministic hash of the effective configuration. Two dashboards
    /// with the same id render from the same inputs.
    pub fn config_id(&self) -> Result<ConfigId, ConfigError> {
        let toml = self.to_toml()?;
        Ok(blake3::hash(toml.as_bytes()).to_hex().to_string())
    }

    /// Cross-field checks: names referenced by ratios, groups and panels
    /// must exist, windows must be positive, columns must stay unique.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.cache.ttl_secs == 0 {
            return invalid("cache.ttl_secs must be > 0".into());
        }
        if self.fetch.http_timeout_secs == 0 || self.fetch.quote_deadline_secs == 0 {
            return invalid("fetch timeouts must be > 0".into());
        }
        if self.sentiment.lookback_days <= 0 {
            return invalid("sentiment.lookback_days must be > 0".into());
        }

        // Index and macro columns share one table.
        let mut columns = HashSet::new();
        for name in self
            .market
            .indices
            .iter()
            .chain(&self.macro_data.series)
            .map(|i| i.name.as_str())
        {
            if !columns.insert(name) {
                return invalid(format!("duplicate column name '{name}'"));
            }
        }
        let indices: HashSet<&str> = self.market.indices.iter().map(|i| i.name.as_str()).collect();
        let require_index = |name: &str, context: &str| -> Result<(), ConfigError> {
            if indices.contains(name) {
                Ok(())
            } else {
                Err(ConfigError::Invalid(format!(
                    "{context} references unknown index '{name}'"
                )))
            }
        };

        for ratio in &self.market.ratios {
            require_index(&ratio.numerator, &ratio.name)?;
            require_index(&ratio.denominator, &ratio.name)?;
            if !columns.insert(ratio.name.as_str()) {
                return invalid(format!("ratio '{}' collides with a column", ratio.name));
            }
        }
        for group in &self.market.groups {
            if let Some(member) = group.members.iter().find(|m| !columns.contains(m.as_str())) {
                return invalid(format!("{} references unknown column '{member}'", group.title));
            }
        }
        require_index(&self.market.benchmark, "market.benchmark")?;
        for name in &self.metrics.ma_series {
            require_index(name, "metrics.ma_series")?;
        }

        let macros: HashSet<&str> = self.macro_data.series.iter().map(|i| i.name.as_str()).collect();
        for name in self
            .macro_data
            .rates
            .iter()
            .chain(std::iter::once(&self.macro_data.money_supply))
        {
            if !macros.contains(name.as_str()) {
                return invalid(format!("macro_data references unknown series '{name}'"));
            }
        }

        if self.metrics.moving_averages.iter().any(|&w| w == 0) {
            return invalid("moving average windows must be >= 1".into());
        }
        if self.metrics.rsi_periods.iter().any(|&p| p == 0) {
            return invalid("RSI periods must be >= 1".into());
        }
        if let Some(w) = first_duplicate(&self.metrics.moving_averages) {
            return invalid(format!("duplicate moving average window {w}"));
        }
        if let Some(p) = first_duplicate(&self.metrics.rsi_periods) {
            return invalid(format!("duplicate RSI period {p}"));
        }
        if self.metrics.yoy_periods == 0 {
            return invalid("metrics.yoy_periods must be >= 1".into());
        }

        for window in &self.options.windows {
            PutCallId::parse(&format!("{}:{window}", self.options.ticker))
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }
}

fn first_duplicate(values: &[usize]) -> Option<usize> {
    let mut seen = HashSet::new();
    values.iter().copied().find(|v| !seen.insert(*v))
}

/// A fetchable symbol and the column name it is shown under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
    pub stale_policy: StalePolicy,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 300,
            stale_policy: StalePolicy::FailHard,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub http_timeout_secs: u64,
    /// Deadline for the whole quote fan-out.
    pub quote_deadline_secs: u64,
    pub history_start: NaiveDate,
}

impl FetchConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn quote_deadline(&self) -> Duration {
        Duration::from_secs(self.quote_deadline_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            http_timeout_secs: 10,
            quote_deadline_secs: 15,
            history_start: NaiveDate::from_ymd_opt(1980, 12, 31).unwrap_or_default(),
        }
    }
}

/// `name = numerator / denominator`, all three by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioSpec {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

/// A titled block of the returns table. Members may be indices or macro series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupSpec {
    pub title: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub indices: Vec<Instrument>,
    /// Instruments shown on the live quote board.
    pub futures: Vec<Instrument>,
    pub ratios: Vec<RatioSpec>,
    pub groups: Vec<GroupSpec>,
    /// Index the macro panels are plotted against.
    pub benchmark: String,
}

impl Default for MarketConfig {
    fn default() -> Self {
        let indices = [
            ("^IXIC", "NASDAQ"),
            ("^GSPC", "S&P 500"),
            ("^DJI", "Dow Jones"),
            ("^FTSE", "FTSE (UK)"),
            ("^N225", "Nikkei (JPY)"),
            ("^AXJO", "ASX 200"),
            ("^HSI", "Hang Seng (HKD)"),
            ("DX-Y.NYB", "DXY"),
            ("^VIX", "VIX"),
            ("^RAG", "Russell 3000 Growth"),
            ("^RAV", "Russell 3000 Value"),
            ("^RUI", "Russell 1000 Large-Cap"),
            ("^RUT", "Russell 2000 Small-Cap"),
            ("ARKK", "ARKK Innovation ETF"),
        ];
        let futures = [
            ("ES=F", "S&P 500"),
            ("NQ=F", "NASDAQ 100"),
            ("YM=F", "Dow Jones"),
            ("NKD=F", "Nikkei (JPY)"),
            ("CL=F", "WTI Crude Oil"),
            ("GC=F", "Gold"),
        ];
        let groups = [
            (
                "Major Indices",
                vec![
                    "NASDAQ",
                    "S&P 500",
                    "Dow Jones",
                    "FTSE (UK)",
                    "Nikkei (JPY)",
                    "ASX 200",
                    "Hang Seng (HKD)",
                    "DXY",
                ],
            ),
            ("Economic Indicators", vec!["10Y", "VIX"]),
            (
                "Equity Style",
                vec![
                    "Russell 3000 Growth",
                    "Russell 3000 Value",
                    "Russell 1000 Large-Cap",
                    "Russell 2000 Small-Cap",
                    "ARKK Innovation ETF",
                ],
            ),
        ];

        Self {
            indices: indices.iter().map(|(s, n)| Instrument::new(*s, *n)).collect(),
            futures: futures.iter().map(|(s, n)| Instrument::new(*s, *n)).collect(),
            ratios: vec![
                RatioSpec {
                    name: "Growth/Value Ratio".into(),
                    numerator: "Russell 3000 Growth".into(),
                    denominator: "Russell 3000 Value".into(),
                },
                RatioSpec {
                    name: "Large-cap/Small-cap Ratio".into(),
                    numerator: "Russell 1000 Large-Cap".into(),
                    denominator: "Russell 2000 Small-Cap".into(),
                },
            ],
            groups: groups
                .into_iter()
                .map(|(title, members)| GroupSpec {
                    title: title.into(),
                    members: members.into_iter().map(String::from).collect(),
                })
                .collect(),
            benchmark: "S&P 500".into(),
        }
    }
}

/// A FRED series id with its reporting unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSeries {
    pub id: String,
    pub unit: Unit,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityConfig {
    pub fed_balance_sheet: UnitSeries,
    pub reverse_repo: UnitSeries,
    pub tga: UnitSeries,
}

impl Default for LiquidityConfig {
    fn default() -> Self {
        let series = |id: &str, unit| UnitSeries { id: id.into(), unit };
        Self {
            fed_balance_sheet: series("WALCL", Unit::Millions),
            reverse_repo: series("RRPONTSYD", Unit::Billions),
            tga: series("WTREGEN", Unit::Millions),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MacroConfig {
    /// FRED series; `symbol` is the FRED id.
    pub series: Vec<Instrument>,
    /// Falls back to the `FRED_API_KEY` environment variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Display name of the money-supply series plotted against the benchmark.
    pub money_supply: String,
    /// Display names of the rate series on the rates panel.
    pub rates: Vec<String>,
    pub liquidity: LiquidityConfig,
}

impl Default for MacroConfig {
    fn default() -> Self {
        Self {
            series: vec![
                Instrument::new("DGS10", "10Y"),
                Instrument::new("T10Y2Y", "10Y-2Y"),
                Instrument::new("M2SL", "M2"),
            ],
            api_key: None,
            money_supply: "M2".into(),
            rates: vec!["10Y".into(), "10Y-2Y".into()],
            liquidity: LiquidityConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentimentConfig {
    pub lookback_days: i64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self { lookback_days: 365 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    pub ticker: String,
    pub windows: Vec<String>,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            ticker: "SPY".into(),
            windows: vec!["30-Day".into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub moving_averages: Vec<usize>,
    /// Indices that get moving-average and RSI panels.
    pub ma_series: Vec<String>,
    pub rsi_periods: Vec<usize>,
    pub rsi_smoothing: RsiSmoothing,
    pub thirty_day_basis: ThirtyDayBasis,
    /// Start of the ratio zoom window (ends today).
    pub zoom_start: NaiveDate,
    /// Periods for the money-supply year-over-year change.
    pub yoy_periods: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            moving_averages: vec![7, 25, 100],
            ma_series: vec![
                "S&P 500".into(),
                "NASDAQ".into(),
                "VIX".into(),
                "DXY".into(),
            ],
            rsi_periods: vec![14],
            rsi_smoothing: RsiSmoothing::Exponential,
            thirty_day_basis: ThirtyDayBasis::Lookback,
            zoom_start: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            yoy_periods: 12,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        DashboardConfig::default().validate().unwrap();
    }

    #[test]
    fn toml_roundtrip() {
        let config = DashboardConfig::default();
        let toml = config.to_toml().unwrap();
        let back = DashboardConfig::from_toml(&toml).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn empty_file_is_default() {
        assert_eq!(DashboardConfig::from_toml("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_override() {
        let config = DashboardConfig::from_toml(
            r#"
            [cache]
            ttl_secs = 60
            stale_policy = "serve_stale"

            [metrics]
            thirty_day_basis = "window_start"
            "#,
        )
        .unwrap();
        assert_eq!(config.cache.ttl(), Duration::from_secs(60));
        assert_eq!(config.cache.stale_policy, StalePolicy::ServeStale);
        assert_eq!(config.metrics.thirty_day_basis, ThirtyDayBasis::WindowStart);
        assert_eq!(config.metrics.moving_averages, vec![7, 25, 100]);
        assert_eq!(config.market, MarketConfig::default());
    }

    #[test]
    fn config_id_deterministic() {
        let a = DashboardConfig::default();
        let b = DashboardConfig::default();
        assert_eq!(a.config_id().unwrap(), b.config_id().unwrap());
        assert_eq!(a.config_id().unwrap().len(), 64);

        let mut c = DashboardConfig::default();
        c.metrics.rsi_periods = vec![21];
        assert_ne!(a.config_id().unwrap(), c.config_id().unwrap());
    }

    #[test]
    fn ratio_with_unknown_index_rejected() {
        let mut config = DashboardConfig::default();
        config.market.ratios[0].denominator = "Nope".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Nope"));
    }

    #[test]
    fn macro_name_colliding_with_index_rejected() {
        let mut config = DashboardConfig::default();
        config.macro_data.series.push(Instrument::new("VIXCLS", "VIX"));
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn zero_windows_rejected() {
        let mut config = DashboardConfig::default();
        config.metrics.moving_averages = vec![7, 0];
        assert!(config.validate().is_err());

        let mut config = DashboardConfig::default();
        config.cache.ttl_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_windows_rejected() {
        let mut config = DashboardConfig::default();
        config.metrics.moving_averages = vec![7, 25, 7];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("moving average window 7"));

        let mut config = DashboardConfig::default();
        config.metrics.rsi_periods = vec![14, 14];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("RSI period 14"));
    }

    #[test]
    fn unknown_macro_names_rejected() {
        let mut config = DashboardConfig::default();
        config.macro_data.rates.push("30Y".into());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'30Y'"));

        let mut config = DashboardConfig::default();
        config.macro_data.money_supply = "M3".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("'M3'"));
    }

    #[test]
    fn unknown_option_window_rejected() {
        let mut config = DashboardConfig::default();
        config.options.windows = vec!["7-Day".into()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_error_surfaces() {
        let err = DashboardConfig::from_toml("[cache]\nttl_secs = \"soon\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DashboardConfig::from_file(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

//! MarketLens CLI — market overview, live quotes, single panels and export.
//!
//! Commands:
//! - `overview` — render every section of the dashboard as Markdown
//! - `quotes` — live futures quotes
//! - `panel <name>` — one chart panel (ratios, trend, rates, money_supply, liquidity, sentiment, put_call)
//! - `export <panel> --out <path>` — write a panel table (or `returns`) as CSV or Parquet
//! - `config` — print the effective configuration

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use marketlens_core::cache::SystemClock;
use marketlens_runner::report::render_quotes;
use marketlens_runner::{
    build_panel, build_report, render_panel, render_report, returns_table, returns_to_csv,
    write_table, DashboardConfig, ExportFormat, PanelKind, PanelStatus, Pipeline, Sources,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "marketlens", about = "MarketLens — financial markets overview")]
struct Cli {
    /// Path to a TOML config file. Defaults to the built-in dashboard.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Render as of this date (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    as_of: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the full dashboard as Markdown.
    Overview,
    /// Live quotes for the configured futures.
    Quotes,
    /// Render one panel.
    Panel {
        /// Panel name, e.g. ratios or liquidity.
        name: String,
    },
    /// Export a panel table, or `returns`, to a file.
    Export {
        /// Panel name or `returns`.
        name: String,

        /// Output file.
        #[arg(long)]
        out: PathBuf,

        /// csv or parquet. Inferred from the extension when omitted.
        #[arg(long)]
        format: Option<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Commands::Config = cli.command {
        return run_config(&config);
    }

    let pipeline = build_pipeline(config, cli.as_of.as_deref())?;
    match cli.command {
        Commands::Overview => {
            print!("{}", render_report(&build_report(&pipeline)));
            Ok(())
        }
        Commands::Quotes => run_quotes(&pipeline),
        Commands::Panel { name } => run_panel(&pipeline, &name),
        Commands::Export { name, out, format } => {
            run_export(&pipeline, &name, &out, format.as_deref())
        }
        Commands::Config => run_config(pipeline.config()),
    }
}

fn run_quotes(pipeline: &Pipeline) -> Result<()> {
    let board = pipeline.quotes();
    print!("{}", render_quotes(&board));
    if !board.is_complete() {
        std::process::exit(1);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => Ok(DashboardConfig::default()),
    }
}

fn build_pipeline(config: DashboardConfig, as_of: Option<&str>) -> Result<Pipeline> {
    let sources = Sources::live(&config).context("failed to build HTTP clients")?;
    let pipeline = match as_of {
        Some(date) => {
            let today = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .with_context(|| format!("invalid --as-of date '{date}'"))?;
            Pipeline::with_clock(config, sources, Arc::new(SystemClock), today)
        }
        None => Pipeline::new(config, sources),
    };
    info!(today = %pipeline.today(), "pipeline ready");
    Ok(pipeline)
}

fn run_config(config: &DashboardConfig) -> Result<()> {
    let toml = config.to_toml()?;
    println!("# config id: {}", config.config_id()?);
    print!("{toml}");
    Ok(())
}

fn parse_panel(name: &str) -> Result<PanelKind> {
    name.parse::<PanelKind>().map_err(|e| {
        let valid: Vec<&str> = PanelKind::ALL.iter().map(|k| k.id()).collect();
        anyhow::anyhow!("{e}. Valid: {}", valid.join(", "))
    })
}

fn run_panel(pipeline: &Pipeline, name: &str) -> Result<()> {
    let panel = build_panel(pipeline, parse_panel(name)?);
    print!("{}", render_panel(&panel));
    if let PanelStatus::Failed(_) = panel.status {
        std::process::exit(1);
    }
    Ok(())
}

fn run_export(pipeline: &Pipeline, name: &str, out: &Path, format: Option<&str>) -> Result<()> {
    let format = match format {
        Some(f) => f.parse::<ExportFormat>()?,
        None => ExportFormat::from_path(out).unwrap_or_default(),
    };

    if name == "returns" {
        if format != ExportFormat::Csv {
            bail!("the returns table exports as csv only");
        }
        let groups = returns_table(pipeline)?;
        std::fs::write(out, returns_to_csv(&groups)?)
            .with_context(|| format!("failed to write {}", out.display()))?;
    } else {
        let panel = build_panel(pipeline, parse_panel(name)?);
        match &panel.status {
            PanelStatus::Ready => write_table(&panel.table, out, format)?,
            PanelStatus::Empty(reason) => bail!("panel '{name}' is empty ({reason:?})"),
            PanelStatus::Failed(message) => bail!("panel '{name}' failed: {message}"),
        }
    }

    println!("Exported {name} to {} ({format})", out.display());
    Ok(())
}

//! Markdown rendering of the overview report and single panels.

use crate::dashboard::{EmptyReason, Panel, PanelStatus, Report, ReturnsGroup};
use crate::quotes::QuoteBoard;
use marketlens_core::metrics::big_number;

fn pct(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:+.2}%"))
}

fn status_line(status: &PanelStatus) -> Option<String> {
    match status {
        PanelStatus::Ready => None,
        PanelStatus::Empty(EmptyReason::NoData) => Some("_No data available._".into()),
        PanelStatus::Empty(EmptyReason::NoOverlap) => {
            Some("_Inputs do not overlap in time._".into())
        }
        PanelStatus::Failed(message) => Some(format!("_Unavailable: {message}_")),
    }
}

pub fn render_quotes(board: &QuoteBoard) -> String {
    let mut out = String::from("| Instrument | Last | Change |\n|------------|------|--------|\n");
    for (instrument, quote) in &board.quotes {
        out.push_str(&format!(
            "| {} | {:.2} | {} |\n",
            instrument.name,
            quote.last_price,
            pct(quote.change_pct())
        ));
    }
    for (instrument, error) in &board.failures {
        out.push_str(&format!("| {} | n/a | {} |\n", instrument.name, error));
    }
    out
}

pub fn render_returns(groups: &[ReturnsGroup]) -> String {
    let mut out = String::new();
    for group in groups {
        out.push_str(&format!("### {}\n\n", group.title));
        out.push_str("| Name | Price | Latest % | 7d % | 30d % | Vol |\n");
        out.push_str("|------|-------|----------|------|-------|-----|\n");
        for row in &group.rows {
            out.push_str(&format!(
                "| {} | {:.2} | {} | {} | {} | {} |\n",
                row.name,
                row.price,
                pct(row.d1),
                pct(row.d7),
                pct(row.d30),
                row.volume.map(big_number).unwrap_or_default()
            ));
        }
        if !group.missing.is_empty() {
            out.push_str(&format!("\nNo data: {}\n", group.missing.join(", ")));
        }
        out.push('\n');
    }
    out
}

pub fn render_panel(panel: &Panel) -> String {
    let mut out = format!("## {}\n\n", panel.kind.title());
    if let Some(line) = status_line(&panel.status) {
        out.push_str(&line);
        out.push('\n');
        return out;
    }

    for (label, value) in &panel.headlines {
        out.push_str(&format!("- {label}: **{value}**\n"));
    }

    if !panel.summaries.is_empty() {
        out.push_str("\n| Series | Latest | Date | Mean | Min | Max |\n");
        out.push_str("|--------|--------|------|------|-----|-----|\n");
        for (name, s) in &panel.summaries {
            out.push_str(&format!(
                "| {} | {:.2} | {} | {:.2} | {:.2} | {:.2} |\n",
                name, s.latest_value, s.latest_date, s.mean, s.min, s.max
            ));
        }
    }

    if let Some(zoom) = &panel.zoom {
        out.push_str(&format!(
            "\nZoom {} to {}:\n",
            zoom.range.start(),
            zoom.range.end()
        ));
        for (name, lo, hi) in &zoom.bounds {
            out.push_str(&format!("- {name}: {lo:.3} .. {hi:.3}\n"));
        }
    }

    if !panel.overlays.is_empty() {
        let spans: Vec<String> = panel
            .overlays
            .iter()
            .map(|r| format!("{}..{}", r.start, r.end))
            .collect();
        out.push_str(&format!("\nRecessions: {}\n", spans.join(", ")));
    }
    if !panel.reference_lines.is_empty() {
        let lines: Vec<String> = panel.reference_lines.iter().map(|v| v.to_string()).collect();
        out.push_str(&format!("Reference lines: {}\n", lines.join(", ")));
    }
    out
}

pub fn render_report(report: &Report) -> String {
    let mut out = format!("# Market Overview\n\nAs of {}\n\n", report.date);

    out.push_str("## Futures\n\n");
    out.push_str(&render_quotes(&report.quotes));

    out.push_str("\n## Returns\n\n");
    match status_line(&report.returns_status) {
        Some(line) => {
            out.push_str(&line);
            out.push_str("\n\n");
        }
        None => out.push_str(&render_returns(&report.returns)),
    }

    for panel in &report.panels {
        out.push_str(&render_panel(panel));
        out.push('\n');
    }

    out.push_str(&format!("Market psychology: {}\n", report.psych_url));
    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &report.warnings {
            out.push_str(&format!("- {warning}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Instrument;
    use crate::dashboard::{PanelKind, ReturnsRow};
    use marketlens_core::data::{DataError, Quote};

    #[test]
    fn failed_panel_shows_reason_only() {
        let panel = Panel::failed(PanelKind::Liquidity, "circuit breaker tripped");
        let text = render_panel(&panel);
        assert!(text.starts_with("## USD Liquidity"));
        assert!(text.contains("_Unavailable: circuit breaker tripped_"));
        assert!(!text.contains("| Series |"));
    }

    #[test]
    fn empty_panel_reasons() {
        let text = render_panel(&Panel::empty(PanelKind::MoneySupply, EmptyReason::NoOverlap));
        assert!(text.contains("do not overlap"));
    }

    #[test]
    fn quotes_table_lists_failures() {
        let board = QuoteBoard {
            quotes: vec![(
                Instrument::new("GC=F", "Gold"),
                Quote {
                    last_price: 2050.0,
                    previous_close: 2000.0,
                },
            )],
            failures: vec![(
                Instrument::new("CL=F", "WTI Crude Oil"),
                DataError::Timeout {
                    id: "CL=F".into(),
                    elapsed_ms: 15_000,
                },
            )],
        };
        let text = render_quotes(&board);
        assert!(text.contains("| Gold | 2050.00 | +2.50% |"));
        assert!(text.contains("| WTI Crude Oil | n/a |"));
    }

    #[test]
    fn returns_rows_format() {
        let text = render_returns(&[ReturnsGroup {
            title: "Equity Style".into(),
            rows: vec![ReturnsRow {
                name: "ARKK Innovation ETF".into(),
                price: 48.2,
                d1: Some(-1.234),
                d7: None,
                d30: Some(10.0),
                volume: Some(2.5e6),
            }],
            missing: vec!["Russell 3000 Value".into()],
        }]);
        assert!(text.contains("### Equity Style"));
        assert!(text.contains("| ARKK Innovation ETF | 48.20 | -1.23% | n/a | +10.00% | $2.5M |"));
        assert!(text.contains("No data: Russell 3000 Value"));
    }
}

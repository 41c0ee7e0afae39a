//! Formatted terminal output.
//!
//! Formatting lives here so output changes stay localized and the loaders
//! stay free of presentation code.

use crate::error::AppError;
use crate::report::{LoadSummary, SeriesStats};

/// Human-readable load summary.
pub fn format_load_summary(summary: &LoadSummary) -> String {
    let mut out = String::new();

    out.push_str("=== deropt - load summary ===\n");
    if let Some(case) = &summary.case {
        out.push_str(&format!("Case: {case}\n"));
    }
    out.push_str(&format!("Source: {}\n", summary.source));
    out.push_str(&format!("Rows: {}\n", summary.rows));
    if let (Some(start), Some(end)) = (summary.start, summary.end) {
        out.push_str(&format!("Span: {start} .. {end}\n"));
    }
    out.push_str(&format!(
        "Interval: {}{}\n",
        summary
            .interval_hours
            .map_or_else(|| "irregular".to_string(), |h| format!("{h:.4} h")),
        if summary.resampled { " (resampled)" } else { "" }
    ));
    out.push_str(&format!("Columns: {}\n", summary.load_columns.join(", ")));

    out.push_str("\nSeries:\n");
    out.push_str(&format_stats_table(&summary.series));

    for profile in &summary.profiles {
        out.push_str(&format!(
            "\nProfile {} ({}; time column: {}):\n",
            profile.resource.name(),
            profile.source,
            profile.time_column.as_deref().unwrap_or("synthetic year")
        ));
        out.push_str(&format_stats_table(&profile.series));
        for p in &profile.params {
            out.push_str(&format!(
                "  {:<40} eff={:.3} capex={:.1}$/kW om={:.1}$/kW-yr\n",
                p.key, p.efficiency, p.capital_cost_per_kw, p.om_per_kw_year
            ));
        }
    }

    out
}

fn format_stats_table(rows: &[SeriesStats]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "  {:<40} {:<8} {:>12} {:>12} {:>12} {:>14}\n",
        "key", "unit", "min", "mean", "max", "total"
    ));
    for s in rows {
        out.push_str(&format!(
            "  {:<40} {:<8} {:>12.4} {:>12.4} {:>12.4} {:>14.3}\n",
            s.key, s.unit, s.min, s.mean, s.max, s.total
        ));
    }
    out
}

/// Pretty JSON rendering of the summary.
pub fn format_summary_json(summary: &LoadSummary) -> Result<String, AppError> {
    serde_json::to_string_pretty(summary)
        .map_err(|e| AppError::new(4, format!("Failed to serialize summary JSON: {e}")))
}

/// List of registered cases, marking the default.
pub fn format_case_list(names: &[String], default: &str) -> String {
    let mut out = String::from("Registered cases:\n");
    for name in names {
        let marker = if name == default { " (default)" } else { "" };
        out.push_str(&format!("  {name}{marker}\n"));
    }
    out
}

//! Command-line parsing for the DER load-data pipeline.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! loaders. Options left unset fall back to the selected case (or to the
//! loader defaults when a file is given directly).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DatetimeFormat, InterpolationMethod, ResourceKind, SheetSelector};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "deropt", version, about = "DER load ingestion and resource-profile alignment")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load a case (or a single file), align its resource profile, and print a summary.
    Load(LoadArgs),
    /// List the registered case names.
    Cases,
}

#[derive(Debug, Args, Clone)]
pub struct LoadArgs {
    /// Registered case name (default: $DEROPT_CASE, then `igiugig`).
    #[arg(short = 'c', long, conflicts_with = "file")]
    pub case: Option<String>,

    /// Project root that case data paths are relative to (default: $DEROPT_PROJECT_ROOT, then `.`).
    #[arg(long)]
    pub project_root: Option<PathBuf>,

    /// Load file (CSV or workbook) to read instead of a case.
    #[arg(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Worksheet by zero-based index or by name (workbooks only).
    #[arg(long)]
    pub sheet: Option<SheetSelector>,

    /// Datetime column name.
    #[arg(long)]
    pub datetime_column: Option<String>,

    /// Datetime encoding: a chrono pattern, `matlab_serial`, `excel_serial`, or `auto`.
    #[arg(long)]
    pub datetime_format: Option<DatetimeFormat>,

    /// Preferred load column; other `(kW)`/`(kWh)` columns are loaded too.
    #[arg(long)]
    pub load_column: Option<String>,

    /// Target grid interval in minutes (omit to never resample).
    #[arg(long)]
    pub interval_minutes: Option<u32>,

    /// Gap-fill method.
    #[arg(long, value_enum)]
    pub interpolation: Option<InterpolationMethod>,

    /// Keep negative samples instead of treating them as missing.
    #[arg(long)]
    pub keep_negative: bool,

    /// Resample even when the series is already on the target grid.
    #[arg(long)]
    pub always_resample: bool,

    /// Largest off-grid distance (seconds) still treated as regular.
    #[arg(long)]
    pub tolerance_seconds: Option<f64>,

    /// Resource profile to align (overrides the case's discovered solar file).
    #[arg(long, value_name = "PATH")]
    pub profile: Option<PathBuf>,

    /// Resource kind of `--profile`.
    #[arg(long, value_enum, default_value_t = ResourceKind::Solar)]
    pub resource: ResourceKind,

    /// Skip resource-profile alignment.
    #[arg(long, conflicts_with = "profile")]
    pub no_profile: bool,

    /// Profile time column name (default: detect).
    #[arg(long, conflicts_with = "synthetic_year")]
    pub profile_time_column: Option<String>,

    /// Treat the profile as one reference year with no time column.
    #[arg(long)]
    pub synthetic_year: bool,

    /// Explicit profile value columns (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub profile_columns: Option<Vec<String>>,

    /// Solar PV parameters as JSON (defaults and per-profile overrides).
    #[arg(long, value_name = "JSON")]
    pub solar_params: Option<PathBuf>,

    /// Print the summary as JSON.
    #[arg(long)]
    pub json: bool,
}

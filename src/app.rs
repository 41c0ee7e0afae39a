//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - resolves a case (or a single file) into loader configuration
//! - runs the load pipeline and prints the summary

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Command, LoadArgs};
use crate::config::{CaseConfig, CaseRegistry, DEFAULT_CASE, SolarPvParams};
use crate::domain::{EnergyLoadConfig, ProfileConfig, TimeColumnSelector};
use crate::error::AppError;

pub mod pipeline;

/// Environment variable naming the default case.
pub const CASE_ENV: &str = "DEROPT_CASE";
/// Environment variable naming the project root.
pub const PROJECT_ROOT_ENV: &str = "DEROPT_PROJECT_ROOT";

/// Entry point for the `deropt` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    let registry = CaseRegistry::with_builtin_cases();

    match cli.command {
        Command::Load(args) => handle_load(args, &registry),
        Command::Cases => {
            let default = env::var(CASE_ENV).unwrap_or_else(|_| DEFAULT_CASE.to_string());
            print!("{}", crate::report::format_case_list(&registry.names(), &default));
            Ok(())
        }
    }
}

/// Logs go to stderr so stdout stays clean for summaries and JSON.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(env::var("RUST_LOG").unwrap_or_else(|_| "info".into()));
    // A subscriber may already be installed (e.g. by an embedding host).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_load(args: LoadArgs, registry: &CaseRegistry) -> Result<(), AppError> {
    let case = case_config_from_args(&args, registry)?;
    let run = pipeline::run_load(case)?;

    let summary = crate::report::summarize(Some(&run.case.name), &run.container, Some(&run.case.solar_pv));
    if args.json {
        println!("{}", crate::report::format_summary_json(&summary)?);
    } else {
        print!("{}", crate::report::format_load_summary(&summary));
    }
    Ok(())
}

/// Resolve the case (or ad-hoc file) and apply every explicit CLI override.
pub fn case_config_from_args(args: &LoadArgs, registry: &CaseRegistry) -> Result<CaseConfig, AppError> {
    let mut case = match &args.file {
        Some(file) => {
            let name = file
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("file")
                .to_string();
            CaseConfig::new(name, EnergyLoadConfig::new(file.clone()))
        }
        None => {
            let root = args
                .project_root
                .clone()
                .or_else(|| env::var_os(PROJECT_ROOT_ENV).map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("."));
            let name = args
                .case
                .clone()
                .or_else(|| env::var(CASE_ENV).ok())
                .unwrap_or_else(|| DEFAULT_CASE.to_string());
            registry.build(&root, &name)?
        }
    };

    let load = &mut case.energy_load;
    if let Some(sheet) = &args.sheet {
        load.sheet = Some(sheet.clone());
    }
    if let Some(column) = &args.datetime_column {
        load.datetime_column = column.clone();
    }
    if let Some(format) = &args.datetime_format {
        load.datetime_format = format.clone();
    }
    if let Some(column) = &args.load_column {
        load.load_column = column.clone();
    }

    let conditioning = &mut load.conditioning;
    if args.interval_minutes.is_some() {
        conditioning.target_interval_minutes = args.interval_minutes;
    }
    if let Some(method) = args.interpolation {
        conditioning.interpolation = method;
    }
    if let Some(tolerance) = args.tolerance_seconds {
        conditioning.irregular_tolerance_seconds = tolerance;
    }
    if args.keep_negative {
        conditioning.treat_negative_as_missing = false;
    }
    if args.always_resample {
        conditioning.resample_only_if_irregular = false;
    }

    if args.no_profile {
        case.solar = None;
    } else if let Some(path) = &args.profile {
        case.solar = Some(ProfileConfig::new(path.clone(), args.resource));
    }
    if let Some(profile) = case.solar.as_mut() {
        if args.synthetic_year {
            profile.time_column = TimeColumnSelector::Synthetic;
        } else if let Some(column) = &args.profile_time_column {
            profile.time_column = TimeColumnSelector::Named(column.clone());
        }
        if let Some(columns) = &args.profile_columns {
            profile.value_columns = Some(columns.clone());
        }
        profile.treat_negative_as_missing = case.energy_load.conditioning.treat_negative_as_missing;
        profile.interpolation = case.energy_load.conditioning.interpolation;
    }

    if let Some(path) = &args.solar_params {
        case.solar_pv = read_solar_params(path)?;
    }
    Ok(case)
}

fn read_solar_params(path: &Path) -> Result<SolarPvParams, AppError> {
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read solar params '{}': {e}", path.display())))?;
    serde_json::from_str(&text)
        .map_err(|e| AppError::new(2, format!("Invalid solar params JSON '{}': {e}", path.display())))
}

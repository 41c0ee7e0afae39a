//! Error types.
//!
//! - [`LoadError`] is the typed failure taxonomy of the ingestion pipeline and
//!   the resource-profile aligner. Every variant names the file involved, and
//!   row-level variants carry the 1-based row number (header row = 1) plus the
//!   raw cell text.
//! - [`AppError`] is what the binary reports: a message plus a process exit code.

use std::path::PathBuf;

use thiserror::Error;

/// Failures raised while loading, conditioning, or aligning series.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("load file not found: {}", .path.display())]
    SourceNotFound { path: PathBuf },

    #[error("unsupported file extension '.{extension}' for {}", .path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode {}: {message}", .path.display())]
    Source { path: PathBuf, message: String },

    #[error("no rows with a valid datetime were parsed from {}", .path.display())]
    EmptySource { path: PathBuf },

    #[error(
        "missing required column '{column}' in {}{}. Found columns: {found:?}",
        .path.display(),
        fallback_note(.unit_fallback)
    )]
    MissingColumn {
        path: PathBuf,
        column: String,
        found: Vec<String>,
        unit_fallback: bool,
    },

    #[error("{}: row {row}: failed datetime parse '{value}': {reason}", .path.display())]
    DateParse {
        path: PathBuf,
        row: usize,
        value: String,
        reason: String,
    },

    #[error("{}: row {row}: failed numeric parse for column '{column}' value '{value}'", .path.display())]
    ValueParse {
        path: PathBuf,
        row: usize,
        column: String,
        value: String,
    },

    #[error("invalid container built from {}: missing or inconsistent {}", .path.display(), .fields.join(", "))]
    Validation { path: PathBuf, fields: Vec<String> },

    #[error("resource profile file not found: {}", .path.display())]
    MissingFile { path: PathBuf },

    #[error("no data rows in resource profile {}", .path.display())]
    EmptyProfile { path: PathBuf },

    #[error("no numeric columns in resource profile {}. Found: {found:?}", .path.display())]
    NoNumericColumns { path: PathBuf, found: Vec<String> },

    #[error(
        "cannot infer a one-year time step from {rows} rows in {} (expected e.g. 8760, 35040, 105120)",
        .path.display()
    )]
    InvalidProfileLength { path: PathBuf, rows: usize },

    #[error("container has no time axis; load the primary series before aligning {}", .path.display())]
    MissingTimeAxis { path: PathBuf },

    #[error("unknown case '{name}'. Valid cases: {}", .available.join(", "))]
    UnknownCase { name: String, available: Vec<String> },
}

fn fallback_note(unit_fallback: &bool) -> &'static str {
    if *unit_fallback {
        ". No fallback '(kW)'/'(kWh)' column was detected"
    } else {
        ""
    }
}

impl LoadError {
    /// Exit code used when this error terminates the binary.
    pub fn exit_code(&self) -> u8 {
        match self {
            LoadError::EmptySource { .. } | LoadError::EmptyProfile { .. } => 3,
            LoadError::Validation { .. } => 4,
            _ => 2,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

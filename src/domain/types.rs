//! Shared domain types.
//!
//! These are the configuration values a caller hands to the loaders. They are
//! serializable so a resolved configuration can be echoed in reports.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// How the datetime column is encoded.
///
/// Parsed from text: `matlab_serial`, `excel_serial`, `auto` (or empty) select
/// the corresponding mode; anything else is a chrono `strftime` pattern.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatetimeFormat {
    /// Explicit chrono pattern, e.g. `%m/%d/%Y %H:%M`.
    Pattern(String),
    /// Days since proleptic year 0 (ordinal + 366), fraction = time of day.
    MatlabSerial,
    /// Days since 1899-12-31 with the 1900 leap-year defect.
    ExcelSerial,
    /// Decide from the first non-blank datetime cell.
    #[default]
    Auto,
}

impl FromStr for DatetimeFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Ok(match trimmed.to_ascii_lowercase().as_str() {
            "" | "auto" => DatetimeFormat::Auto,
            "matlab_serial" => DatetimeFormat::MatlabSerial,
            "excel_serial" => DatetimeFormat::ExcelSerial,
            _ => DatetimeFormat::Pattern(trimmed.to_string()),
        })
    }
}

impl From<String> for DatetimeFormat {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(format) => format,
            Err(never) => match never {},
        }
    }
}

impl From<DatetimeFormat> for String {
    fn from(value: DatetimeFormat) -> Self {
        value.to_string()
    }
}

impl fmt::Display for DatetimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatetimeFormat::Pattern(p) => write!(f, "{p}"),
            DatetimeFormat::MatlabSerial => write!(f, "matlab_serial"),
            DatetimeFormat::ExcelSerial => write!(f, "excel_serial"),
            DatetimeFormat::Auto => write!(f, "auto"),
        }
    }
}

/// Gap-fill method used after masking and (optional) resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InterpolationMethod {
    /// Straight line between neighbouring valid samples, by position.
    #[default]
    Linear,
    /// Copy the closest valid sample, by position.
    Nearest,
    /// Straight line weighted by elapsed time between samples.
    Time,
}

/// Which worksheet to read from a workbook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

impl Default for SheetSelector {
    fn default() -> Self {
        SheetSelector::Index(0)
    }
}

impl FromStr for SheetSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Ok(match s.parse::<usize>() {
            Ok(idx) => SheetSelector::Index(idx),
            Err(_) => SheetSelector::Name(s.to_string()),
        })
    }
}

impl fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SheetSelector::Index(idx) => write!(f, "#{idx}"),
            SheetSelector::Name(name) => write!(f, "'{name}'"),
        }
    }
}

/// Unit inferred from a column header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesUnit {
    #[serde(rename = "kW")]
    Kw,
    #[serde(rename = "kWh")]
    Kwh,
    #[serde(rename = "unknown")]
    Unknown,
}

impl SeriesUnit {
    pub fn label(self) -> &'static str {
        match self {
            SeriesUnit::Kw => "kW",
            SeriesUnit::Kwh => "kWh",
            SeriesUnit::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SeriesUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A resolved value column: display name, inferred unit and storage key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesColumn {
    pub name: String,
    pub unit: SeriesUnit,
    pub key: String,
}

/// Kind of periodic resource profile. Selects the key prefix in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    #[default]
    Solar,
    Wind,
    Hydro,
}

impl ResourceKind {
    pub fn key_prefix(self) -> &'static str {
        match self {
            ResourceKind::Solar => "solar_production",
            ResourceKind::Wind => "wind_production",
            ResourceKind::Hydro => "hydro_production",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Solar => "solar",
            ResourceKind::Wind => "wind",
            ResourceKind::Hydro => "hydro",
        }
    }
}

/// How the profile aligner finds the profile's own time axis.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeColumnSelector {
    /// Well-known names, then a first-column sniff, then a synthetic year.
    #[default]
    Auto,
    /// This column must exist and holds the profile timestamps.
    Named(String),
    /// The file has no time column; always synthesize one reference year.
    Synthetic,
}

/// Masking / resampling / gap-fill policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditioningConfig {
    /// Target grid spacing; `None` disables resampling.
    pub target_interval_minutes: Option<u32>,
    pub interpolation: InterpolationMethod,
    pub treat_negative_as_missing: bool,
    /// Only resample when some timestamp is off the target grid.
    pub resample_only_if_irregular: bool,
    /// Largest distance (seconds) to the nearest grid line still treated as on-grid.
    pub irregular_tolerance_seconds: f64,
}

impl Default for ConditioningConfig {
    fn default() -> Self {
        Self {
            target_interval_minutes: None,
            interpolation: InterpolationMethod::Linear,
            treat_negative_as_missing: true,
            resample_only_if_irregular: true,
            irregular_tolerance_seconds: 60.0,
        }
    }
}

/// Where and how to read the primary load file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyLoadConfig {
    pub path: PathBuf,
    /// Workbooks only; ignored for delimited text.
    pub sheet: Option<SheetSelector>,
    pub datetime_column: String,
    pub datetime_format: DatetimeFormat,
    /// Preferred value column. When absent, every `(kW)`/`(kWh)` header is loaded.
    pub load_column: String,
    pub conditioning: ConditioningConfig,
}

impl EnergyLoadConfig {
    pub const DEFAULT_DATETIME_COLUMN: &'static str = "Date";
    pub const DEFAULT_LOAD_COLUMN: &'static str = "Electric Demand (kW)";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            sheet: None,
            datetime_column: Self::DEFAULT_DATETIME_COLUMN.to_string(),
            datetime_format: DatetimeFormat::Auto,
            load_column: Self::DEFAULT_LOAD_COLUMN.to_string(),
            conditioning: ConditioningConfig::default(),
        }
    }
}

/// Where and how to read a periodic resource profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub path: PathBuf,
    pub resource: ResourceKind,
    pub sheet: Option<SheetSelector>,
    pub time_column: TimeColumnSelector,
    /// Explicit value columns; `None` means every numeric non-time column.
    pub value_columns: Option<Vec<String>>,
    pub treat_negative_as_missing: bool,
    pub interpolation: InterpolationMethod,
}

impl ProfileConfig {
    pub fn new(path: impl Into<PathBuf>, resource: ResourceKind) -> Self {
        Self {
            path: path.into(),
            resource,
            sheet: None,
            time_column: TimeColumnSelector::Auto,
            value_columns: None,
            treat_negative_as_missing: true,
            interpolation: InterpolationMethod::Linear,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_format_parses_keywords_and_patterns() {
        assert_eq!("".parse::<DatetimeFormat>().unwrap(), DatetimeFormat::Auto);
        assert_eq!("AUTO".parse::<DatetimeFormat>().unwrap(), DatetimeFormat::Auto);
        assert_eq!(
            "matlab_serial".parse::<DatetimeFormat>().unwrap(),
            DatetimeFormat::MatlabSerial
        );
        assert_eq!(
            "excel_serial".parse::<DatetimeFormat>().unwrap(),
            DatetimeFormat::ExcelSerial
        );
        assert_eq!(
            "%Y-%m-%d %H:%M".parse::<DatetimeFormat>().unwrap(),
            DatetimeFormat::Pattern("%Y-%m-%d %H:%M".to_string())
        );
    }

    #[test]
    fn sheet_selector_prefers_index_for_digits() {
        assert_eq!("2".parse::<SheetSelector>().unwrap(), SheetSelector::Index(2));
        assert_eq!(
            "LoadData".parse::<SheetSelector>().unwrap(),
            SheetSelector::Name("LoadData".to_string())
        );
    }
}

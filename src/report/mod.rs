//! Reporting utilities: per-series statistics and load summaries.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::ResolvedProfileParams;
use crate::domain::{CanonicalContainer, PROFILE_UNIT, ResourceKind};

pub mod format;

pub use format::*;

/// min/mean/max/total of one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesStats {
    pub key: String,
    pub unit: String,
    pub min: f64,
    pub mean: f64,
    pub max: f64,
    pub total: f64,
}

/// Everything printed for one load, text or JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadSummary {
    pub case: Option<String>,
    pub source: String,
    pub rows: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub interval_hours: Option<f64>,
    pub resampled: bool,
    pub load_columns: Vec<String>,
    pub series: Vec<SeriesStats>,
    pub profiles: Vec<ProfileSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileSummary {
    pub resource: ResourceKind,
    pub source: String,
    pub time_column: Option<String>,
    pub series: Vec<SeriesStats>,
    /// Technology parameters per profile key (solar only).
    pub params: Vec<ResolvedProfileParams>,
}

/// Statistics for `values`, or `None` when empty.
pub fn series_stats(key: &str, unit: &str, values: &[f64]) -> Option<SeriesStats> {
    if values.is_empty() {
        return None;
    }
    let total: f64 = values.iter().sum();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some(SeriesStats {
        key: key.to_string(),
        unit: unit.to_string(),
        min,
        mean: total / values.len() as f64,
        max,
        total,
    })
}

/// Summarize a loaded container. `solar_params` resolves per-profile parameters for solar keys.
pub fn summarize(
    case: Option<&str>,
    container: &CanonicalContainer,
    solar_params: Option<&crate::config::SolarPvParams>,
) -> LoadSummary {
    let meta = &container.metadata;

    let series = container
        .load_series()
        .filter_map(|(key, values)| {
            let unit = meta
                .units_by_series
                .get(key)
                .map_or("unknown", |u| u.resolved.label());
            series_stats(key, unit, values)
        })
        .collect();

    let profiles = meta
        .profiles
        .iter()
        .map(|(kind, profile)| ProfileSummary {
            resource: *kind,
            source: profile.source_path.display().to_string(),
            time_column: profile.time_column.clone(),
            series: profile
                .keys
                .iter()
                .filter_map(|key| {
                    let values = container.series.get(key)?;
                    series_stats(key, PROFILE_UNIT, values)
                })
                .collect(),
            params: match (kind, solar_params) {
                (ResourceKind::Solar, Some(params)) => params.resolve(&profile.keys),
                _ => Vec::new(),
            },
        })
        .collect();

    LoadSummary {
        case: case.map(str::to_string),
        source: meta.source_path.display().to_string(),
        rows: container.len(),
        start: container.datetimes.first().copied(),
        end: container.datetimes.last().copied(),
        interval_hours: meta.interval_hours,
        resampled: meta.resampled,
        load_columns: meta.load_columns.clone(),
        series,
        profiles,
    }
}

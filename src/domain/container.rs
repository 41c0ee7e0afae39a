//! The canonical time-indexed container produced by a load.
//!
//! One container is built per load call. After construction its only mutation
//! is the resource-profile aligner adding `<kind>_production__*` series.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::{ResourceKind, SeriesUnit};
use crate::error::LoadError;

/// Declared unit of every loaded energy series.
pub const ENERGY_UNIT: &str = "kWh";

/// Declared unit of aligned resource profiles (energy yield per unit capacity).
pub const PROFILE_UNIT: &str = "kWh/kW";

/// Tolerance (hours) when checking consecutive steps against `interval_hours`.
const INTERVAL_EPS_HOURS: f64 = 1e-9;

/// Original and resolved unit of one loaded series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesUnits {
    pub original: SeriesUnit,
    /// `kWh` after conversion, or `unknown` when the header named no unit.
    pub resolved: SeriesUnit,
}

/// What the aligner recorded for one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileMetadata {
    pub source_path: PathBuf,
    pub keys: Vec<String>,
    pub columns: Vec<String>,
    pub units: String,
    /// `None` when the axis was synthesized from the row count.
    pub time_column: Option<String>,
    /// Native sampling interval of a synthesized axis.
    pub native_interval_minutes: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerMetadata {
    pub source_path: PathBuf,
    /// Constant step of the time axis, if the axis is regular.
    pub interval_hours: Option<f64>,
    /// How far (seconds) a timestamp may sit off the `interval_hours` grid.
    pub interval_tolerance_seconds: f64,
    pub load_units: String,
    pub units_by_series: BTreeMap<String, SeriesUnits>,
    /// Selected source columns, in selection order.
    pub load_columns: Vec<String>,
    /// Series keys, parallel to `load_columns`.
    pub load_keys: Vec<String>,
    pub primary_load_column: String,
    pub resampled: bool,
    pub profiles: BTreeMap<ResourceKind, ProfileMetadata>,
}

/// Canonical multi-series time base.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalContainer {
    /// Zero-based index range, same length as `datetimes`.
    pub time: Vec<usize>,
    /// Strictly increasing time axis.
    pub datetimes: Vec<NaiveDateTime>,
    /// MATLAB serial of each timestamp.
    pub time_serial: Vec<f64>,
    pub series: BTreeMap<String, Vec<f64>>,
    pub metadata: ContainerMetadata,
}

impl CanonicalContainer {
    pub fn len(&self) -> usize {
        self.datetimes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datetimes.is_empty()
    }

    /// Loaded energy series in selection order.
    pub fn load_series(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.metadata
            .load_keys
            .iter()
            .filter_map(|key| self.series.get(key).map(|v| (key.as_str(), v.as_slice())))
    }

    /// Check the structural invariants; every violated field is named.
    pub fn validate(&self) -> Result<(), LoadError> {
        let mut fields = Vec::new();

        if self.datetimes.is_empty() {
            fields.push("datetime".to_string());
        } else if self.datetimes.windows(2).any(|w| w[1] <= w[0]) {
            fields.push("datetime (not strictly increasing)".to_string());
        }
        if self.time.len() != self.datetimes.len() || self.time.iter().enumerate().any(|(i, t)| *t != i) {
            fields.push("time".to_string());
        }
        if self.time_serial.len() != self.datetimes.len() {
            fields.push("time_serial".to_string());
        }
        if self.metadata.load_keys.is_empty() {
            fields.push("load_keys".to_string());
        }
        for key in &self.metadata.load_keys {
            if !self.series.contains_key(key) {
                fields.push(format!("series '{key}'"));
            }
        }
        for (key, values) in &self.series {
            if values.len() != self.datetimes.len() {
                fields.push(format!("series '{key}' (length {} != {})", values.len(), self.datetimes.len()));
            }
        }
        if let Some(dt) = self.metadata.interval_hours {
            let consistent = dt.is_finite() && dt > 0.0 && self.on_interval_grid(dt);
            if !consistent {
                fields.push("interval_hours".to_string());
            }
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(LoadError::Validation {
                path: self.metadata.source_path.clone(),
                fields,
            })
        }
    }

    /// Every timestamp lies within the tolerance of `first + i * dt`. The first
    /// timestamp may itself be off-grid, so the allowed drift is twice the tolerance.
    fn on_interval_grid(&self, dt: f64) -> bool {
        let Some(first) = self.datetimes.first() else {
            return true;
        };
        let slack_hours = 2.0 * self.metadata.interval_tolerance_seconds.max(0.0) / 3600.0 + INTERVAL_EPS_HOURS;
        self.datetimes
            .iter()
            .enumerate()
            .all(|(i, t)| (step_hours(*first, *t) - i as f64 * dt).abs() < slack_hours)
    }
}

/// Hours between two timestamps.
pub fn step_hours(a: NaiveDateTime, b: NaiveDateTime) -> f64 {
    (b - a).num_milliseconds() as f64 / 3_600_000.0
}

/// The constant step of `datetimes` in hours, if every step is equal.
pub fn regular_interval_hours(datetimes: &[NaiveDateTime]) -> Option<f64> {
    let first = datetimes.windows(2).next().map(|w| step_hours(w[0], w[1]))?;
    if first <= 0.0 {
        return None;
    }
    datetimes
        .windows(2)
        .all(|w| (step_hours(w[0], w[1]) - first).abs() < INTERVAL_EPS_HOURS)
        .then_some(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hour(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn container(datetimes: Vec<NaiveDateTime>, values: Vec<f64>) -> CanonicalContainer {
        let n = datetimes.len();
        let mut series = BTreeMap::new();
        series.insert("electricity_load__electric_load_kw".to_string(), values);
        CanonicalContainer {
            time: (0..n).collect(),
            time_serial: vec![0.0; n],
            datetimes,
            series,
            metadata: ContainerMetadata {
                source_path: PathBuf::from("loads.csv"),
                interval_hours: Some(1.0),
                interval_tolerance_seconds: 0.0,
                load_units: ENERGY_UNIT.to_string(),
                units_by_series: BTreeMap::new(),
                load_columns: vec!["Electric Demand (kW)".to_string()],
                load_keys: vec!["electricity_load__electric_load_kw".to_string()],
                primary_load_column: "Electric Demand (kW)".to_string(),
                resampled: false,
                profiles: BTreeMap::new(),
            },
        }
    }

    #[test]
    fn valid_container_passes() {
        let c = container(vec![hour(0), hour(1), hour(2)], vec![1.0, 2.0, 3.0]);
        assert!(c.validate().is_ok());
        assert_eq!(c.load_series().count(), 1);
    }

    #[test]
    fn validation_names_every_broken_field() {
        let mut c = container(vec![hour(0), hour(2)], vec![1.0]);
        c.metadata.load_keys.push("electricity_load__missing".to_string());

        let Err(LoadError::Validation { fields, .. }) = c.validate() else {
            panic!("expected validation error");
        };
        assert!(fields.iter().any(|f| f.starts_with("series 'electricity_load__missing'")));
        assert!(fields.iter().any(|f| f.contains("length 1 != 2")));
        assert!(fields.iter().any(|f| f == "interval_hours"));
    }

    #[test]
    fn empty_axis_is_reported() {
        let c = container(Vec::new(), Vec::new());
        let Err(LoadError::Validation { fields, .. }) = c.validate() else {
            panic!("expected validation error");
        };
        assert_eq!(fields[0], "datetime");
    }

    #[test]
    fn interval_check_honours_tolerance() {
        let jittered = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap().and_hms_opt(1, 0, 30).unwrap();
        let mut c = container(vec![hour(0), jittered, hour(2)], vec![1.0, 2.0, 3.0]);
        assert!(c.validate().is_err());

        c.metadata.interval_tolerance_seconds = 60.0;
        assert!(c.validate().is_ok());

        // A missing slot is never within tolerance.
        let mut gap = container(vec![hour(0), hour(1), hour(3)], vec![1.0, 2.0, 3.0]);
        gap.metadata.interval_tolerance_seconds = 60.0;
        assert!(gap.validate().is_err());
    }

    #[test]
    fn regular_interval_detects_gaps() {
        assert_eq!(regular_interval_hours(&[hour(0), hour(1), hour(2)]), Some(1.0));
        assert_eq!(regular_interval_hours(&[hour(0), hour(1), hour(3)]), None);
        assert_eq!(regular_interval_hours(&[hour(0)]), None);
    }
}

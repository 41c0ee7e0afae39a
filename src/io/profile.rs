//! Resource-profile alignment.
//!
//! A profile (solar capacity factor, wind or hydro yield per unit capacity)
//! covers one generic year. It is projected onto the container's time axis by
//! *time-of-year* (minutes since January 1 of each timestamp's own year), so
//! the profile's calendar year never matters.

use std::path::Path;
use std::sync::LazyLock;

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use tracing::{debug, info, warn};

use crate::domain::{CanonicalContainer, PROFILE_UNIT, ProfileConfig, ProfileMetadata, TimeColumnSelector};
use crate::error::LoadError;
use crate::io::columns::{dedup_headers, series_slug, unique_keys};
use crate::io::datetime::{decode_datetime, resolve_auto_mode};
use crate::io::source::{Cell, Table, read_table};
use crate::math::{epoch_seconds, fill_gaps, interval_minutes_for_year, minutes_of_year, reference_year_start};
use crate::series::mask_values;

/// Header names recognised as a profile time column, in priority order.
pub const TIME_COLUMN_CANDIDATES: &[&str] = &["Date", "Time", "datetime", "Timestamp", "date", "time"];

/// Smallest leading number taken to be a serial date when sniffing the first column.
const SERIAL_SNIFF_MIN: f64 = 2e4;

static DATE_LIKE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}|\d{1,2}/\d{1,2}/\d{2,4})").expect("date-like pattern is valid")
});

/// Profile samples on their native axis, sorted by time-of-year.
#[derive(Debug, Clone, PartialEq)]
struct NativeProfile {
    minutes: Vec<f64>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Align the profile at `config.path` onto `container` and add its series.
///
/// Each numeric profile column becomes `<kind>_production__<slug>` in kWh/kW.
/// Aligning the same resource kind again replaces the earlier series.
pub fn align_resource_profile(container: &mut CanonicalContainer, config: &ProfileConfig) -> Result<(), LoadError> {
    let path = config.path.as_path();
    if !path.exists() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    if container.is_empty() {
        return Err(LoadError::MissingTimeAxis {
            path: path.to_path_buf(),
        });
    }

    let mut table = read_table(path, config.sheet.as_ref())?;
    table.drop_empty_columns();
    if table.rows.is_empty() || table.headers.is_empty() {
        return Err(LoadError::EmptyProfile {
            path: path.to_path_buf(),
        });
    }
    table.headers = dedup_headers(&table.headers);

    let time_idx = detect_time_column(&table, &config.time_column, path)?;
    let value_idx = select_value_columns(&table, time_idx, config.value_columns.as_deref(), path)?;
    let value_names: Vec<String> = value_idx.iter().map(|&i| table.headers[i].clone()).collect();

    let (native, native_interval_minutes) = match time_idx {
        Some(idx) => (timed_profile(&table, idx, &value_idx, path)?, None),
        None => {
            let (profile, minutes) = synthetic_profile(&table, &value_idx, path)?;
            (profile, Some(minutes))
        }
    };
    if native.minutes.is_empty() {
        return Err(LoadError::EmptyProfile {
            path: path.to_path_buf(),
        });
    }

    let dt_hours = container.metadata.interval_hours.unwrap_or_else(|| {
        warn!(path = %path.display(), "container has no fixed interval; scaling profile by 1 hour");
        1.0
    });

    let picks = nearest_samples(&native.minutes, &container.datetimes);
    let positions: Vec<f64> = container.datetimes.iter().map(|dt| epoch_seconds(*dt) as f64).collect();
    let keys = unique_keys(config.resource.key_prefix(), value_names.iter().map(|n| series_slug(n)));

    let mut aligned = Vec::with_capacity(keys.len());
    for (key, column) in keys.iter().zip(&native.columns) {
        let picked: Vec<Option<f64>> = picks.iter().map(|&i| column[i]).collect();
        let masked = mask_values(&picked, config.treat_negative_as_missing);
        let mut values = fill_gaps(&masked, &positions, config.interpolation).ok_or_else(|| LoadError::Validation {
            path: path.to_path_buf(),
            fields: vec![format!("{key} (no valid samples)")],
        })?;
        values.iter_mut().for_each(|v| *v *= dt_hours);
        aligned.push(values);
    }

    if let Some(previous) = container.metadata.profiles.remove(&config.resource) {
        for key in previous.keys {
            container.series.remove(&key);
        }
    }
    for (key, values) in keys.iter().zip(aligned) {
        container.series.insert(key.clone(), values);
    }

    let time_column = time_idx.map(|i| table.headers[i].clone());
    info!(
        resource = config.resource.name(),
        path = %path.display(),
        keys = ?keys,
        time_column = ?time_column,
        dt_hours,
        "aligned resource profile"
    );
    container.metadata.profiles.insert(
        config.resource,
        ProfileMetadata {
            source_path: path.to_path_buf(),
            keys,
            columns: value_names,
            units: PROFILE_UNIT.to_string(),
            time_column,
            native_interval_minutes,
        },
    );
    Ok(())
}

fn detect_time_column(table: &Table, selector: &TimeColumnSelector, path: &Path) -> Result<Option<usize>, LoadError> {
    match selector {
        TimeColumnSelector::Synthetic => Ok(None),
        TimeColumnSelector::Named(name) => table
            .column_index(name)
            .map(Some)
            .ok_or_else(|| LoadError::MissingColumn {
                path: path.to_path_buf(),
                column: name.clone(),
                found: table.headers.clone(),
                unit_fallback: false,
            }),
        TimeColumnSelector::Auto => {
            if let Some(idx) = TIME_COLUMN_CANDIDATES.iter().find_map(|c| table.column_index(c)) {
                debug!(column = %table.headers[idx], "profile time column found by name");
                return Ok(Some(idx));
            }
            if first_column_looks_like_time(table) {
                debug!(column = %table.headers[0], "profile time column sniffed from first column");
                return Ok(Some(0));
            }
            Ok(None)
        }
    }
}

/// A first column holding serial-range numbers or date-like text is a time axis.
fn first_column_looks_like_time(table: &Table) -> bool {
    let mut cells = table.rows.iter().map(|r| r.cell(0)).filter(|c| !c.is_empty());
    match cells.next() {
        None => false,
        Some(Cell::DateTime(_)) => true,
        Some(first) => match first.as_f64() {
            Some(v) => v >= SERIAL_SNIFF_MIN,
            None => std::iter::once(first)
                .chain(cells)
                .any(|c| matches!(c, Cell::Text(s) if DATE_LIKE.is_match(s))),
        },
    }
}

/// A column is numeric when every non-blank cell parses as a number.
fn is_numeric_column(table: &Table, col: usize) -> bool {
    let mut non_blank = table.rows.iter().map(|r| r.cell(col)).filter(|c| !c.is_empty()).peekable();
    non_blank.peek().is_some() && non_blank.all(|c| c.as_f64().is_some())
}

fn select_value_columns(
    table: &Table,
    time_idx: Option<usize>,
    explicit: Option<&[String]>,
    path: &Path,
) -> Result<Vec<usize>, LoadError> {
    let candidates: Vec<usize> = match explicit {
        Some(names) => names
            .iter()
            .map(|name| {
                table.column_index(name).ok_or_else(|| LoadError::MissingColumn {
                    path: path.to_path_buf(),
                    column: name.clone(),
                    found: table.headers.clone(),
                    unit_fallback: false,
                })
            })
            .collect::<Result<_, _>>()?,
        None => (0..table.headers.len()).filter(|i| Some(*i) != time_idx).collect(),
    };

    let numeric: Vec<usize> = candidates.iter().copied().filter(|&i| is_numeric_column(table, i)).collect();
    if numeric.is_empty() {
        return Err(LoadError::NoNumericColumns {
            path: path.to_path_buf(),
            found: candidates.iter().map(|&i| table.headers[i].clone()).collect(),
        });
    }
    Ok(numeric)
}

fn numeric_cells(table: &Table, row: usize, value_idx: &[usize]) -> Vec<Option<f64>> {
    value_idx.iter().map(|&col| table.rows[row].cell(col).as_f64()).collect()
}

/// Profile on its own time column. Rows whose time cell does not decode are dropped.
fn timed_profile(table: &Table, time_idx: usize, value_idx: &[usize], path: &Path) -> Result<NativeProfile, LoadError> {
    let first = table
        .rows
        .iter()
        .map(|r| r.cell(time_idx))
        .find(|c| !c.is_empty());
    let Some(first) = first else {
        return Err(LoadError::EmptyProfile {
            path: path.to_path_buf(),
        });
    };
    let mode = resolve_auto_mode(first).map_err(|reason| LoadError::DateParse {
        path: path.to_path_buf(),
        row: table.rows.iter().find(|r| !r.cell(time_idx).is_empty()).map_or(2, |r| r.line),
        value: first.raw(),
        reason,
    })?;

    let mut samples: Vec<(f64, Vec<Option<f64>>)> = Vec::with_capacity(table.rows.len());
    let mut dropped = 0usize;
    for (i, row) in table.rows.iter().enumerate() {
        match decode_datetime(row.cell(time_idx), &mode) {
            Ok(dt) => samples.push((minutes_of_year(dt), numeric_cells(table, i, value_idx))),
            Err(_) => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!(dropped, "profile rows with undecodable time dropped");
    }
    Ok(collect_sorted(samples, value_idx.len()))
}

/// Profile without a time column: one reference year at an interval implied by its row count.
fn synthetic_profile(table: &Table, value_idx: &[usize], path: &Path) -> Result<(NativeProfile, u32), LoadError> {
    let rows = table.rows.len();
    let interval = interval_minutes_for_year(rows).ok_or_else(|| LoadError::InvalidProfileLength {
        path: path.to_path_buf(),
        rows,
    })?;
    let start = reference_year_start();
    debug!(rows, interval_minutes = interval, "synthesized reference-year axis");

    let samples = (0..rows)
        .map(|i| {
            let dt: NaiveDateTime = start + Duration::minutes(i as i64 * i64::from(interval));
            (minutes_of_year(dt), numeric_cells(table, i, value_idx))
        })
        .collect();
    Ok((collect_sorted(samples, value_idx.len()), interval))
}

/// Sort by time-of-year; on a repeated time-of-year the first sample wins.
fn collect_sorted(mut samples: Vec<(f64, Vec<Option<f64>>)>, n_columns: usize) -> NativeProfile {
    samples.sort_by(|a, b| a.0.total_cmp(&b.0));
    samples.dedup_by(|later, earlier| later.0 == earlier.0);

    let minutes = samples.iter().map(|s| s.0).collect();
    let columns = (0..n_columns)
        .map(|c| samples.iter().map(|s| s.1[c]).collect())
        .collect();
    NativeProfile { minutes, columns }
}

/// For each target timestamp, the index of the profile sample nearest in
/// time-of-year. Targets past the profile's last sample clamp onto it.
fn nearest_samples(profile_minutes: &[f64], targets: &[NaiveDateTime]) -> Vec<usize> {
    let last = profile_minutes.len().saturating_sub(1);
    let max = profile_minutes.last().copied().unwrap_or(0.0);

    targets
        .iter()
        .map(|dt| {
            let t = minutes_of_year(*dt).min(max);
            let upper = profile_minutes.partition_point(|m| *m < t);
            if upper == 0 {
                0
            } else if upper > last {
                last
            } else if t - profile_minutes[upper - 1] <= profile_minutes[upper] - t {
                upper - 1
            } else {
                upper
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    use crate::domain::{EnergyLoadConfig, ResourceKind};
    use crate::io::ingest::load_energy_load;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::File::create(&path).unwrap().write_all(body.as_bytes()).unwrap();
        path
    }

    fn container(dir: &tempfile::TempDir, body: &str) -> CanonicalContainer {
        let path = write_file(dir, "loads.csv", body);
        load_energy_load(&EnergyLoadConfig::new(path)).unwrap()
    }

    const TWO_HOURS: &str = "Date,Electric Demand (kW)\n1/1/2022 0:00,10.0\n1/1/2022 1:00,11.5\n";

    #[test]
    fn constant_8760_profile_without_time_column() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(&dir, TWO_HOURS);
        let body = format!("solar_cf\n{}\n", vec!["0.5"; 8760].join("\n"));
        let solar = write_file(&dir, "solar.csv", &body);

        align_resource_profile(&mut c, &ProfileConfig::new(solar, ResourceKind::Solar)).unwrap();

        assert_eq!(c.series["solar_production__solar_cf"], vec![0.5, 0.5]);
        let meta = &c.metadata.profiles[&ResourceKind::Solar];
        assert_eq!(meta.keys, vec!["solar_production__solar_cf"]);
        assert_eq!(meta.units, "kWh/kW");
        assert_eq!(meta.time_column, None);
        assert_eq!(meta.native_interval_minutes, Some(60));
    }

    #[test]
    fn time_column_aligns_across_years() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(
            &dir,
            "Date,Electric Demand (kW)\n1/1/2022 0:00,10.0\n1/1/2022 1:00,0.2\n1/1/2022 2:00,0.3\n",
        );
        let solar = write_file(
            &dir,
            "solar.csv",
            "Date,Capacity Factor\n1/1/2020 0:00,0.10\n1/1/2020 1:00,0.20\n1/1/2020 2:00,0.30\n",
        );

        align_resource_profile(&mut c, &ProfileConfig::new(solar, ResourceKind::Solar)).unwrap();
        let values = &c.series["solar_production__capacity_factor"];
        for (got, want) in values.iter().zip([0.1, 0.2, 0.3]) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
        assert_eq!(c.metadata.profiles[&ResourceKind::Solar].time_column.as_deref(), Some("Date"));
    }

    #[test]
    fn multiple_columns_and_clamped_targets() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(
            &dir,
            "Date,Electric Demand (kW)\n1/1/2022 0:00,10.0\n1/1/2022 1:00,11.0\n1/1/2022 2:00,11.0\n",
        );
        let solar = write_file(
            &dir,
            "solar.csv",
            "Date,Fixed (kW/kW),1D Tracking (kW/kW)\n1/1/2020 0:00,0.0,0.0\n1/1/2020 1:00,0.1,0.15\n",
        );

        align_resource_profile(&mut c, &ProfileConfig::new(solar, ResourceKind::Solar)).unwrap();
        assert_eq!(c.series["solar_production__fixed_kw_kw"], vec![0.0, 0.1, 0.1]);
        assert_eq!(c.series["solar_production__1d_tracking_kw_kw"], vec![0.0, 0.15, 0.15]);
    }

    #[test]
    fn negative_and_blank_samples_are_filled() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(
            &dir,
            "Date,Electric Demand (kW)\n1/1/2022 0:00,10\n1/1/2022 1:00,11\n1/1/2022 2:00,12\n1/1/2022 3:00,13\n",
        );
        let solar = write_file(
            &dir,
            "solar.csv",
            "Date,CF\n1/1/2020 0:00,0.1\n1/1/2020 1:00,-0.5\n1/1/2020 2:00,\n1/1/2020 3:00,0.4\n",
        );

        align_resource_profile(&mut c, &ProfileConfig::new(solar, ResourceKind::Solar)).unwrap();
        let values = &c.series["solar_production__cf"];
        for (got, want) in values.iter().zip([0.1, 0.2, 0.3, 0.4]) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }

    #[test]
    fn profile_scales_by_container_interval() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(
            &dir,
            "Date,Electric Demand (kW)\n1/1/2022 0:00,4\n1/1/2022 0:15,4\n1/1/2022 0:30,4\n",
        );
        let body = format!("wind\n{}\n", vec!["0.4"; 8760].join("\n"));
        let wind = write_file(&dir, "wind.csv", &body);

        align_resource_profile(&mut c, &ProfileConfig::new(wind, ResourceKind::Wind)).unwrap();
        for v in &c.series["wind_production__wind"] {
            assert!((v - 0.1).abs() < 1e-12);
        }
    }

    #[test]
    fn first_column_sniff_finds_serial_dates() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(&dir, TWO_HOURS);
        let solar = write_file(&dir, "solar.csv", "stamp,cf\n43831,0.2\n43831.041666667,0.6\n");

        align_resource_profile(&mut c, &ProfileConfig::new(solar, ResourceKind::Solar)).unwrap();
        assert_eq!(c.metadata.profiles[&ResourceKind::Solar].time_column.as_deref(), Some("stamp"));
        let values = &c.series["solar_production__cf"];
        assert!((values[0] - 0.2).abs() < 1e-12);
        assert!((values[1] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn realigning_a_kind_replaces_its_series() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(&dir, TWO_HOURS);
        let a = write_file(&dir, "a.csv", "Date,alpha\n1/1/2020 0:00,0.1\n1/1/2020 1:00,0.2\n");
        let b = write_file(&dir, "b.csv", "Date,beta\n1/1/2020 0:00,0.3\n1/1/2020 1:00,0.4\n");

        align_resource_profile(&mut c, &ProfileConfig::new(a, ResourceKind::Solar)).unwrap();
        align_resource_profile(&mut c, &ProfileConfig::new(b, ResourceKind::Solar)).unwrap();
        assert!(!c.series.contains_key("solar_production__alpha"));
        assert!(c.series.contains_key("solar_production__beta"));
        assert!(c.series.contains_key("electricity_load__electric_load_kw"));
    }

    #[test]
    fn error_cases() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = container(&dir, TWO_HOURS);

        let missing = ProfileConfig::new(dir.path().join("nope.csv"), ResourceKind::Solar);
        assert!(matches!(align_resource_profile(&mut c, &missing), Err(LoadError::MissingFile { .. })));

        let text = write_file(&dir, "text.csv", "Date,Note\n1/1/2020 0:00,sunny\n");
        assert!(matches!(
            align_resource_profile(&mut c, &ProfileConfig::new(text, ResourceKind::Solar)),
            Err(LoadError::NoNumericColumns { .. })
        ));

        let blank = write_file(&dir, "blank.csv", "cf\n\n\n");
        assert!(matches!(
            align_resource_profile(&mut c, &ProfileConfig::new(blank.clone(), ResourceKind::Solar)),
            Err(LoadError::EmptyProfile { .. })
        ));

        let named = write_file(&dir, "named.csv", "cf\n0.5\n");
        let mut cfg = ProfileConfig::new(named, ResourceKind::Solar);
        cfg.time_column = TimeColumnSelector::Named("When".to_string());
        assert!(matches!(align_resource_profile(&mut c, &cfg), Err(LoadError::MissingColumn { .. })));

        let mut empty = c.clone();
        empty.datetimes.clear();
        let ok_file = write_file(&dir, "ok.csv", "cf\n0.5\n");
        assert!(matches!(
            align_resource_profile(&mut empty, &ProfileConfig::new(ok_file, ResourceKind::Solar)),
            Err(LoadError::MissingTimeAxis { .. })
        ));
    }

    #[test]
    fn nearest_prefers_earlier_on_tie_and_clamps() {
        let minutes = [0.0, 60.0, 120.0];
        let day = chrono::NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let targets = [
            day.and_hms_opt(0, 30, 0).unwrap(),
            day.and_hms_opt(0, 31, 0).unwrap(),
            day.and_hms_opt(5, 0, 0).unwrap(),
        ];
        assert_eq!(nearest_samples(&minutes, &targets), vec![0, 1, 2]);
    }
}

//! Energy-load ingest.
//!
//! Turns one load file into a [`CanonicalContainer`]:
//! - **Strict schema**: the datetime column must exist; value columns are the
//!   preferred column plus any `(kW)`/`(kWh)` header
//! - **Fail fast**: a malformed datetime or value aborts the load with the
//!   row number and raw text
//! - **Deterministic**: stable chronological sort, explicit resample decision
//!
//! Conditioning and unit arithmetic live in `series`; this module is the glue.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::domain::{
    CanonicalContainer, ContainerMetadata, DatetimeFormat, ENERGY_UNIT, EnergyLoadConfig, SeriesColumn, SeriesUnit,
    SeriesUnits, regular_interval_hours,
};
use crate::error::LoadError;
use crate::io::columns::{dedup_headers, load_slug, resolve_datetime_column, resolve_value_columns, unique_keys};
use crate::io::datetime::{decode_datetime, resolve_auto_mode};
use crate::io::source::{Cell, SourceRow, read_table};
use crate::math::to_matlab_serial;
use crate::series::{ConditionError, MAX_RESAMPLE_BUCKETS, condition, infer_unit, resolved_unit, to_energy};

/// Key prefix of every loaded energy series.
pub const LOAD_KEY_PREFIX: &str = "electricity_load";

/// One parsed source row. Values are `None` where the cell was blank.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    pub line: usize,
    pub timestamp: NaiveDateTime,
    pub values: Vec<Option<f64>>,
}

/// Load, condition and assemble the primary energy series.
pub fn load_energy_load(config: &EnergyLoadConfig) -> Result<CanonicalContainer, LoadError> {
    let path = config.path.as_path();
    if !path.exists() {
        return Err(LoadError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }

    let table = read_table(path, config.sheet.as_ref())?;
    let headers = dedup_headers(&table.headers);

    let datetime_idx = resolve_datetime_column(&headers, &config.datetime_column, path)?;
    let value_names = resolve_value_columns(&headers, &config.load_column, path)?;
    let value_idx: Vec<usize> = value_names
        .iter()
        .filter_map(|name| headers.iter().position(|h| h == name))
        .collect();
    info!(
        path = %path.display(),
        datetime_column = %config.datetime_column,
        columns = ?value_names,
        "resolved load columns"
    );

    let mut rows = parse_rows(&table.rows, datetime_idx, &value_names, &value_idx, config)?;
    if rows.is_empty() {
        return Err(LoadError::EmptySource {
            path: path.to_path_buf(),
        });
    }

    // Stable: rows sharing a timestamp keep their source order.
    rows.sort_by_key(|r| r.timestamp);

    let timestamps: Vec<NaiveDateTime> = rows.iter().map(|r| r.timestamp).collect();
    let raw_columns: Vec<Vec<Option<f64>>> = (0..value_names.len())
        .map(|col| rows.iter().map(|r| r.values[col]).collect())
        .collect();

    let conditioned = condition(&timestamps, &raw_columns, &config.conditioning).map_err(|e| match e {
        ConditionError::NoValidSamples { column } => LoadError::Validation {
            path: path.to_path_buf(),
            fields: vec![format!("series '{}' (no valid samples)", value_names[column])],
        },
        ConditionError::GridTooLarge { buckets, interval_secs } => LoadError::Validation {
            path: path.to_path_buf(),
            fields: vec![format!(
                "datetime (span needs {buckets} slots at {} min; limit {MAX_RESAMPLE_BUCKETS})",
                interval_secs / 60
            )],
        },
    })?;

    // With a target the axis is on that grid (resampled, or within tolerance).
    let interval_hours = match conditioned.interval_secs {
        Some(secs) => Some(secs as f64 / 3600.0),
        None => regular_interval_hours(&conditioned.datetimes),
    };
    let interval_tolerance_seconds = if conditioned.interval_secs.is_some() && !conditioned.resampled {
        config.conditioning.irregular_tolerance_seconds
    } else {
        0.0
    };

    let columns: Vec<SeriesColumn> = {
        let keys = unique_keys(LOAD_KEY_PREFIX, value_names.iter().map(|n| load_slug(n)));
        value_names
            .iter()
            .zip(keys)
            .map(|(name, key)| SeriesColumn {
                name: name.clone(),
                unit: infer_unit(name),
                key,
            })
            .collect()
    };

    let mut series = BTreeMap::new();
    let mut units_by_series = BTreeMap::new();
    for (column, mut values) in columns.iter().zip(conditioned.columns) {
        if column.unit == SeriesUnit::Kw {
            let dt = interval_hours.ok_or_else(|| LoadError::Validation {
                path: path.to_path_buf(),
                fields: vec![format!("interval_hours (irregular axis; cannot convert '{}' from kW)", column.name)],
            })?;
            to_energy(&mut values, column.unit, dt);
        }
        units_by_series.insert(
            column.key.clone(),
            SeriesUnits {
                original: column.unit,
                resolved: resolved_unit(column.unit),
            },
        );
        series.insert(column.key.clone(), values);
    }

    let datetimes = conditioned.datetimes;
    let container = CanonicalContainer {
        time: (0..datetimes.len()).collect(),
        time_serial: datetimes.iter().map(|dt| to_matlab_serial(*dt)).collect(),
        datetimes,
        series,
        metadata: ContainerMetadata {
            source_path: path.to_path_buf(),
            interval_hours,
            interval_tolerance_seconds,
            load_units: ENERGY_UNIT.to_string(),
            units_by_series,
            load_columns: columns.iter().map(|c| c.name.clone()).collect(),
            load_keys: columns.iter().map(|c| c.key.clone()).collect(),
            primary_load_column: value_names[0].clone(),
            resampled: conditioned.resampled,
            profiles: BTreeMap::new(),
        },
    };
    container.validate()?;

    info!(
        rows = container.len(),
        series = container.metadata.load_keys.len(),
        interval_hours = ?container.metadata.interval_hours,
        resampled = container.metadata.resampled,
        "load complete"
    );
    Ok(container)
}

fn parse_rows(
    rows: &[SourceRow],
    datetime_idx: usize,
    value_names: &[String],
    value_idx: &[usize],
    config: &EnergyLoadConfig,
) -> Result<Vec<RawRow>, LoadError> {
    let path = config.path.as_path();
    // `auto` is fixed by the first row with a datetime and kept from then on.
    let mut mode = match &config.datetime_format {
        DatetimeFormat::Auto => None,
        explicit => Some(explicit.clone()),
    };

    let mut parsed = Vec::with_capacity(rows.len());
    let mut skipped = 0usize;

    for row in rows {
        let cell = row.cell(datetime_idx);
        if cell.is_empty() {
            skipped += 1;
            continue;
        }

        let date_err = |reason: String| LoadError::DateParse {
            path: path.to_path_buf(),
            row: row.line,
            value: cell.raw(),
            reason,
        };

        if mode.is_none() {
            let resolved = resolve_auto_mode(cell).map_err(date_err)?;
            info!(mode = %resolved, row = row.line, "auto datetime mode fixed");
            mode = Some(resolved);
        }
        let effective = mode.as_ref().unwrap_or(&config.datetime_format);
        let timestamp = decode_datetime(cell, effective).map_err(date_err)?;

        let values = value_idx
            .iter()
            .zip(value_names)
            .map(|(&col, name)| parse_value(row.cell(col)).map_err(|value| LoadError::ValueParse {
                path: path.to_path_buf(),
                row: row.line,
                column: name.clone(),
                value,
            }))
            .collect::<Result<Vec<_>, _>>()?;

        parsed.push(RawRow {
            line: row.line,
            timestamp,
            values,
        });
    }

    if skipped > 0 {
        debug!(skipped, "rows without a datetime skipped");
    }
    Ok(parsed)
}

/// Blank cells are missing; anything else must be numeric. Errors carry the raw text.
fn parse_value(cell: &Cell) -> Result<Option<f64>, String> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::DateTime(_) => Err(cell.raw()),
        _ => cell.as_f64().map(Some).ok_or_else(|| cell.raw()),
    }
}

//! Time conditioning: masking, resampling onto a grid, and gap filling.
//!
//! Input timestamps must already be sorted ascending (stable, so duplicates
//! keep their source order). The output axis is strictly increasing and every
//! value is present.

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, info, warn};

use crate::domain::ConditioningConfig;
use crate::math::{epoch_seconds, fill_gaps, floor_to_grid, grid_distance_seconds};

/// Largest grid a resample may allocate per column.
pub const MAX_RESAMPLE_BUCKETS: usize = 5_000_000;

/// Conditioned axis and columns, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Conditioned {
    pub datetimes: Vec<NaiveDateTime>,
    pub columns: Vec<Vec<f64>>,
    pub resampled: bool,
    /// Grid step the axis sits on (within tolerance), when a target was set.
    pub interval_secs: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionError {
    /// Column `column` had no valid sample left to fill from.
    NoValidSamples { column: usize },
    /// The span would need `buckets` grid slots, more than [`MAX_RESAMPLE_BUCKETS`].
    GridTooLarge { buckets: u64, interval_secs: i64 },
}

/// Replace negative (and non-finite) samples with missing markers.
pub fn mask_values(values: &[Option<f64>], negative_as_missing: bool) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|v| v.filter(|x| x.is_finite() && !(negative_as_missing && *x < 0.0)))
        .collect()
}

/// True when some timestamp lies more than `tolerance_secs` from the grid.
pub fn is_irregular(datetimes: &[NaiveDateTime], interval_secs: i64, tolerance_secs: f64) -> bool {
    datetimes
        .iter()
        .any(|dt| grid_distance_seconds(*dt, interval_secs) as f64 > tolerance_secs)
}

/// True when consecutive distinct timestamps do not land on consecutive grid
/// slots: a slot is missing, or two samples share one.
pub fn has_grid_gaps(datetimes: &[NaiveDateTime], interval_secs: i64) -> bool {
    let slot = |dt: &NaiveDateTime| (epoch_seconds(*dt) + interval_secs / 2).div_euclid(interval_secs);
    datetimes
        .windows(2)
        .filter(|w| w[0] != w[1])
        .any(|w| slot(&w[1]) - slot(&w[0]) != 1)
}

/// Condition parallel `columns` against the sorted `datetimes` axis.
pub fn condition(
    datetimes: &[NaiveDateTime],
    columns: &[Vec<Option<f64>>],
    config: &ConditioningConfig,
) -> Result<Conditioned, ConditionError> {
    let masked: Vec<Vec<Option<f64>>> = columns
        .iter()
        .map(|c| mask_values(c, config.treat_negative_as_missing))
        .collect();

    let interval_secs = config
        .target_interval_minutes
        .filter(|m| *m > 0)
        .map(|m| i64::from(m) * 60);

    // `snap`: the series sits on the grid but misses slots; move samples to
    // their nearest grid point before bucketing so jitter cannot shift a bucket.
    let (resample, snap) = match interval_secs {
        None => (false, false),
        Some(secs) if config.resample_only_if_irregular => {
            let irregular = is_irregular(datetimes, secs, config.irregular_tolerance_seconds);
            let gaps = !irregular && has_grid_gaps(datetimes, secs);
            debug!(irregular, gaps, interval_secs = secs, "irregularity test");
            if gaps {
                info!(interval_secs = secs, "on-grid series has missing or shared slots");
            }
            (irregular || gaps, gaps)
        }
        Some(_) => (true, false),
    };

    let (axis, gappy) = match interval_secs {
        Some(secs) if resample => {
            info!(interval_minutes = secs / 60, rows = datetimes.len(), "resampling onto grid");
            if snap {
                let snapped: Vec<NaiveDateTime> = datetimes
                    .iter()
                    .map(|dt| floor_to_grid(*dt + Duration::seconds(secs / 2), secs))
                    .collect();
                resample_mean(&snapped, &masked, secs)?
            } else {
                resample_mean(datetimes, &masked, secs)?
            }
        }
        _ => collapse_duplicates(datetimes, masked),
    };

    let positions: Vec<f64> = axis.iter().map(|dt| epoch_seconds(*dt) as f64).collect();
    let mut filled = Vec::with_capacity(gappy.len());
    for (column, values) in gappy.iter().enumerate() {
        let missing = values.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            debug!(column, missing, method = ?config.interpolation, "filling gaps");
        }
        let out = fill_gaps(values, &positions, config.interpolation)
            .ok_or(ConditionError::NoValidSamples { column })?;
        filled.push(out);
    }

    Ok(Conditioned {
        datetimes: axis,
        columns: filled,
        resampled: resample,
        interval_secs,
    })
}

/// Mean per grid bucket over `[floor(first), floor(last)]`; empty buckets are missing.
fn resample_mean(
    datetimes: &[NaiveDateTime],
    columns: &[Vec<Option<f64>>],
    interval_secs: i64,
) -> Result<(Vec<NaiveDateTime>, Vec<Vec<Option<f64>>>), ConditionError> {
    let (Some(first), Some(last)) = (datetimes.first(), datetimes.last()) else {
        return Ok((Vec::new(), columns.iter().map(|_| Vec::new()).collect()));
    };
    let start = floor_to_grid(*first, interval_secs);
    let end = floor_to_grid(*last, interval_secs);
    let span = (end - start).num_seconds() / interval_secs;
    let buckets = span.unsigned_abs() + 1;
    if buckets > MAX_RESAMPLE_BUCKETS as u64 {
        return Err(ConditionError::GridTooLarge { buckets, interval_secs });
    }
    let buckets = buckets as usize;

    let axis: Vec<NaiveDateTime> = (0..buckets)
        .map(|i| start + Duration::seconds(i as i64 * interval_secs))
        .collect();

    let bucket_of: Vec<usize> = datetimes
        .iter()
        .map(|dt| ((floor_to_grid(*dt, interval_secs) - start).num_seconds() / interval_secs) as usize)
        .collect();

    let values = columns
        .iter()
        .map(|column| {
            let mut sums = vec![0.0; buckets];
            let mut counts = vec![0usize; buckets];
            for (value, bucket) in column.iter().zip(&bucket_of) {
                if let Some(v) = value {
                    sums[*bucket] += v;
                    counts[*bucket] += 1;
                }
            }
            sums.into_iter()
                .zip(counts)
                .map(|(sum, n)| (n > 0).then(|| sum / n as f64))
                .collect()
        })
        .collect();

    Ok((axis, values))
}

/// Keep the last row of every run of equal timestamps.
fn collapse_duplicates(
    datetimes: &[NaiveDateTime],
    columns: Vec<Vec<Option<f64>>>,
) -> (Vec<NaiveDateTime>, Vec<Vec<Option<f64>>>) {
    let keep: Vec<bool> = (0..datetimes.len())
        .map(|i| datetimes.get(i + 1) != Some(&datetimes[i]))
        .collect();
    let dropped = keep.iter().filter(|k| !**k).count();
    if dropped == 0 {
        return (datetimes.to_vec(), columns);
    }
    warn!(dropped, "duplicate timestamps collapsed to their last occurrence");

    let axis = datetimes
        .iter()
        .zip(&keep)
        .filter_map(|(dt, k)| k.then_some(*dt))
        .collect();
    let columns = columns
        .into_iter()
        .map(|c| c.into_iter().zip(&keep).filter_map(|(v, k)| k.then_some(v)).collect())
        .collect();
    (axis, columns)
}

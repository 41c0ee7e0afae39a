//! Gap filling for series with missing samples.
//!
//! Missing samples are `None`. Filling extends past both ends of the series:
//! leading gaps copy the first valid sample and trailing gaps copy the last,
//! so the result never contains a missing value.

use crate::domain::InterpolationMethod;

/// Fill every `None` in `values`.
///
/// `positions` gives the abscissa of each sample and is only consulted by
/// [`InterpolationMethod::Time`] (e.g. seconds since epoch); `Linear` and
/// `Nearest` work on sample index. Returns `None` when `values` has no valid
/// sample to fill from.
pub fn fill_gaps(values: &[Option<f64>], positions: &[f64], method: InterpolationMethod) -> Option<Vec<f64>> {
    let valid: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();
    let first = *valid.first()?;
    let last = *valid.last()?;

    let mut out = Vec::with_capacity(values.len());
    // Index into `valid` of the last valid sample at or before `i`.
    let mut left = 0usize;

    for (i, value) in values.iter().enumerate() {
        if let Some(v) = value {
            out.push(*v);
            continue;
        }
        if i < first {
            out.push(values[first].unwrap_or_default());
            continue;
        }
        if i > last {
            out.push(values[last].unwrap_or_default());
            continue;
        }
        while left + 1 < valid.len() && valid[left + 1] < i {
            left += 1;
        }
        let lo = valid[left];
        let hi = valid[left + 1];
        let y0 = values[lo].unwrap_or_default();
        let y1 = values[hi].unwrap_or_default();

        let filled = match method {
            InterpolationMethod::Linear => lerp(y0, y1, (i - lo) as f64 / (hi - lo) as f64),
            InterpolationMethod::Nearest => {
                if i - lo <= hi - i {
                    y0
                } else {
                    y1
                }
            }
            InterpolationMethod::Time => {
                let span = positions[hi] - positions[lo];
                if span.abs() < f64::EPSILON {
                    y0
                } else {
                    lerp(y0, y1, (positions[i] - positions[lo]) / span)
                }
            }
        };
        out.push(filled);
    }

    Some(out)
}

fn lerp(y0: f64, y1: f64, t: f64) -> f64 {
    y0 + (y1 - y0) * t
}

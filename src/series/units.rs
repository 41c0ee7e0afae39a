//! Unit inference from header text and power-to-energy conversion.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::SeriesUnit;

static KWH_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bkwh\b").expect("kwh pattern is valid"));
static KW_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bkw\b").expect("kw pattern is valid"));

/// Unit named by a column header. `kWh` wins when both words appear.
pub fn infer_unit(header: &str) -> SeriesUnit {
    if KWH_WORD.is_match(header) {
        SeriesUnit::Kwh
    } else if KW_WORD.is_match(header) {
        SeriesUnit::Kw
    } else {
        SeriesUnit::Unknown
    }
}

/// Unit a series carries after conversion.
pub fn resolved_unit(original: SeriesUnit) -> SeriesUnit {
    match original {
        SeriesUnit::Kw | SeriesUnit::Kwh => SeriesUnit::Kwh,
        SeriesUnit::Unknown => SeriesUnit::Unknown,
    }
}

/// Convert `values` in place to energy per interval.
///
/// Only `kW` series change (average power times `dt_hours`); `kWh` and
/// unknown series pass through.
pub fn to_energy(values: &mut [f64], unit: SeriesUnit, dt_hours: f64) {
    if unit == SeriesUnit::Kw {
        values.iter_mut().for_each(|v| *v *= dt_hours);
    }
}

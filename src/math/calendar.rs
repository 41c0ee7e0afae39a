//! Calendar arithmetic: serial-date epochs, time-of-year and grid flooring.
//!
//! Serial conventions:
//!
//! - MATLAB `datenum`: day 1 is 0000-01-01 (proleptic), which is the
//!   common-era ordinal plus 366.
//! - Excel 1900 system: day 1 is 1900-01-01, and day 60 is the nonexistent
//!   1900-02-29. Serials from 61 on are one day ahead of the real calendar.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Offset between MATLAB serial days and chrono's days-from-CE.
const MATLAB_CE_OFFSET: i64 = 366;

/// First Excel serial that is shifted by the fictitious 1900-02-29.
const EXCEL_LEAP_BUG_SERIAL: i64 = 61;

/// Start of the synthetic reference year (non-leap) for profiles without a time column.
pub fn reference_year_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2021, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

fn excel_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 31)?.and_hms_opt(0, 0, 0)
}

/// Split a fractional day count into whole days and seconds of day, rounding
/// to the nearest second.
fn split_serial(serial: f64) -> Option<(i64, i64)> {
    if !serial.is_finite() {
        return None;
    }
    let total = (serial * SECONDS_PER_DAY).round();
    if total.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let total = total as i64;
    Some((total.div_euclid(86_400), total.rem_euclid(86_400)))
}

/// Decode a MATLAB serial day number.
pub fn from_matlab_serial(serial: f64) -> Option<NaiveDateTime> {
    let (days, secs) = split_serial(serial)?;
    let ce_days = i32::try_from(days - MATLAB_CE_OFFSET).ok()?;
    let date = NaiveDate::from_num_days_from_ce_opt(ce_days)?;
    date.and_hms_opt(0, 0, 0)?
        .checked_add_signed(Duration::seconds(secs))
}

/// Encode a timestamp as a MATLAB serial day number.
pub fn to_matlab_serial(dt: NaiveDateTime) -> f64 {
    let days = i64::from(dt.date().num_days_from_ce()) + MATLAB_CE_OFFSET;
    days as f64 + f64::from(dt.num_seconds_from_midnight()) / SECONDS_PER_DAY
}

/// Decode an Excel (1900 system) serial day number.
///
/// Serial 60 names 1900-02-29, which does not exist; it lands on 1900-03-01,
/// the same civil day as serial 61.
pub fn from_excel_serial(serial: f64) -> Option<NaiveDateTime> {
    let (mut days, secs) = split_serial(serial)?;
    if is_excel_phantom_leap_day(serial) {
        debug!(serial, "Excel serial 60 (1900-02-29) decoded as 1900-03-01");
    }
    if days >= EXCEL_LEAP_BUG_SERIAL {
        days -= 1;
    }
    excel_epoch()?
        .checked_add_signed(Duration::days(days))?
        .checked_add_signed(Duration::seconds(secs))
}

/// True for serials on Excel's fictitious 1900-02-29, which decode to the
/// same civil day as serial 61.
pub fn is_excel_phantom_leap_day(serial: f64) -> bool {
    split_serial(serial).is_some_and(|(days, _)| days == EXCEL_LEAP_BUG_SERIAL - 1)
}

/// Minutes elapsed since midnight of January 1 of the timestamp's own year.
pub fn minutes_of_year(dt: NaiveDateTime) -> f64 {
    let day = f64::from(dt.ordinal0());
    let secs = f64::from(dt.num_seconds_from_midnight());
    day * 1440.0 + secs / 60.0
}

/// Seconds since the Unix epoch, used as the absolute grid origin.
pub fn epoch_seconds(dt: NaiveDateTime) -> i64 {
    dt.and_utc().timestamp()
}

/// Distance (seconds) from `dt` to the nearest multiple of `interval_secs`.
pub fn grid_distance_seconds(dt: NaiveDateTime, interval_secs: i64) -> i64 {
    let offset = epoch_seconds(dt).rem_euclid(interval_secs);
    offset.min(interval_secs - offset)
}

/// Floor `dt` onto the grid of `interval_secs`.
pub fn floor_to_grid(dt: NaiveDateTime, interval_secs: i64) -> NaiveDateTime {
    let offset = epoch_seconds(dt).rem_euclid(interval_secs);
    dt - Duration::seconds(offset)
}

/// Sampling interval (minutes) of a one-year profile with `rows` samples.
///
/// Returns `None` when `rows` cannot describe one year (zero, or finer than
/// one sample per minute).
pub fn interval_minutes_for_year(rows: usize) -> Option<u32> {
    const MINUTES_PER_YEAR: usize = 525_600;
    match rows {
        8760 => Some(60),
        17520 => Some(30),
        35040 => Some(15),
        105_120 => Some(5),
        0 => None,
        n if n > MINUTES_PER_YEAR => None,
        n => {
            let minutes = (60.0 * 8760.0 / n as f64).round() as u32;
            Some(minutes.max(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, s).unwrap()
    }

    #[test]
    fn matlab_serial_round_trips_within_one_second() {
        for dt in [
            at(2022, 1, 1, 0, 0, 0),
            at(2021, 7, 15, 13, 45, 17),
            at(1999, 12, 31, 23, 59, 59),
        ] {
            let back = from_matlab_serial(to_matlab_serial(dt)).unwrap();
            assert!((back - dt).num_seconds().abs() <= 1, "{dt} -> {back}");
        }
    }

    #[test]
    fn matlab_serial_known_value() {
        // datenum(2022, 1, 1) == 738522
        assert_eq!(from_matlab_serial(738_522.0).unwrap(), at(2022, 1, 1, 0, 0, 0));
        assert_eq!(from_matlab_serial(738_522.5).unwrap(), at(2022, 1, 1, 12, 0, 0));
    }

    #[test]
    fn excel_serial_reproduces_1900_leap_defect() {
        assert_eq!(from_excel_serial(1.0).unwrap(), at(1900, 1, 1, 0, 0, 0));
        assert_eq!(from_excel_serial(59.0).unwrap(), at(1900, 2, 28, 0, 0, 0));
        assert_eq!(from_excel_serial(60.0).unwrap(), at(1900, 3, 1, 0, 0, 0));
        assert_eq!(from_excel_serial(61.0).unwrap(), at(1900, 3, 1, 0, 0, 0));
        assert!(is_excel_phantom_leap_day(60.0));
        assert!(is_excel_phantom_leap_day(60.75));
        assert!(!is_excel_phantom_leap_day(61.0));
        assert!(!is_excel_phantom_leap_day(f64::NAN));
        assert_eq!(from_excel_serial(44_562.0).unwrap(), at(2022, 1, 1, 0, 0, 0));
        assert_eq!(from_excel_serial(44_562.25).unwrap(), at(2022, 1, 1, 6, 0, 0));
    }

    #[test]
    fn non_finite_serials_are_rejected() {
        assert!(from_excel_serial(f64::NAN).is_none());
        assert!(from_matlab_serial(f64::INFINITY).is_none());
    }

    #[test]
    fn minutes_of_year_ignores_year() {
        assert_eq!(minutes_of_year(at(2020, 1, 1, 1, 0, 0)), 60.0);
        assert_eq!(minutes_of_year(at(2022, 1, 1, 1, 0, 0)), 60.0);
        assert_eq!(minutes_of_year(at(2021, 1, 2, 0, 30, 0)), 1470.0);
    }

    #[test]
    fn grid_helpers() {
        let dt = at(2022, 1, 1, 1, 30, 0);
        assert_eq!(grid_distance_seconds(dt, 3600), 1800);
        assert_eq!(floor_to_grid(dt, 3600), at(2022, 1, 1, 1, 0, 0));
        assert_eq!(grid_distance_seconds(at(2022, 1, 1, 2, 0, 30), 3600), 30);
        assert_eq!(grid_distance_seconds(at(2022, 1, 1, 1, 59, 45), 3600), 15);
    }

    #[test]
    fn year_interval_from_row_count() {
        assert_eq!(interval_minutes_for_year(8760), Some(60));
        assert_eq!(interval_minutes_for_year(17520), Some(30));
        assert_eq!(interval_minutes_for_year(35040), Some(15));
        assert_eq!(interval_minutes_for_year(105_120), Some(5));
        assert_eq!(interval_minutes_for_year(4380), Some(120));
        assert_eq!(interval_minutes_for_year(525_600), Some(1));
        assert_eq!(interval_minutes_for_year(0), None);
        assert_eq!(interval_minutes_for_year(600_000), None);
    }
}

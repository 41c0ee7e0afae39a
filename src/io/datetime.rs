//! Datetime cell decoding.
//!
//! One cell is decoded under one [`DatetimeFormat`]. Native datetime cells pass
//! through in every mode. Failures are returned as plain reasons; the row parser
//! attaches path and row context.

use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::DatetimeFormat;
use crate::io::source::Cell;
use crate::math::{from_excel_serial, from_matlab_serial};

/// Numeric cells above this many days are MATLAB serials; at or below, Excel.
///
/// Present-day Excel serials are around 4.5e4 and MATLAB serials around 7.4e5.
pub const AUTO_SERIAL_BOUNDARY: f64 = 100_000.0;

/// Text patterns tried, in order, by the `auto` mode.
pub const AUTO_PATTERNS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    "%m/%d/%Y",
];

/// Decode one cell.
pub fn decode_datetime(cell: &Cell, format: &DatetimeFormat) -> Result<NaiveDateTime, String> {
    match (cell, format) {
        (Cell::DateTime(dt), _) => Ok(*dt),
        (Cell::Empty, _) => Err("empty datetime cell".to_string()),
        (_, DatetimeFormat::MatlabSerial) => {
            let serial = serial_value(cell, "matlab_serial")?;
            from_matlab_serial(serial).ok_or_else(|| format!("matlab serial {serial} is out of range"))
        }
        (_, DatetimeFormat::ExcelSerial) => {
            let serial = serial_value(cell, "excel_serial")?;
            from_excel_serial(serial).ok_or_else(|| format!("excel serial {serial} is out of range"))
        }
        (_, DatetimeFormat::Pattern(pattern)) => parse_with_pattern(&cell.raw(), pattern)
            .ok_or_else(|| format!("does not match pattern '{pattern}'")),
        (_, DatetimeFormat::Auto) => {
            let mode = resolve_auto_mode(cell)?;
            decode_datetime(cell, &mode)
        }
    }
}

/// The concrete mode the `auto` setting stands for, judged from one cell.
///
/// Numeric cells (including numeric text) pick a serial epoch by magnitude;
/// other text picks the first trial pattern that parses it. Native datetimes
/// come from workbooks, whose numeric date cells are Excel serials.
pub fn resolve_auto_mode(cell: &Cell) -> Result<DatetimeFormat, String> {
    match cell {
        Cell::Empty => Err("empty datetime cell".to_string()),
        Cell::DateTime(_) => Ok(DatetimeFormat::ExcelSerial),
        _ => {
            if let Some(serial) = cell.as_f64() {
                return Ok(serial_mode(serial));
            }
            let text = cell.raw();
            AUTO_PATTERNS
                .iter()
                .find(|pattern| parse_with_pattern(&text, pattern).is_some())
                .map(|pattern| DatetimeFormat::Pattern((*pattern).to_string()))
                .ok_or_else(|| format!("no known datetime pattern matches (tried {})", AUTO_PATTERNS.join(", ")))
        }
    }
}

fn serial_mode(serial: f64) -> DatetimeFormat {
    if serial > AUTO_SERIAL_BOUNDARY {
        DatetimeFormat::MatlabSerial
    } else {
        DatetimeFormat::ExcelSerial
    }
}

fn serial_value(cell: &Cell, mode: &str) -> Result<f64, String> {
    cell.as_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| format!("non-numeric value under {mode}"))
}

/// Parse `text` as a datetime, or as a date at midnight when the pattern has
/// no time fields.
pub fn parse_with_pattern(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    NaiveDateTime::parse_from_str(text, pattern)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::to_matlab_serial;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(h, min, 0).unwrap()
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn native_cells_pass_through_every_mode() {
        let dt = at(2022, 3, 4, 5, 6);
        for format in [
            DatetimeFormat::Auto,
            DatetimeFormat::MatlabSerial,
            DatetimeFormat::ExcelSerial,
            DatetimeFormat::Pattern("%Y".to_string()),
        ] {
            assert_eq!(decode_datetime(&Cell::DateTime(dt), &format).unwrap(), dt);
        }
    }

    #[test]
    fn auto_numeric_uses_magnitude_boundary() {
        assert_eq!(resolve_auto_mode(&Cell::Number(44_562.0)).unwrap(), DatetimeFormat::ExcelSerial);
        assert_eq!(
            resolve_auto_mode(&Cell::Number(AUTO_SERIAL_BOUNDARY)).unwrap(),
            DatetimeFormat::ExcelSerial
        );
        assert_eq!(resolve_auto_mode(&Cell::Number(738_522.0)).unwrap(), DatetimeFormat::MatlabSerial);
        assert_eq!(resolve_auto_mode(&text("44562")).unwrap(), DatetimeFormat::ExcelSerial);

        assert_eq!(decode_datetime(&Cell::Number(44_562.0), &DatetimeFormat::Auto).unwrap(), at(2022, 1, 1, 0, 0));
        let serial = to_matlab_serial(at(2021, 6, 1, 12, 30));
        assert_eq!(decode_datetime(&Cell::Number(serial), &DatetimeFormat::Auto).unwrap(), at(2021, 6, 1, 12, 30));
    }

    #[test]
    fn auto_text_tries_patterns_in_order() {
        assert_eq!(decode_datetime(&text("1/1/2022 1:30"), &DatetimeFormat::Auto).unwrap(), at(2022, 1, 1, 1, 30));
        assert_eq!(decode_datetime(&text("2022-01-01 01:00:00"), &DatetimeFormat::Auto).unwrap(), at(2022, 1, 1, 1, 0));
        assert_eq!(decode_datetime(&text("2022-01-02"), &DatetimeFormat::Auto).unwrap(), at(2022, 1, 2, 0, 0));
        assert_eq!(
            resolve_auto_mode(&text("01/05/2022 13:00")).unwrap(),
            DatetimeFormat::Pattern("%m/%d/%Y %H:%M".to_string())
        );
        assert!(decode_datetime(&text("next tuesday"), &DatetimeFormat::Auto).is_err());
    }

    #[test]
    fn serial_modes_reject_text_and_empty() {
        assert!(decode_datetime(&text("2022-01-01"), &DatetimeFormat::ExcelSerial).is_err());
        assert!(decode_datetime(&Cell::Empty, &DatetimeFormat::MatlabSerial).is_err());
        assert!(decode_datetime(&Cell::Empty, &DatetimeFormat::Auto).is_err());
    }

    #[test]
    fn explicit_pattern() {
        let format = DatetimeFormat::Pattern("%d.%m.%Y %H:%M".to_string());
        assert_eq!(decode_datetime(&text("02.01.2022 06:00"), &format).unwrap(), at(2022, 1, 2, 6, 0));
        assert!(decode_datetime(&text("2022-01-02"), &format).is_err());
    }
}

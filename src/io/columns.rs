//! Header normalization, column resolution and series-key generation.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::LoadError;

/// A header naming a power or energy unit in parentheses, e.g. `Campus Load (kW)`.
static UNIT_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\([^)]*\bkwh?\b[^)]*\)").expect("unit header pattern is valid"));

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern is valid"));

/// Suffix repeated header names with ` [n]` (n ≥ 2); first occurrence unchanged.
pub fn dedup_headers(headers: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    headers
        .iter()
        .map(|name| {
            let count = seen.entry(name.as_str()).or_insert(0);
            *count += 1;
            if *count == 1 {
                name.clone()
            } else {
                format!("{name} [{count}]")
            }
        })
        .collect()
}

pub fn has_unit_pattern(header: &str) -> bool {
    UNIT_HEADER.is_match(header)
}

/// Pick the value columns to load.
///
/// The preferred column comes first when present, followed by every other
/// unit-bearing header in header order. Without it, all unit-bearing headers
/// are selected.
pub fn resolve_value_columns(headers: &[String], preferred: &str, path: &Path) -> Result<Vec<String>, LoadError> {
    let unit_headers = headers.iter().filter(|h| has_unit_pattern(h));

    let selected: Vec<String> = if headers.iter().any(|h| h == preferred) {
        std::iter::once(preferred.to_string())
            .chain(unit_headers.filter(|h| h.as_str() != preferred).cloned())
            .collect()
    } else {
        unit_headers.cloned().collect()
    };

    if selected.is_empty() {
        return Err(LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: preferred.to_string(),
            found: headers.to_vec(),
            unit_fallback: true,
        });
    }
    Ok(selected)
}

/// Index of the datetime column. There is no fallback.
pub fn resolve_datetime_column(headers: &[String], name: &str, path: &Path) -> Result<usize, LoadError> {
    headers
        .iter()
        .position(|h| h == name)
        .ok_or_else(|| LoadError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
            found: headers.to_vec(),
            unit_fallback: false,
        })
}

/// Lower-case slug: runs of non-alphanumerics become `_`, ends trimmed.
pub fn series_slug(name: &str) -> String {
    let lower = name.to_lowercase();
    let slug = NON_ALNUM.replace_all(&lower, "_");
    let slug = slug.trim_matches('_');
    if slug.is_empty() { "series".to_string() } else { slug.to_string() }
}

/// Slug for an energy-load column; the word `demand` becomes `load`.
pub fn load_slug(name: &str) -> String {
    series_slug(name)
        .split('_')
        .map(|word| if word == "demand" { "load" } else { word })
        .collect::<Vec<_>>()
        .join("_")
}

/// `<prefix>__<slug>` keys, suffixing repeats with `_2`, `_3`, ...
pub fn unique_keys<I, S>(prefix: &str, slugs: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut used: HashSet<String> = HashSet::new();
    slugs
        .into_iter()
        .map(|slug| {
            let base = format!("{prefix}__{}", slug.as_ref());
            let mut key = base.clone();
            let mut n = 2;
            while used.contains(&key) {
                key = format!("{base}_{n}");
                n += 1;
            }
            used.insert(key.clone());
            key
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn dedup_suffixes_repeats() {
        assert_eq!(dedup_headers(&strings(&["A", "A", "B"])), strings(&["A", "A [2]", "B"]));
        assert_eq!(dedup_headers(&strings(&["x", "x", "x"])), strings(&["x", "x [2]", "x [3]"]));
    }

    #[test]
    fn preferred_column_first_then_unit_headers() {
        let headers = strings(&["Date", "Thermal Load (kWh)", "Electric Demand (kW)", "Notes"]);
        let cols = resolve_value_columns(&headers, "Electric Demand (kW)", Path::new("a.csv")).unwrap();
        assert_eq!(cols, strings(&["Electric Demand (kW)", "Thermal Load (kWh)"]));
    }

    #[test]
    fn falls_back_to_unit_headers() {
        let headers = strings(&["Date", "Campus Demand (kW)"]);
        let cols = resolve_value_columns(&headers, "Electric Demand (kW)", Path::new("a.csv")).unwrap();
        assert_eq!(cols, strings(&["Campus Demand (kW)"]));
    }

    #[test]
    fn missing_column_lists_found_headers() {
        let headers = strings(&["Date", "Load"]);
        let err = resolve_value_columns(&headers, "Electric Demand (kW)", Path::new("a.csv")).unwrap_err();
        match &err {
            LoadError::MissingColumn { column, found, unit_fallback, .. } => {
                assert_eq!(column, "Electric Demand (kW)");
                assert_eq!(found, &headers);
                assert!(*unit_fallback);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("\"Date\"") && msg.contains("\"Load\""), "{msg}");
    }

    #[test]
    fn datetime_column_has_no_fallback() {
        let headers = strings(&["Timestamp", "Load (kW)"]);
        assert!(matches!(
            resolve_datetime_column(&headers, "Date", Path::new("a.csv")),
            Err(LoadError::MissingColumn { unit_fallback: false, .. })
        ));
        assert_eq!(resolve_datetime_column(&headers, "Timestamp", Path::new("a.csv")).unwrap(), 0);
    }

    #[test]
    fn unit_pattern_needs_whole_word_in_parens() {
        assert!(has_unit_pattern("Load (KW)"));
        assert!(has_unit_pattern("Energy (site kWh)"));
        assert!(!has_unit_pattern("Load kW"));
        assert!(!has_unit_pattern("Load (kWp)"));
    }

    #[test]
    fn keys_canonicalize_demand_and_avoid_collisions() {
        let slugs = ["Electric Demand (kW)", "Electric Load (kW)", "Thermal Load (kW)"].map(load_slug);
        assert_eq!(
            unique_keys("electricity_load", slugs),
            strings(&[
                "electricity_load__electric_load_kw",
                "electricity_load__electric_load_kw_2",
                "electricity_load__thermal_load_kw",
            ])
        );
        assert_eq!(series_slug("1D Tracking kW (kW)"), "1d_tracking_kw_kw");
        assert_eq!(series_slug("  ***  "), "series");
    }
}

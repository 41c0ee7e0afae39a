//! Data-file discovery inside a case directory.
//!
//! Only the directory itself is scanned (no recursion). Workbooks win over
//! delimited text, and ties break on file name so the choice is deterministic.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::LoadError;

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls"];
const TEXT_EXTENSIONS: &[&str] = &["csv"];

/// Pick the load file in `dir`: any supported file whose name does not mention solar.
pub fn discover_load_file(dir: &Path) -> Result<PathBuf, LoadError> {
    pick(dir, |name| !name.contains("solar")).ok_or_else(|| LoadError::SourceNotFound {
        path: dir.to_path_buf(),
    })
}

/// Pick the solar profile in `dir`: the first supported file whose name mentions solar.
pub fn discover_solar_file(dir: &Path) -> Option<PathBuf> {
    pick(dir, |name| name.contains("solar"))
}

fn pick(dir: &Path, accept: impl Fn(&str) -> bool) -> Option<PathBuf> {
    let mut candidates: Vec<(u8, String, PathBuf)> = list_files(dir)
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_str()?.to_string();
            let rank = extension_rank(&path)?;
            accept(&name.to_lowercase()).then_some((rank, name, path))
        })
        .collect();
    candidates.sort();
    let chosen = candidates.into_iter().next().map(|(_, _, path)| path);
    debug!(dir = %dir.display(), chosen = ?chosen, "file discovery");
    chosen
}

/// 0 for workbooks, 1 for delimited text, `None` for anything else.
fn extension_rank(path: &Path) -> Option<u8> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if WORKBOOK_EXTENSIONS.contains(&ext.as_str()) {
        Some(0)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Some(1)
    } else {
        None
    }
}

fn list_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .map(|entry| entry.path())
        .collect()
}

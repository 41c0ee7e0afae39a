//! Tabular source reader.
//!
//! Turns a delimited-text file or a workbook sheet into a header row plus data
//! rows of typed [`Cell`]s. Format dispatch is by file extension.
//!
//! Wholly blank rows are dropped (their line numbers are kept on the rows that
//! survive), and trailing columns with neither a header nor any value are
//! trimmed.

use std::fs::File;
use std::path::Path;

use calamine::{Data, Reader, open_workbook_auto};
use chrono::NaiveDateTime;
use tracing::debug;

use crate::domain::SheetSelector;
use crate::error::LoadError;

/// One raw cell as read from the source.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Raw text of the cell, as shown in diagnostics.
    pub fn raw(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(v) => v.to_string(),
            Cell::DateTime(dt) => dt.to_string(),
        }
    }

    /// Numeric value, accepting numeric text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    fn from_text(s: &str) -> Cell {
        let s = s.trim();
        if s.is_empty() { Cell::Empty } else { Cell::Text(s.to_string()) }
    }
}

/// A data row and its 1-based line number in the source (header = line 1).
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    pub line: usize,
    pub cells: Vec<Cell>,
}

impl SourceRow {
    /// Cell at `col`, or `Cell::Empty` past the end of a short row.
    pub fn cell(&self, col: usize) -> &Cell {
        self.cells.get(col).unwrap_or(&Cell::Empty)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<SourceRow>,
}

impl Table {
    /// Remove columns whose data cells are all empty (header text is ignored).
    pub fn drop_empty_columns(&mut self) {
        let keep: Vec<bool> = (0..self.headers.len())
            .map(|col| self.rows.iter().any(|r| !r.cell(col).is_empty()))
            .collect();
        if keep.iter().all(|k| *k) {
            return;
        }
        self.headers = retain_by_mask(std::mem::take(&mut self.headers), &keep);
        for row in &mut self.rows {
            row.cells.resize(keep.len(), Cell::Empty);
            row.cells = retain_by_mask(std::mem::take(&mut row.cells), &keep);
        }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

fn retain_by_mask<T>(items: Vec<T>, keep: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(keep)
        .filter_map(|(item, k)| k.then_some(item))
        .collect()
}

/// Supported source formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Delimited,
    Workbook,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" | "txt" => Ok(SourceFormat::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(SourceFormat::Workbook),
            other => Err(LoadError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension: other.to_string(),
            }),
        }
    }
}

/// Read `path` into a [`Table`]. `sheet` is only used for workbooks.
pub fn read_table(path: &Path, sheet: Option<&SheetSelector>) -> Result<Table, LoadError> {
    let mut table = match SourceFormat::from_path(path)? {
        SourceFormat::Delimited => read_delimited(path)?,
        SourceFormat::Workbook => read_workbook(path, sheet)?,
    };
    trim_trailing_columns(&mut table);
    let before = table.rows.len();
    table.rows.retain(|r| r.cells.iter().any(|c| !c.is_empty()));
    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        blank_rows = before - table.rows.len(),
        "read tabular source"
    );
    Ok(table)
}

fn read_delimited(path: &Path) -> Result<Table, LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| LoadError::Source {
            path: path.to_path_buf(),
            message: format!("failed to read CSV header: {e}"),
        })?
        .iter()
        .map(normalize_header_text)
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(LoadError::Source {
            path: path.to_path_buf(),
            message: "no header row found".to_string(),
        });
    }

    let mut rows = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let record = result.map_err(|e| LoadError::Source {
            path: path.to_path_buf(),
            message: format!("CSV parse error: {e}"),
        })?;
        // Fall back to +2 (header on line 1, records start at line 2).
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        rows.push(SourceRow {
            line,
            cells: record.iter().map(Cell::from_text).collect(),
        });
    }

    Ok(Table { headers, rows })
}

fn read_workbook(path: &Path, sheet: Option<&SheetSelector>) -> Result<Table, LoadError> {
    let source_err = |message: String| LoadError::Source {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| source_err(format!("failed to open workbook: {e}")))?;
    let names = workbook.sheet_names();

    let sheet_name = match sheet.cloned().unwrap_or_default() {
        SheetSelector::Index(idx) => names
            .get(idx)
            .cloned()
            .ok_or_else(|| source_err(format!("sheet index {idx} out of range; sheets: {names:?}")))?,
        SheetSelector::Name(name) => {
            if !names.contains(&name) {
                return Err(source_err(format!("sheet '{name}' not found; sheets: {names:?}")));
            }
            name
        }
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| source_err(format!("failed to read sheet '{sheet_name}': {e}")))?;

    // Absolute sheet row of the first used row; headers live there.
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows_iter = range.rows();
    let headers: Vec<String> = rows_iter
        .next()
        .map(|cells| cells.iter().map(|c| normalize_header_text(&data_to_cell(c).raw())).collect())
        .ok_or_else(|| source_err(format!("sheet '{sheet_name}' is empty")))?;

    let rows = rows_iter
        .enumerate()
        .map(|(idx, cells)| SourceRow {
            line: first_row + idx + 2,
            cells: cells.iter().map(data_to_cell).collect(),
        })
        .collect();

    debug!(sheet = %sheet_name, "selected worksheet");
    Ok(Table { headers, rows })
}

/// Convert a workbook cell to a [`Cell`].
pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(v) => Cell::Number(*v),
        Data::Int(v) => Cell::Number(*v as f64),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(native) => Cell::DateTime(native),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) => match s.parse::<NaiveDateTime>() {
            Ok(native) => Cell::DateTime(native),
            Err(_) => Cell::from_text(s),
        },
        Data::DurationIso(s) => Cell::from_text(s),
        Data::Error(e) => Cell::Text(format!("#{e:?}")),
    }
}

/// Strip whitespace and a UTF-8 byte-order mark from header text.
///
/// Excel and other tools often emit UTF-8 CSVs with a BOM prefix on the first
/// header; left in place, it breaks exact column-name lookups.
fn normalize_header_text(name: &str) -> String {
    name.trim_start_matches('\u{feff}').trim().to_string()
}

fn trim_trailing_columns(table: &mut Table) {
    while let Some(last) = table.headers.last() {
        let col = table.headers.len() - 1;
        if !last.is_empty() || table.rows.iter().any(|r| !r.cell(col).is_empty()) {
            break;
        }
        table.headers.pop();
        for row in &mut table.rows {
            row.cells.truncate(col);
        }
    }
}

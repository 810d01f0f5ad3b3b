//! CSV Table Emitter
//!
//! Rows are ordered field -> scalar maps. The header is the union of field
//! names across rows in first-seen order, so identical row shapes always
//! produce identical column order.
//!
//! An empty row set is a valid output: callers supply the fixed column list
//! to emit as a header-only file. Without one, an empty table is an error,
//! since a downstream reader cannot render a file with no header.
//!
//! Writes truncate the target. Two runs writing the same path race and the
//! last writer wins; there is no file locking.

use std::fs;
use std::io::Write;
use std::path::Path;

use crate::eval::error::{EvalError, EvalResult};

/// One scalar cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Int(u64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// CSV text. NaN renders as an empty cell.
    pub fn render(&self) -> String {
        match self {
            Cell::Int(n) => n.to_string(),
            Cell::Float(x) => format_float(*x),
            Cell::Text(s) => s.clone(),
        }
    }
}

impl From<u64> for Cell {
    fn from(n: u64) -> Self {
        Cell::Int(n)
    }
}

impl From<usize> for Cell {
    fn from(n: usize) -> Self {
        Cell::Int(n as u64)
    }
}

impl From<f64> for Cell {
    fn from(x: f64) -> Self {
        Cell::Float(x)
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

/// Non-finite values are absent and render empty; integral values keep a
/// trailing `.0` so float columns stay recognisably float.
pub fn format_float(x: f64) -> String {
    if !x.is_finite() {
        String::new()
    } else {
        format!("{:?}", x)
    }
}

/// Ordered field -> cell map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRow {
    cells: Vec<(String, Cell)>,
}

impl TableRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an existing value in place.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Cell>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Cell>) {
        let field = field.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(k, _)| *k == field) {
            Some((_, slot)) => *slot = value,
            None => self.cells.push((field, value)),
        }
    }

    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.cells.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(k, _)| k.as_str())
    }
}

/// Union of field names across `rows`, first-seen order.
pub fn header_union(rows: &[TableRow]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for field in row.fields() {
            if !columns.iter().any(|c| c == field) {
                columns.push(field.to_string());
            }
        }
    }
    columns
}

/// Write `rows` as CSV into `writer`.
///
/// Returns the number of data rows written.
pub fn render_table<W: Write>(
    writer: W,
    rows: &[TableRow],
    empty_columns: Option<&[String]>,
) -> EvalResult<usize> {
    let columns = if rows.is_empty() {
        match empty_columns {
            Some(cols) => cols.to_vec(),
            None => return Err(EvalError::NoColumns),
        }
    } else {
        header_union(rows)
    };

    let mut wtr = csv::WriterBuilder::new().flexible(false).from_writer(writer);
    wtr.write_record(&columns)?;
    for row in rows {
        let record: Vec<String> = columns
            .iter()
            .map(|c| row.get(c).map(Cell::render).unwrap_or_default())
            .collect();
        wtr.write_record(&record)?;
    }
    wtr.flush()
        .map_err(|e| EvalError::Csv(csv::Error::from(e)))?;
    Ok(rows.len())
}

/// Write `rows` to `path`, creating parent directories on demand.
pub fn write_table(
    path: &Path,
    rows: &[TableRow],
    empty_columns: Option<&[String]>,
) -> EvalResult<usize> {
    if rows.is_empty() && empty_columns.is_none() {
        return Err(EvalError::EmptyTable(path.to_path_buf()));
    }
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }
    }
    let file = fs::File::create(path).map_err(|e| EvalError::io(path, e))?;
    render_table(file, rows, empty_columns)
}

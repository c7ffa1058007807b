//! Loads a spreadsheet (xlsx/xls/csv) into a tabular in-memory structure.
//!
//! The reader is one-shot and fully buffered; expected volumes are personal,
//! not enterprise. Excel files are read with calamine (first non-empty
//! sheet), CSV with the csv crate, trying UTF-8 first and falling back to
//! Latin-1 for older bank exports.

use std::path::Path;

use calamine::{Data, Reader};
use chrono::NaiveDate;
use tracing::info;

use super::UploadError;

/// One untyped cell from the source spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Bool(bool),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Text rendering of the cell, used for description/details fields and
    /// for diagnostics in warnings.
    pub fn to_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.fract() == 0.0 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }
}

/// A table with lowercased, trimmed header names. One per parse call;
/// ephemeral.
#[derive(Debug, Clone)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let headers = headers
            .into_iter()
            .map(|h| h.trim().to_lowercase())
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.headers.iter().position(|h| *h == wanted)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` in the named column, `Cell::Empty` if the column is
    /// missing or the row is short.
    pub fn cell<'a>(&self, row: &'a [Cell], name: &str) -> &'a Cell {
        static EMPTY: Cell = Cell::Empty;
        match self.column_index(name) {
            Some(idx) => row.get(idx).unwrap_or(&EMPTY),
            None => &EMPTY,
        }
    }
}

/// Read `path` into a [`Table`], skipping leading report rows and trailing
/// footer rows before treating the next row as the header.
pub fn read_table(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<Table, UploadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xls" => read_excel(path, skip_rows, skip_footer),
        "csv" => read_csv(path, skip_rows, skip_footer),
        other => Err(UploadError::FileFormat(format!(
            "unsupported file type: .{other} (supported: .xlsx, .xls, .csv)"
        ))),
    }
}

fn read_excel(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<Table, UploadError> {
    let mut workbook = calamine::open_workbook_auto(path)
        .map_err(|e| UploadError::FileFormat(format!("could not open workbook: {e}")))?;

    let sheet_names = workbook.sheet_names().to_vec();
    for sheet_name in sheet_names {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(_) => continue,
        };
        if range.is_empty() {
            continue;
        }

        let mut rows: Vec<Vec<Cell>> = range
            .rows()
            .skip(skip_rows)
            .map(|row| row.iter().map(convert_cell).collect())
            .collect();
        if skip_footer > 0 {
            let keep = rows.len().saturating_sub(skip_footer);
            rows.truncate(keep);
        }
        if rows.is_empty() {
            continue;
        }

        let headers = rows.remove(0).iter().map(Cell::to_text).collect();
        rows.retain(|row| !row.iter().all(Cell::is_empty));
        info!(sheet = %sheet_name, rows = rows.len(), "read excel sheet");
        return Ok(Table::new(headers, rows));
    }

    Err(UploadError::FileFormat(
        "no data found in Excel file".to_string(),
    ))
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::Date(naive.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(e) => Cell::Text(format!("{e:?}")),
    }
}

fn read_csv(path: &Path, skip_rows: usize, skip_footer: usize) -> Result<Table, UploadError> {
    let bytes = std::fs::read(path)
        .map_err(|e| UploadError::FileFormat(format!("could not read file: {e}")))?;
    let content = decode_csv_bytes(&bytes);

    let delimiter = sniff_delimiter(&content);
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(content.as_bytes());

    let mut rows: Vec<Vec<Cell>> = Vec::new();
    for result in rdr.records() {
        let record =
            result.map_err(|e| UploadError::FileFormat(format!("malformed CSV record: {e}")))?;
        rows.push(
            record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.to_string())
                    }
                })
                .collect(),
        );
    }

    rows.drain(..skip_rows.min(rows.len()));
    if skip_footer > 0 {
        let keep = rows.len().saturating_sub(skip_footer);
        rows.truncate(keep);
    }
    if rows.is_empty() {
        // An empty table is a reportable edge case, not a crash: the header
        // row is all that's missing, so hand back zero columns + zero rows.
        return Ok(Table::new(Vec::new(), Vec::new()));
    }

    let headers = rows.remove(0).iter().map(Cell::to_text).collect();
    rows.retain(|row| !row.iter().all(Cell::is_empty));
    Ok(Table::new(headers, rows))
}

/// UTF-8 first, Latin-1 as fallback. Latin-1 maps every byte to the code
/// point of the same value, so the fallback cannot fail.
fn decode_csv_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn sniff_delimiter(content: &str) -> u8 {
    let first_line = content.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    let semis = first_line.matches(';').count();
    let commas = first_line.matches(',').count();
    if semis > commas {
        b';'
    } else {
        b','
    }
}

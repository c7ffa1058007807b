//! Bank-specific parsers: one fixed variant per supported bank.
//!
//! Parsing is deterministic and side-effect-free: every input row either
//! becomes a [`ParsedTransaction`] or an [`UploadWarning`] carrying the row
//! index and raw values.

mod allianz;
mod intesa;
pub mod type_maps;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::ParsedTransaction;

use super::reader::{Cell, Table};
use super::{UploadWarning, WarningKind};

/// The supported banks. A fixed set: adding a bank means adding a variant,
/// not registering into shared mutable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    Intesa,
    Allianz,
}

pub const ALL_BANKS: &[Bank] = &[Bank::Intesa, Bank::Allianz];

impl Bank {
    /// Case-insensitive lookup by bank identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        ALL_BANKS
            .iter()
            .find(|b| b.name().eq_ignore_ascii_case(name.trim()))
            .copied()
    }

    /// Canonical bank name stored on transactions.
    pub fn name(&self) -> &'static str {
        match self {
            Bank::Intesa => "intesa",
            Bank::Allianz => "Allianz",
        }
    }

    /// Leading report rows before the header row in this bank's export.
    pub fn skip_rows(&self) -> usize {
        match self {
            Bank::Intesa => 18,
            Bank::Allianz => 3,
        }
    }

    /// Totals/footer rows at the bottom of this bank's export.
    pub fn skip_footer(&self) -> usize {
        match self {
            Bank::Intesa => 0,
            Bank::Allianz => 4,
        }
    }

    pub fn parse(&self, table: &Table, account_name: &str) -> ParseOutcome {
        match self {
            Bank::Intesa => intesa::parse(table, account_name),
            Bank::Allianz => allianz::parse(table, account_name),
        }
    }
}

/// What one parse call produced: fully-parsed rows plus the findings for
/// every row that was filtered or failed.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub transactions: Vec<ParsedTransaction>,
    pub warnings: Vec<UploadWarning>,
}

impl ParseOutcome {
    pub(crate) fn push_row_warning(
        &mut self,
        kind: WarningKind,
        message: impl Into<String>,
        row_index: usize,
        row: &[Cell],
    ) {
        let raw: Vec<String> = row.iter().map(Cell::to_text).collect();
        self.warnings.push(
            UploadWarning::new(kind, message).with_details(serde_json::json!({
                "row": row_index,
                "raw": raw,
            })),
        );
    }
}

/// Normalize a cell into a calendar date.
///
/// Accepts native spreadsheet date cells, the date string formats seen in
/// bank exports, and Excel serial numbers.
pub(crate) fn normalize_date(cell: &Cell) -> Result<NaiveDate, String> {
    match cell {
        Cell::Date(d) => Ok(*d),
        Cell::Number(serial) => excel_serial_to_date(*serial),
        Cell::Text(s) => {
            let s = s.trim();
            // Datetime strings keep only the date part.
            let s = s.split_whitespace().next().unwrap_or(s);
            const FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];
            for fmt in FORMATS {
                if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                    return Ok(date);
                }
            }
            Err(format!("invalid date format: {s}"))
        }
        Cell::Empty => Err("date value is missing".to_string()),
        Cell::Bool(b) => Err(format!("not a date: {b}")),
    }
}

/// Excel epoch is 1899-12-30 (accounting for the 1900 leap year bug).
/// Serial 2958465 is 9999-12-31, the last date Excel can represent; anything
/// outside that range is a malformed cell, not a date.
fn excel_serial_to_date(serial: f64) -> Result<NaiveDate, String> {
    const MAX_EXCEL_SERIAL: f64 = 2_958_465.0;
    if !serial.is_finite() || !(0.0..=MAX_EXCEL_SERIAL).contains(&serial) {
        return Err(format!("not an excel date serial: {serial}"));
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
    base.checked_add_signed(chrono::Duration::days(serial as i64))
        .ok_or_else(|| format!("not an excel date serial: {serial}"))
}

/// Normalize a cell into a signed decimal amount.
///
/// String amounts may carry currency symbols, grouping separators, and either
/// `.` or `,` as the decimal separator; parenthesized negatives are accepted.
pub(crate) fn normalize_amount(cell: &Cell) -> Result<Decimal, String> {
    match cell {
        Cell::Number(f) => {
            Decimal::try_from(*f).map_err(|e| format!("amount out of range: {f} ({e})"))
        }
        Cell::Text(s) => {
            let mut s = s.trim().to_string();
            for symbol in ["€", "$", "£"] {
                s = s.replace(symbol, "");
            }
            s.retain(|c| !c.is_whitespace());

            let negative_parens = s.starts_with('(') && s.ends_with(')');
            if negative_parens {
                s = s[1..s.len() - 1].to_string();
            }

            let cleaned = match (s.rfind(','), s.rfind('.')) {
                // Both present: the later one is the decimal separator.
                (Some(comma), Some(dot)) if comma > dot => s.replace('.', "").replace(',', "."),
                (Some(_), Some(_)) => s.replace(',', ""),
                // Comma only: locale decimal separator.
                (Some(_), None) => s.replace(',', "."),
                _ => s,
            };

            let value: Decimal = cleaned
                .parse()
                .map_err(|_| format!("could not convert amount to decimal: {cleaned}"))?;
            Ok(if negative_parens { -value } else { value })
        }
        Cell::Empty => Err("amount value is missing".to_string()),
        Cell::Date(d) => Err(format!("not an amount: {d}")),
        Cell::Bool(b) => Err(format!("not an amount: {b}")),
    }
}

/// First character uppercased, rest lowercased.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}

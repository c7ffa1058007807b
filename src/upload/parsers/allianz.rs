//! Allianz bank parser.
//!
//! The export is an xls with 3 leading rows and a 4-row totals footer.
//! Relevant columns: `data contabile`, `descrizione`, `dare euro` (debits,
//! already signed) and `avere euro` (credits); the movement amount is their
//! sum. The raw `descrizione` becomes the stored details; the description is
//! a cleaned extraction keyed on the first dash-separated token.

use rust_decimal::Decimal;

use crate::models::ParsedTransaction;

use super::super::reader::Table;
use super::super::WarningKind;
use super::type_maps::{self, ALTRO, TRANSACTION_MAP_ALLIANZ};
use super::{normalize_amount, normalize_date, ParseOutcome};

pub(super) fn parse(table: &Table, account_name: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (idx, row) in table.rows().iter().enumerate() {
        let date = match normalize_date(table.cell(row, "data contabile")) {
            Ok(date) => date,
            Err(err) => {
                outcome.push_row_warning(
                    WarningKind::ParsingError,
                    format!("skipped row {idx}: {err}"),
                    idx,
                    row,
                );
                continue;
            }
        };

        // Missing cells count as zero; a row debiting and crediting nothing
        // is still a valid zero-amount movement in these exports.
        let dare = amount_or_zero(table, row, "dare euro");
        let avere = amount_or_zero(table, row, "avere euro");
        let amount = match (dare, avere) {
            (Ok(d), Ok(a)) => d + a,
            (Err(err), _) | (_, Err(err)) => {
                outcome.push_row_warning(
                    WarningKind::ParsingError,
                    format!("skipped row {idx}: {err}"),
                    idx,
                    row,
                );
                continue;
            }
        };

        let raw_description = table.cell(row, "descrizione").to_text().trim().to_string();
        let description = extract_description(&raw_description);
        let transaction_type = extract_transaction_type(&raw_description);

        let mut tx =
            ParsedTransaction::new(super::Bank::Allianz.name(), account_name, date, amount)
                .with_transaction_type(transaction_type);
        if !description.is_empty() {
            tx = tx.with_description(description);
        }
        if !raw_description.is_empty() {
            tx = tx.with_details(raw_description);
        }
        outcome.transactions.push(tx);
    }

    outcome
}

fn amount_or_zero(
    table: &Table,
    row: &[super::super::reader::Cell],
    column: &str,
) -> Result<Decimal, String> {
    let cell = table.cell(row, column);
    if cell.is_empty() {
        Ok(Decimal::ZERO)
    } else {
        normalize_amount(cell)
    }
}

fn extract_description(details: &str) -> String {
    let parts: Vec<&str> = details.split('-').collect();
    let kind = parts[0].trim();

    match kind {
        "Pagam. POS" => {
            if parts.len() > 1 && parts[1].contains("ORE") {
                let time_info = format!("ORE {}", after(parts[1].trim(), "ORE").trim());
                if parts.len() > 2 {
                    let merchant = parts[2].trim().split("CARTA").next().unwrap_or("").trim();
                    return format!("POS - {merchant} - {time_info}");
                }
            }
            format!("POS - {details}")
        }
        "Addeb. diretto" => {
            if parts.len() > 1 {
                format!("Addeb. diretto - {}", parts[1].trim())
            } else {
                format!("Addeb. diretto - {details}")
            }
        }
        "Bancomat" => {
            if parts.len() > 1 && parts[1].contains("ORE") {
                let info = format!("ORE {}", after(parts[1].trim(), "ORE").trim());
                let info = info.split("CARTA").next().unwrap_or("").trim().to_string();
                format!("Prelievo contanti - {info}")
            } else {
                format!("Prelievo contanti - {details}")
            }
        }
        "Bonif. v/fav." => {
            strip_reference_words(details).replace("Bonif. v/fav.", "Bonif. ricevuto")
        }
        "Disposizione" => strip_reference_words(details).replace("Disposizione", "Bonif. effettuato"),
        _ => details.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

fn extract_transaction_type(details: &str) -> String {
    if details.contains('-') {
        let kind = details.split('-').next().unwrap_or("").trim();
        if let Some(label) = type_maps::lookup(TRANSACTION_MAP_ALLIANZ, &kind.to_lowercase()) {
            return label.to_string();
        }
        return kind.to_string();
    }
    let trimmed = details.trim();
    if trimmed.is_empty() {
        ALTRO.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Everything after the first occurrence of `needle`, or "" if absent.
fn after<'a>(haystack: &'a str, needle: &str) -> &'a str {
    haystack
        .split_once(needle)
        .map(|(_, rest)| rest)
        .unwrap_or("")
}

/// Drop the bank's `RIF:`-prefixed reference tokens and collapse whitespace.
fn strip_reference_words(details: &str) -> String {
    details
        .split_whitespace()
        .filter(|word| !word.starts_with("RIF:"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::super::super::reader::Cell;
    use super::super::Bank;
    use super::*;
    use chrono::NaiveDate;

    fn allianz_table(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(
            vec![
                "data contabile".to_string(),
                "descrizione".to_string(),
                "dare euro".to_string(),
                "avere euro".to_string(),
            ],
            rows,
        )
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn sums_debit_and_credit_columns() {
        let table = allianz_table(vec![
            vec![
                text("05/01/2024"),
                text("Pagam. POS - ACQUISTO ORE 12:30 - NEGOZIO BLU CARTA 111"),
                Cell::Number(-42.0),
                Cell::Empty,
            ],
            vec![
                text("07/01/2024"),
                text("Emolumenti - GENNAIO"),
                Cell::Empty,
                Cell::Number(1250.5),
            ],
        ]);

        let outcome = Bank::Allianz.parse(&table, "Joint");
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.transactions.len(), 2);

        let pos = &outcome.transactions[0];
        assert_eq!(pos.bank_name, "Allianz");
        assert_eq!(pos.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(pos.amount.to_string(), "-42");
        assert_eq!(
            pos.description.as_deref(),
            Some("POS - NEGOZIO BLU - ORE 12:30")
        );
        assert_eq!(pos.transaction_type.as_deref(), Some("Pagamento con carta"));

        let salary = &outcome.transactions[1];
        assert_eq!(salary.amount.to_string(), "1250.5");
        assert_eq!(salary.transaction_type.as_deref(), Some("Stipendio"));
    }

    #[test]
    fn inbound_transfer_strips_references() {
        let desc =
            extract_description("Bonif. v/fav. - MARIO ROSSI RIF:ABC123 CAUSALE AFFITTO");
        assert_eq!(desc, "Bonif. ricevuto - MARIO ROSSI CAUSALE AFFITTO");
    }

    #[test]
    fn outbound_transfer_renames_disposizione() {
        let desc = extract_description("Disposizione - A FAVORE DI VERDI RIF:XYZ");
        assert_eq!(desc, "Bonif. effettuato - A FAVORE DI VERDI");
    }

    #[test]
    fn cash_withdrawal_keeps_time_info() {
        let desc =
            extract_description("Bancomat - PRELIEVO ORE 18:05 CARTA 222");
        assert_eq!(desc, "Prelievo contanti - ORE 18:05");
    }

    #[test]
    fn unknown_kind_falls_back_to_collapsed_details() {
        let desc = extract_description("Competenze   di  liquidazione");
        assert_eq!(desc, "Competenze di liquidazione");
        assert_eq!(
            extract_transaction_type("Competenze di liquidazione"),
            "Competenze di liquidazione"
        );
        assert_eq!(extract_transaction_type(""), ALTRO);
    }

    #[test]
    fn unmapped_dash_kind_keeps_original_token() {
        assert_eq!(
            extract_transaction_type("Storno POS - rettifica"),
            "Storno POS"
        );
    }

    #[test]
    fn bad_date_is_reported_not_fatal() {
        let table = allianz_table(vec![vec![
            text("gennaio"),
            text("Pagam. POS - X"),
            Cell::Number(-1.0),
            Cell::Empty,
        ]]);

        let outcome = Bank::Allianz.parse(&table, "Joint");
        assert!(outcome.transactions.is_empty());
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::ParsingError);
    }
}

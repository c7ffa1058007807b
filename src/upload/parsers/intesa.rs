//! Intesa bank parser.
//!
//! The export is an xlsx with 18 report rows before the header. Relevant
//! columns: `data`, `operazione`, `dettagli`, `conto o carta`, `categoria`,
//! `importo`. Rows whose `operazione` is "Disposizione Di Bonifico" carry no
//! corresponding movement and are filtered out.

use tracing::warn;

use crate::models::ParsedTransaction;

use super::super::reader::Table;
use super::super::WarningKind;
use super::type_maps::{
    self, ALTRO, CARTA_PREPAGATA, PAGAMENTO_CON_CARTA, TRANSACTION_MAP_INTESA,
};
use super::{capitalize, normalize_amount, normalize_date, ParseOutcome};

const FILTERED_OPERATION: &str = "Disposizione Di Bonifico";

pub(super) fn parse(table: &Table, account_name: &str) -> ParseOutcome {
    let mut outcome = ParseOutcome::default();

    for (idx, row) in table.rows().iter().enumerate() {
        let operazione = table.cell(row, "operazione").to_text().trim().to_string();
        let dettagli = table.cell(row, "dettagli").to_text().trim().to_string();
        let conto_o_carta = table
            .cell(row, "conto o carta")
            .to_text()
            .trim()
            .to_string();

        if operazione == FILTERED_OPERATION {
            outcome.push_row_warning(
                WarningKind::FilteredRow,
                format!("skipped row {idx}: '{FILTERED_OPERATION}' has no matching movement"),
                idx,
                row,
            );
            continue;
        }

        let date = match normalize_date(table.cell(row, "data")) {
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
        let amount = match normalize_amount(table.cell(row, "importo")) {
            Ok(amount) => amount,
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

        let description = extract_description(&operazione, &dettagli, &conto_o_carta);
        let transaction_type = extract_transaction_type(&operazione, &dettagli, &conto_o_carta);
        let details = format!("{dettagli} - {conto_o_carta}");
        let category = table.cell(row, "categoria").to_text().trim().to_string();

        let mut tx = ParsedTransaction::new(super::Bank::Intesa.name(), account_name, date, amount)
            .with_details(details)
            .with_transaction_type(transaction_type);
        if !description.is_empty() {
            tx = tx.with_description(description);
        }
        if !category.is_empty() {
            tx = tx.with_category(category);
        }
        outcome.transactions.push(tx);
    }

    outcome
}

/// Derive a readable description from the operation, its free-text details,
/// and the account/card column. The rule table mirrors the bank's statement
/// conventions, so it is long and literal on purpose.
fn extract_description(operazione: &str, dettagli: &str, conto_o_carta: &str) -> String {
    let from_account = conto_o_carta.contains("Conto") || conto_o_carta.trim().is_empty();
    if !from_account {
        if !conto_o_carta.to_uppercase().contains("SUPERFLASH") {
            warn!(
                operazione,
                dettagli, conto_o_carta, "no description rule for card movement, using details"
            );
        }
        return dettagli.to_string();
    }

    let op_lower = operazione.to_lowercase();

    if operazione.trim().eq_ignore_ascii_case("ACCREDITO BEU CON CONTABILE") {
        return dettagli.to_string();
    }
    if operazione.contains("Addebito Diretto") {
        return operazione.to_string();
    }
    if dettagli.contains("Carta N.") {
        return format!("Pagam. POS - {operazione}");
    }
    if operazione.contains("Bonifico Disposto A Favore Di")
        || operazione.contains("Bonifico Istantaneo Da Voi Disposto A Favore Di")
    {
        if let Some(beneficiary) = dettagli.split("Bonifico Da Voi Disposto A Favore Di").nth(1) {
            return format!("Bonifico a {}", beneficiary.trim());
        }
        return format!("Bonifico a {dettagli}");
    }
    if operazione.contains("Bonifico Disposto Da")
        || operazione.contains("Bonifico Istantaneo Disposto Da")
    {
        // Details look like "COD. DISP. <16 digits> <CASH/OTHR/SECU> <reason>
        // Bonifico A Vostro Favore"; the reason lives in the first 32 chars.
        if dettagli.contains("Bonifico A Vostro Favore") {
            let head: String = dettagli.chars().take(32).collect();
            let reason = head
                .split("Bonifico A Vostro Favore")
                .next()
                .unwrap_or("")
                .trim()
                .to_string();
            return format!("{operazione} - {reason}");
        }
        return format!("{operazione} - {dettagli}");
    }
    if op_lower.contains("canone") || op_lower.contains("imposta di bollo") {
        return format!("{} - {dettagli}", capitalize(operazione));
    }
    if op_lower.contains("investimento") {
        return format!("Investimento - {dettagli}");
    }
    if operazione.to_uppercase().contains("BANCOMAT PAY") {
        return format!("BANCOMAT Pay - {dettagli}");
    }
    if operazione.contains("Pagamento Delega F24") || operazione.contains("Pagamento Mav") {
        return format!("{operazione} - {dettagli}");
    }
    if op_lower.contains("premio polizza") {
        return format!("{} - {}", capitalize(operazione), capitalize(dettagli));
    }
    if op_lower.contains("stipendio") {
        if let Some(rest) = dettagli.split("STIPENDIO").nth(1) {
            let salary_info = rest
                .split("Bonifico A Vostro Favore")
                .next()
                .unwrap_or("")
                .trim();
            return format!("Stipendio - {salary_info}");
        }
        return format!("Stipendio - {dettagli}");
    }
    if op_lower.contains("assegn") {
        return format!("{operazione} - {dettagli}");
    }

    if dettagli.is_empty() {
        operazione.to_string()
    } else {
        dettagli.to_string()
    }
}

fn extract_transaction_type(operazione: &str, dettagli: &str, conto_o_carta: &str) -> String {
    // Movements charged to a card rather than the account.
    if !conto_o_carta.trim().is_empty() && !conto_o_carta.contains("Conto") {
        return CARTA_PREPAGATA.to_string();
    }

    // "Carta N." shows up in the details, not the operation.
    if dettagli.contains("Carta N.") {
        return type_maps::lookup(TRANSACTION_MAP_INTESA, "carta n.")
            .unwrap_or(PAGAMENTO_CON_CARTA)
            .to_string();
    }

    let op_lower = operazione.to_lowercase().trim().to_string();
    if let Some(label) = type_maps::lookup(TRANSACTION_MAP_INTESA, &op_lower) {
        return label.to_string();
    }
    if let Some(label) = type_maps::lookup_substring(TRANSACTION_MAP_INTESA, &op_lower) {
        return label.to_string();
    }

    ALTRO.to_string()
}

#[cfg(test)]
mod tests {
    use super::super::super::reader::Cell;
    use super::super::Bank;
    use super::*;
    use chrono::NaiveDate;

    fn intesa_table(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(
            vec![
                "data".to_string(),
                "operazione".to_string(),
                "dettagli".to_string(),
                "conto o carta".to_string(),
                "categoria".to_string(),
                "importo".to_string(),
            ],
            rows,
        )
    }

    fn text(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn parses_pos_payment_row() {
        let table = intesa_table(vec![vec![
            text("05/01/2024"),
            text("Pagamento Tramite Pos"),
            text("Carta N. 1234 SUPERMERCATO ROSSI"),
            text("Conto 123"),
            text("Spesa"),
            text("-42,00"),
        ]]);

        let outcome = Bank::Intesa.parse(&table, "Main");
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.transactions.len(), 1);

        let tx = &outcome.transactions[0];
        assert_eq!(tx.bank_name, "intesa");
        assert_eq!(tx.account_name, "Main");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(tx.amount.to_string(), "-42.00");
        assert_eq!(
            tx.description.as_deref(),
            Some("Pagam. POS - Pagamento Tramite Pos")
        );
        assert_eq!(tx.transaction_type.as_deref(), Some(PAGAMENTO_CON_CARTA));
        assert_eq!(
            tx.details.as_deref(),
            Some("Carta N. 1234 SUPERMERCATO ROSSI - Conto 123")
        );
        assert_eq!(tx.category.as_deref(), Some("Spesa"));
    }

    #[test]
    fn filters_disposizione_di_bonifico_rows() {
        let table = intesa_table(vec![
            vec![
                text("05/01/2024"),
                text("Disposizione Di Bonifico"),
                text("qualcosa"),
                text("Conto 123"),
                Cell::Empty,
                text("-10,00"),
            ],
            vec![
                text("06/01/2024"),
                text("Giroconto"),
                text("girofondi"),
                text("Conto 123"),
                Cell::Empty,
                text("-20,00"),
            ],
        ]);

        let outcome = Bank::Intesa.parse(&table, "Main");
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::FilteredRow);
        assert_eq!(outcome.warnings[0].details["row"], 0);
    }

    #[test]
    fn unparseable_date_becomes_parsing_error_warning() {
        let table = intesa_table(vec![
            vec![
                text("not a date"),
                text("Giroconto"),
                text("girofondi"),
                text("Conto 123"),
                Cell::Empty,
                text("-20,00"),
            ],
            vec![
                text("06/01/2024"),
                text("Giroconto"),
                text("girofondi"),
                text("Conto 123"),
                Cell::Empty,
                text("-20,00"),
            ],
        ]);

        let outcome = Bank::Intesa.parse(&table, "Main");
        assert_eq!(outcome.transactions.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].kind, WarningKind::ParsingError);
        // Raw values survive into the warning for diagnosis.
        assert_eq!(outcome.warnings[0].details["raw"][0], "not a date");
    }

    #[test]
    fn salary_description_extracts_employer() {
        let desc = extract_description(
            "Stipendio O Pensione",
            "COD 123 STIPENDIO ACME SPA GENNAIO Bonifico A Vostro Favore",
            "Conto 123",
        );
        assert_eq!(desc, "Stipendio - ACME SPA GENNAIO");
    }

    #[test]
    fn outbound_transfer_description_keeps_beneficiary() {
        let desc = extract_description(
            "Bonifico Disposto A Favore Di Mario Rossi",
            "COD 1 Bonifico Da Voi Disposto A Favore Di Mario Rossi",
            "Conto 123",
        );
        assert_eq!(desc, "Bonifico a Mario Rossi");
    }

    #[test]
    fn card_movements_map_to_prepaid_type() {
        let label = extract_transaction_type("Ricarica", "dettagli", "Carta Prepagata 999");
        assert_eq!(label, CARTA_PREPAGATA);
    }

    #[test]
    fn unmapped_operation_falls_back_to_altro() {
        let label = extract_transaction_type("Operazione Misteriosa", "", "Conto 123");
        assert_eq!(label, ALTRO);
    }

    #[test]
    fn parsing_same_table_twice_is_deterministic() {
        let table = intesa_table(vec![vec![
            text("05/01/2024"),
            text("Giroconto"),
            text("girofondi"),
            text("Conto 123"),
            Cell::Empty,
            text("-20,00"),
        ]]);

        let a = Bank::Intesa.parse(&table, "Main");
        let b = Bank::Intesa.parse(&table, "Main");
        assert_eq!(a.transactions, b.transactions);
        assert_eq!(a.warnings.len(), b.warnings.len());
    }
}

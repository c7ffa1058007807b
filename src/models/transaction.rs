use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A canonical transaction produced by a bank parser.
///
/// Either a source row fully parses into one of these, or it is dropped with
/// an [`crate::upload::UploadWarning`]; a `ParsedTransaction` is never
/// partially constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedTransaction {
    pub bank_name: String,
    pub account_name: String,
    pub date: NaiveDate,
    /// Signed amount: positive for income, negative for expenses.
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub is_special: bool,
}

impl ParsedTransaction {
    pub fn new(
        bank_name: impl Into<String>,
        account_name: impl Into<String>,
        date: NaiveDate,
        amount: Decimal,
    ) -> Self {
        Self {
            bank_name: bank_name.into(),
            account_name: account_name.into(),
            date,
            amount,
            description: None,
            details: None,
            category: None,
            transaction_type: None,
            is_special: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }

    /// The key used for duplicate detection, scoped to one bank + account.
    pub fn duplicate_key(&self) -> (NaiveDate, Decimal, Option<&str>) {
        (self.date, self.amount, self.description.as_deref())
    }
}

/// A persisted transaction. Stored one-per-line in JSONL files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransaction {
    pub id: Uuid,
    pub bank_name: String,
    pub account_name: String,
    pub date: NaiveDate,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    #[serde(default)]
    pub is_special: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredTransaction {
    pub fn from_parsed(parsed: ParsedTransaction) -> Self {
        Self::from_parsed_at(parsed, Utc::now())
    }

    pub fn from_parsed_at(parsed: ParsedTransaction, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            bank_name: parsed.bank_name,
            account_name: parsed.account_name,
            date: parsed.date,
            amount: parsed.amount,
            description: parsed.description,
            details: parsed.details,
            category: parsed.category,
            transaction_type: parsed.transaction_type,
            is_special: parsed.is_special,
            created_at: at,
            updated_at: at,
        }
    }

    pub fn duplicate_key(&self) -> (NaiveDate, Decimal, Option<&str>) {
        (self.date, self.amount, self.description.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn parsed_transaction_builder_fills_optional_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let tx = ParsedTransaction::new("intesa", "Main", date, dec("-42.00"))
            .with_description("Groceries")
            .with_transaction_type("Pagamento con carta");

        assert_eq!(tx.description.as_deref(), Some("Groceries"));
        assert_eq!(tx.transaction_type.as_deref(), Some("Pagamento con carta"));
        assert!(!tx.is_special);
        assert_eq!(tx.details, None);
    }

    #[test]
    fn stored_transaction_preserves_parsed_fields() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let parsed = ParsedTransaction::new("intesa", "Main", date, dec("-42.00"))
            .with_description("Groceries");
        let stored = StoredTransaction::from_parsed(parsed.clone());

        assert_eq!(stored.duplicate_key(), parsed.duplicate_key());
        assert_eq!(stored.bank_name, "intesa");
        assert_eq!(stored.account_name, "Main");
        assert_eq!(stored.created_at, stored.updated_at);
    }

    #[test]
    fn parsed_transaction_json_round_trips() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        let tx = ParsedTransaction::new("Allianz", "Joint", date, dec("1250.50"))
            .with_description("Stipendio")
            .with_details("EMOLUMENTI - GENNAIO");

        let json = serde_json::to_string(&tx).unwrap();
        let back: ParsedTransaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::models::ParsedTransaction;
use crate::storage::Storage;

/// Candidates split by whether an identical transaction already exists in
/// storage. Both vectors preserve the input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarmonizationResult {
    pub new_transactions: Vec<ParsedTransaction>,
    pub duplicate_transactions: Vec<ParsedTransaction>,
}

/// Classify `candidates` against what storage already holds.
///
/// A candidate is a duplicate when a stored transaction for the same
/// (bank, account) pair matches it exactly on date, amount and description.
/// Matching is exact: a one-cent or one-day difference is a new transaction.
/// Classification never mutates storage, so harmonizing twice in a row gives
/// the same split.
pub async fn harmonize(
    storage: &dyn Storage,
    candidates: Vec<ParsedTransaction>,
) -> Result<HarmonizationResult> {
    // One storage fetch per (bank, account) pair, not per candidate.
    let mut existing_keys: HashMap<(String, String), HashSet<DuplicateKey>> = HashMap::new();
    for tx in &candidates {
        let pair = (tx.bank_name.clone(), tx.account_name.clone());
        if existing_keys.contains_key(&pair) {
            continue;
        }
        let stored = storage
            .find_transactions(&tx.bank_name, &tx.account_name)
            .await?;
        let keys = stored
            .iter()
            .map(|s| owned_key(s.date, s.amount, s.description.as_deref()))
            .collect();
        existing_keys.insert(pair, keys);
    }

    let mut result = HarmonizationResult::default();
    for tx in candidates {
        let pair = (tx.bank_name.clone(), tx.account_name.clone());
        let is_duplicate = existing_keys
            .get(&pair)
            .is_some_and(|keys| keys.contains(&owned_key(tx.date, tx.amount, tx.description.as_deref())));
        if is_duplicate {
            result.duplicate_transactions.push(tx);
        } else {
            result.new_transactions.push(tx);
        }
    }

    info!(
        new = result.new_transactions.len(),
        duplicates = result.duplicate_transactions.len(),
        "harmonization complete"
    );
    Ok(result)
}

/// Most recent transaction date stored for the given account, if any.
/// Useful as a hint for which statement period to export next.
pub async fn last_observation_date(
    storage: &dyn Storage,
    bank_name: &str,
    account_name: &str,
) -> Result<Option<NaiveDate>> {
    let stored = storage.find_transactions(bank_name, account_name).await?;
    Ok(stored.iter().map(|s| s.date).max())
}

type DuplicateKey = (NaiveDate, Decimal, Option<String>);

fn owned_key(date: NaiveDate, amount: Decimal, description: Option<&str>) -> DuplicateKey {
    (date, amount, description.map(str::to_owned))
}

//! In-memory storage implementation for testing.

use std::collections::HashMap;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::models::{ParsedTransaction, StoredTransaction};

use super::Storage;

type AccountKey = (String, String);

/// In-memory storage for testing purposes.
pub struct MemoryStorage {
    transactions: Mutex<HashMap<AccountKey, Vec<StoredTransaction>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            transactions: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn find_transactions(
        &self,
        bank_name: &str,
        account_name: &str,
    ) -> Result<Vec<StoredTransaction>> {
        let txns = self.transactions.lock().await;
        Ok(txns
            .get(&(bank_name.to_string(), account_name.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn insert_transaction(&self, tx: ParsedTransaction) -> Result<StoredTransaction> {
        let stored = StoredTransaction::from_parsed(tx);
        let mut txns = self.transactions.lock().await;
        txns.entry((stored.bank_name.clone(), stored.account_name.clone()))
            .or_default()
            .push(stored.clone());
        Ok(stored)
    }

    async fn all_transactions(&self) -> Result<Vec<StoredTransaction>> {
        let txns = self.transactions.lock().await;
        let mut all: Vec<StoredTransaction> = txns.values().flatten().cloned().collect();
        all.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(all)
    }
}

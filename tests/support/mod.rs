#![allow(dead_code)]

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use finanza::models::{ParsedTransaction, StoredTransaction};
use finanza::storage::{MemoryStorage, Storage};
use tempfile::TempDir;

pub const INTESA_HEADER: &str = "data,operazione,dettagli,conto o carta,categoria,importo\n";

/// Build an Intesa CSV export: 18 filler report lines, the header, then rows.
pub fn write_intesa_csv(dir: &TempDir, name: &str, rows: &[&str]) -> PathBuf {
    let mut content = "filler\n".repeat(18);
    content.push_str(INTESA_HEADER);
    for row in rows {
        content.push_str(row);
        content.push('\n');
    }
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// Storage that rejects inserts whose description matches a poison marker,
/// for exercising per-row commit failure isolation.
pub struct FlakyStorage {
    inner: MemoryStorage,
    poison: String,
}

impl FlakyStorage {
    pub fn rejecting(poison: impl Into<String>) -> Self {
        Self {
            inner: MemoryStorage::new(),
            poison: poison.into(),
        }
    }
}

#[async_trait]
impl Storage for FlakyStorage {
    async fn find_transactions(
        &self,
        bank_name: &str,
        account_name: &str,
    ) -> Result<Vec<StoredTransaction>> {
        self.inner.find_transactions(bank_name, account_name).await
    }

    async fn insert_transaction(&self, tx: ParsedTransaction) -> Result<StoredTransaction> {
        if tx
            .description
            .as_deref()
            .is_some_and(|d| d.contains(&self.poison))
        {
            anyhow::bail!("storage rejected row: {}", self.poison);
        }
        self.inner.insert_transaction(tx).await
    }

    async fn all_transactions(&self) -> Result<Vec<StoredTransaction>> {
        self.inner.all_transactions().await
    }
}

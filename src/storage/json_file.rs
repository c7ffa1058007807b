use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::models::{ParsedTransaction, StoredTransaction};

use super::Storage;

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   transactions/
///     {bank}__{account}.jsonl
/// ```
///
/// Each insert appends one JSON line; reads tolerate a missing file (no
/// transactions yet for that pair).
pub struct JsonFileStorage {
    base_path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn transactions_dir(&self) -> PathBuf {
        self.base_path.join("transactions")
    }

    fn transactions_file(&self, bank_name: &str, account_name: &str) -> PathBuf {
        let file_name = format!(
            "{}__{}.jsonl",
            sanitize_component(bank_name),
            sanitize_component(account_name)
        );
        self.transactions_dir().join(file_name)
    }

    async fn read_jsonl(&self, path: &Path) -> Result<Vec<StoredTransaction>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e).context("Failed to open file"),
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: StoredTransaction = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl(&self, path: &Path, item: &StoredTransaction) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory")?;
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .context("Failed to open file for append")?;

        let line = serde_json::to_string(item).context("Failed to serialize transaction")?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;

        Ok(())
    }
}

/// Bank/account names appear in file names; keep them filesystem-safe.
fn sanitize_component(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl Storage for JsonFileStorage {
    async fn find_transactions(
        &self,
        bank_name: &str,
        account_name: &str,
    ) -> Result<Vec<StoredTransaction>> {
        self.read_jsonl(&self.transactions_file(bank_name, account_name))
            .await
    }

    async fn insert_transaction(&self, tx: ParsedTransaction) -> Result<StoredTransaction> {
        let stored = StoredTransaction::from_parsed(tx);
        let path = self.transactions_file(&stored.bank_name, &stored.account_name);
        self.append_jsonl(&path, &stored).await?;
        Ok(stored)
    }

    async fn all_transactions(&self) -> Result<Vec<StoredTransaction>> {
        let mut all = Vec::new();

        let mut entries = match fs::read_dir(&self.transactions_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(all),
            Err(e) => return Err(e).context("Failed to read transactions directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                all.extend(self.read_jsonl(&path).await?);
            }
        }

        all.sort_by(|a, b| (a.date, a.created_at).cmp(&(b.date, b.created_at)));
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    fn parsed(bank: &str, account: &str) -> ParsedTransaction {
        ParsedTransaction::new(
            bank,
            account,
            NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            Decimal::new(-4200, 2),
        )
        .with_description("Groceries")
    }

    #[tokio::test]
    async fn insert_then_find_round_trips() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());

        let stored = storage.insert_transaction(parsed("intesa", "Main")).await?;
        let found = storage.find_transactions("intesa", "Main").await?;

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, stored.id);
        assert_eq!(found[0].description.as_deref(), Some("Groceries"));
        assert_eq!(found[0].amount, stored.amount);
        Ok(())
    }

    #[tokio::test]
    async fn missing_file_means_no_transactions() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());

        assert!(storage.find_transactions("intesa", "Main").await?.is_empty());
        assert!(storage.all_transactions().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn account_names_with_spaces_get_sane_filenames() -> Result<()> {
        let dir = TempDir::new()?;
        let storage = JsonFileStorage::new(dir.path());

        storage
            .insert_transaction(parsed("Allianz", "Conto Cointestato"))
            .await?;
        let found = storage
            .find_transactions("Allianz", "Conto Cointestato")
            .await?;
        assert_eq!(found.len(), 1);

        let file = dir
            .path()
            .join("transactions")
            .join("allianz__conto_cointestato.jsonl");
        assert!(file.exists());
        Ok(())
    }
}

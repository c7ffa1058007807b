//! Final persistence step: a dumb bulk insert.
//!
//! Duplicate detection happened in harmonization; commit just writes what it
//! is given. Failures are isolated per row, matching the bulk-update pattern
//! used by the rest of the system.

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::models::ParsedTransaction;
use crate::storage::Storage;

/// Outcome of one commit call. Row-level failures never abort the batch, so
/// the caller inspects counts instead of catching errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResult {
    pub inserted_count: usize,
    pub failed_count: usize,
    pub message: String,
}

/// Insert every transaction in `transactions`, independently.
///
/// A storage failure on one row is logged and counted; the remaining rows
/// still persist. There is no rollback and no re-check for duplicates.
pub async fn commit(
    storage: &dyn Storage,
    transactions: Vec<ParsedTransaction>,
) -> CommitResult {
    let total = transactions.len();
    let mut inserted_count = 0;
    let mut failed_count = 0;

    for (idx, tx) in transactions.into_iter().enumerate() {
        match storage.insert_transaction(tx).await {
            Ok(_) => inserted_count += 1,
            Err(e) => {
                failed_count += 1;
                error!(row = idx, error = %e, "failed to insert transaction");
            }
        }
    }

    let message = if failed_count == 0 {
        format!("Inserted {inserted_count} transactions")
    } else {
        format!("Inserted {inserted_count} of {total} transactions ({failed_count} failed)")
    };
    info!(inserted = inserted_count, failed = failed_count, "commit complete");

    CommitResult {
        inserted_count,
        failed_count,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StoredTransaction;
    use crate::storage::MemoryStorage;
    use anyhow::Result;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn tx(day: u32, description: &str) -> ParsedTransaction {
        ParsedTransaction::new(
            "intesa",
            "Main",
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            Decimal::new(-4200, 2),
        )
        .with_description(description)
    }

    /// Delegates to [`MemoryStorage`] but refuses inserts whose description
    /// matches a poison marker.
    struct PoisonedStorage {
        inner: MemoryStorage,
        poison: &'static str,
    }

    #[async_trait::async_trait]
    impl Storage for PoisonedStorage {
        async fn find_transactions(
            &self,
            bank_name: &str,
            account_name: &str,
        ) -> Result<Vec<StoredTransaction>> {
            self.inner.find_transactions(bank_name, account_name).await
        }

        async fn insert_transaction(&self, tx: ParsedTransaction) -> Result<StoredTransaction> {
            if tx.description.as_deref() == Some(self.poison) {
                anyhow::bail!("storage rejected row");
            }
            self.inner.insert_transaction(tx).await
        }

        async fn all_transactions(&self) -> Result<Vec<StoredTransaction>> {
            self.inner.all_transactions().await
        }
    }

    #[tokio::test]
    async fn commit_inserts_every_transaction() {
        let storage = MemoryStorage::new();
        let result = commit(&storage, vec![tx(5, "a"), tx(6, "b"), tx(7, "c")]).await;

        assert_eq!(result.inserted_count, 3);
        assert_eq!(result.failed_count, 0);
        assert_eq!(result.message, "Inserted 3 transactions");
        assert_eq!(storage.all_transactions().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn one_failing_row_does_not_abort_the_rest() {
        let storage = PoisonedStorage {
            inner: MemoryStorage::new(),
            poison: "bad",
        };
        let batch = vec![tx(1, "a"), tx(2, "b"), tx(3, "bad"), tx(4, "c"), tx(5, "d")];
        let result = commit(&storage, batch).await;

        assert_eq!(result.inserted_count, 4);
        assert_eq!(result.failed_count, 1);
        assert!(result.message.contains("4 of 5"));

        let stored = storage.all_transactions().await.unwrap();
        assert_eq!(stored.len(), 4);
        assert!(stored.iter().all(|s| s.description.as_deref() != Some("bad")));
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let storage = MemoryStorage::new();
        let result = commit(&storage, Vec::new()).await;

        assert_eq!(result.inserted_count, 0);
        assert_eq!(result.failed_count, 0);
    }

    #[tokio::test]
    async fn commit_does_not_deduplicate() {
        // Dedup is the harmonizer's job; an identical pair passed to commit
        // is inserted twice.
        let storage = MemoryStorage::new();
        let result = commit(&storage, vec![tx(5, "same"), tx(5, "same")]).await;

        assert_eq!(result.inserted_count, 2);
        assert_eq!(storage.all_transactions().await.unwrap().len(), 2);
    }
}

mod json_file;
mod memory;

pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

use anyhow::Result;

use crate::models::{ParsedTransaction, StoredTransaction};

/// Storage trait for persisted transactions.
///
/// The pipeline only needs two operations: look up what is already stored
/// for a bank + account pair (harmonization), and insert one transaction
/// (commit). No locking or unique-constraint enforcement beyond what the
/// backend itself provides.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    /// All stored transactions for the given bank + account pair.
    async fn find_transactions(
        &self,
        bank_name: &str,
        account_name: &str,
    ) -> Result<Vec<StoredTransaction>>;

    /// Persist one transaction, returning the stored entity.
    async fn insert_transaction(&self, tx: ParsedTransaction) -> Result<StoredTransaction>;

    /// Every stored transaction, for listing/review surfaces.
    async fn all_transactions(&self) -> Result<Vec<StoredTransaction>>;
}

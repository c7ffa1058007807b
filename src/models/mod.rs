mod transaction;

pub use transaction::{ParsedTransaction, StoredTransaction};

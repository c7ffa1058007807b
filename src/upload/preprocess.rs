//! Preprocessing orchestrator: parser dispatch, warning aggregation, raw
//! file persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use tracing::{info, warn};

use super::parsers::Bank;
use super::reader::read_table;
use super::{DateRange, PreprocessingResult, UploadError, UploadWarning, WarningKind};

/// Runs one upload attempt end to end: resolve the bank's parser, load the
/// file into tabular form, parse, and persist the raw upload for
/// audit/reprocessing.
pub struct Preprocessor {
    upload_dir: PathBuf,
}

impl Preprocessor {
    pub fn new(upload_dir: impl AsRef<Path>) -> Self {
        Self {
            upload_dir: upload_dir.as_ref().to_path_buf(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Preprocess an uploaded file provided as raw bytes (the HTTP surface
    /// hands us a multipart body, not a path).
    pub async fn preprocess_bytes(
        &self,
        bytes: &[u8],
        original_filename: &str,
        bank_name: &str,
        account_name: &str,
    ) -> Result<PreprocessingResult, UploadError> {
        let bank = Bank::from_name(bank_name)
            .ok_or_else(|| UploadError::UnsupportedBank(bank_name.to_string()))?;

        let ext = file_extension(original_filename)?;

        std::fs::create_dir_all(&self.upload_dir)
            .context("Failed to create upload directory")?;

        // Land the bytes in a temp file first; the final name depends on the
        // parsed date range.
        let temp_path = self
            .upload_dir
            .join(format!(".tmp_{}.{ext}", Utc::now().format("%Y%m%d%H%M%S%f")));
        std::fs::write(&temp_path, bytes).context("Failed to write uploaded file")?;

        let result = self
            .preprocess_saved(&temp_path, bank, account_name, &ext)
            .await;
        if result.is_err() {
            let _ = std::fs::remove_file(&temp_path);
        }
        result
    }

    /// Preprocess a file already on disk (CLI surface).
    pub async fn preprocess_file(
        &self,
        path: &Path,
        bank_name: &str,
        account_name: &str,
    ) -> Result<PreprocessingResult, UploadError> {
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.preprocess_bytes(&bytes, filename, bank_name, account_name)
            .await
    }

    async fn preprocess_saved(
        &self,
        temp_path: &Path,
        bank: Bank,
        account_name: &str,
        ext: &str,
    ) -> Result<PreprocessingResult, UploadError> {
        let table = read_table(temp_path, bank.skip_rows(), bank.skip_footer())?;

        let mut outcome = bank.parse(&table, account_name);
        if !outcome.warnings.is_empty() {
            warn!(
                bank = bank.name(),
                account = account_name,
                count = outcome.warnings.len(),
                "rows skipped during parsing"
            );
        }

        if let Some(dup_warning) = in_file_duplicates(&outcome.transactions) {
            outcome.warnings.push(dup_warning);
        }

        let date_range = date_range(&outcome.transactions);
        let saved_filename = self.save_as(temp_path, bank, account_name, date_range, ext)?;

        info!(
            bank = bank.name(),
            account = account_name,
            transactions = outcome.transactions.len(),
            warnings = outcome.warnings.len(),
            saved = %saved_filename,
            "preprocessing complete"
        );

        Ok(PreprocessingResult {
            transactions: outcome.transactions,
            warnings: outcome.warnings,
            date_range,
            saved_filename,
        })
    }

    /// Move the temp upload to its final audit name:
    /// `{bank}_{account}_from_{first}_to_{last}_{timestamp}.{ext}`.
    /// The timestamp suffix keeps re-uploads of the same statement from
    /// colliding.
    fn save_as(
        &self,
        temp_path: &Path,
        bank: Bank,
        account_name: &str,
        date_range: Option<DateRange>,
        ext: &str,
    ) -> Result<String, UploadError> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%3f");
        let safe_bank = safe_name(bank.name());
        let safe_account = safe_name(account_name);

        let saved_filename = match date_range {
            Some(range) => format!(
                "{safe_bank}_{safe_account}_from_{}_to_{}_{stamp}.{ext}",
                range.first_date.format("%Y_%m_%d"),
                range.last_date.format("%Y_%m_%d"),
            ),
            None => format!("{safe_bank}_{safe_account}_{stamp}.{ext}"),
        };

        let final_path = self.upload_dir.join(&saved_filename);
        std::fs::rename(temp_path, &final_path).context("Failed to store uploaded file")?;
        Ok(saved_filename)
    }
}

fn file_extension(filename: &str) -> Result<String, UploadError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "xlsx" | "xls" | "csv" => Ok(ext),
        other => Err(UploadError::FileFormat(format!(
            "unsupported file type: .{other} (supported: .xlsx, .xls, .csv)"
        ))),
    }
}

fn safe_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

fn date_range(transactions: &[crate::models::ParsedTransaction]) -> Option<DateRange> {
    let first_date = transactions.iter().map(|t| t.date).min()?;
    let last_date = transactions.iter().map(|t| t.date).max()?;
    Some(DateRange {
        first_date,
        last_date,
    })
}

/// A statement can legitimately contain identical movements (two same-price
/// coffees on the same day), so in-file duplicates are reported, never
/// dropped.
fn in_file_duplicates(
    transactions: &[crate::models::ParsedTransaction],
) -> Option<UploadWarning> {
    let mut counts: HashMap<_, usize> = HashMap::new();
    for tx in transactions {
        *counts.entry(tx.duplicate_key()).or_default() += 1;
    }
    let dup_count: usize = counts.values().filter(|&&c| c > 1).sum();
    if dup_count == 0 {
        return None;
    }
    Some(
        UploadWarning::new(
            WarningKind::Duplicate,
            format!("Found {dup_count} duplicate transactions within the file"),
        )
        .with_details(serde_json::json!({ "count": dup_count })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    const INTESA_HEADER: &str = "data,operazione,dettagli,conto o carta,categoria,importo\n";

    fn intesa_csv(rows: &[&str]) -> Vec<u8> {
        // 18 filler report lines, matching the bank's export layout.
        let mut content = "filler\n".repeat(18);
        content.push_str(INTESA_HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        content.into_bytes()
    }

    #[tokio::test]
    async fn preprocess_parses_and_persists_the_upload() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let bytes = intesa_csv(&[
            "05/01/2024,Giroconto,girofondi,Conto 123,,-42.00",
            "08/01/2024,Giroconto,girofondi,Conto 123,,10.00",
        ]);
        let result = pre
            .preprocess_bytes(&bytes, "movimenti.csv", "intesa", "Main")
            .await
            .unwrap();

        assert_eq!(result.transactions.len(), 2);
        assert!(result.warnings.is_empty());
        let range = result.date_range.unwrap();
        assert_eq!(range.first_date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(range.last_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());

        assert!(result.saved_filename.starts_with("intesa_main_from_2024_01_05_to_2024_01_08"));
        assert!(dir.path().join(&result.saved_filename).exists());
    }

    #[tokio::test]
    async fn unknown_bank_is_rejected_before_any_io() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let err = pre
            .preprocess_bytes(b"whatever", "f.csv", "monopoly", "Main")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedBank(_)));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[tokio::test]
    async fn unsupported_extension_is_a_file_format_error() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let err = pre
            .preprocess_bytes(b"whatever", "f.pdf", "intesa", "Main")
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::FileFormat(_)));
    }

    #[tokio::test]
    async fn empty_file_yields_empty_result_with_absent_date_range() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let result = pre
            .preprocess_bytes(b"", "vuoto.csv", "intesa", "Main")
            .await
            .unwrap();

        assert!(result.transactions.is_empty());
        assert!(result.warnings.is_empty());
        assert!(result.date_range.is_none());
        // The raw upload is still persisted, under a timestamp-only name.
        assert!(dir.path().join(&result.saved_filename).exists());
    }

    #[tokio::test]
    async fn in_file_duplicates_are_reported_not_dropped() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let bytes = intesa_csv(&[
            "05/01/2024,Giroconto,caffe,Conto 123,,-1.20",
            "05/01/2024,Giroconto,caffe,Conto 123,,-1.20",
        ]);
        let result = pre
            .preprocess_bytes(&bytes, "movimenti.csv", "intesa", "Main")
            .await
            .unwrap();

        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::Duplicate);
        assert_eq!(result.warnings[0].details["count"], 2);
    }

    #[tokio::test]
    async fn unparseable_row_shrinks_transactions_by_one() {
        let dir = TempDir::new().unwrap();
        let pre = Preprocessor::new(dir.path());

        let bytes = intesa_csv(&[
            "05/01/2024,Giroconto,girofondi,Conto 123,,-42.00",
            "never,Giroconto,girofondi,Conto 123,,-42.00",
            "07/01/2024,Giroconto,girofondi,Conto 123,,10.00",
        ]);
        let result = pre
            .preprocess_bytes(&bytes, "movimenti.csv", "intesa", "Main")
            .await
            .unwrap();

        assert_eq!(result.transactions.len(), 2);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].kind, WarningKind::ParsingError);
    }
}

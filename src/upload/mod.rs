//! The transaction upload pipeline.
//!
//! Control flow: [`reader`] loads a spreadsheet into a [`reader::Table`],
//! a [`parsers::Bank`] maps it into canonical transactions, the
//! [`preprocess::Preprocessor`] ties those together and persists the raw
//! file, [`harmonize`] splits candidates into duplicate/new against storage,
//! and [`commit`] bulk-inserts whatever it is given.

mod commit;
mod flow;
mod harmonize;
pub mod parsers;
mod preprocess;
pub mod reader;

pub use commit::{commit, CommitResult};
pub use flow::{UploadFlow, UploadStage};
pub use harmonize::{harmonize, last_observation_date, HarmonizationResult};
pub use preprocess::Preprocessor;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::ParsedTransaction;

/// Errors that abort an upload attempt. Row-level problems are reported as
/// [`UploadWarning`]s instead and never block the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no parser registered for bank: {0} (available: intesa, allianz)")]
    UnsupportedBank(String),

    #[error("could not load file into tabular form: {0}")]
    FileFormat(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    FilteredRow,
    Duplicate,
    ParsingError,
}

/// Informational finding attached to a preprocessing result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub message: String,
    /// Row index, raw values, counts: enough to diagnose without re-opening
    /// the source file.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub details: serde_json::Value,
}

impl UploadWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: serde_json::Value::Null,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

/// Observed date span of the parsed transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Produced once per upload attempt by [`Preprocessor::preprocess_bytes`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingResult {
    pub transactions: Vec<ParsedTransaction>,
    pub warnings: Vec<UploadWarning>,
    /// `None` when zero transactions parsed.
    pub date_range: Option<DateRange>,
    pub saved_filename: String,
}

//! The upload flow state machine.
//!
//! Mirrors the stepper a review UI walks through:
//! `Setup → FileSelected → Preprocessed → Harmonized → Committed`. Each
//! forward transition is one pipeline call; going back discards every
//! downstream transient result. Nothing here is persisted; an abandoned
//! flow simply drops its state.

use std::path::PathBuf;
use std::sync::Arc;

use crate::models::ParsedTransaction;
use crate::storage::Storage;

use super::commit::{commit, CommitResult};
use super::harmonize::{harmonize, HarmonizationResult};
use super::preprocess::Preprocessor;
use super::{PreprocessingResult, UploadError};

/// Where an [`UploadFlow`] currently stands. Variant order is transition
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UploadStage {
    Setup,
    FileSelected,
    Preprocessed,
    Harmonized,
    Committed,
}

#[derive(Debug, Clone)]
struct SelectedFile {
    path: PathBuf,
    bank_name: String,
    account_name: String,
}

/// Drives one upload attempt through the pipeline stages in order.
pub struct UploadFlow {
    storage: Arc<dyn Storage>,
    preprocessor: Preprocessor,
    stage: UploadStage,
    selected: Option<SelectedFile>,
    preprocessing: Option<PreprocessingResult>,
    harmonization: Option<HarmonizationResult>,
    commit_result: Option<CommitResult>,
}

impl UploadFlow {
    pub fn new(storage: Arc<dyn Storage>, preprocessor: Preprocessor) -> Self {
        Self {
            storage,
            preprocessor,
            stage: UploadStage::Setup,
            selected: None,
            preprocessing: None,
            harmonization: None,
            commit_result: None,
        }
    }

    pub fn stage(&self) -> UploadStage {
        self.stage
    }

    pub fn preprocessing(&self) -> Option<&PreprocessingResult> {
        self.preprocessing.as_ref()
    }

    pub fn harmonization(&self) -> Option<&HarmonizationResult> {
        self.harmonization.as_ref()
    }

    pub fn commit_result(&self) -> Option<&CommitResult> {
        self.commit_result.as_ref()
    }

    /// Select the file to upload. Legal from any stage; restarting the flow
    /// with a new file discards everything downstream.
    pub fn select_file(
        &mut self,
        path: impl Into<PathBuf>,
        bank_name: impl Into<String>,
        account_name: impl Into<String>,
    ) {
        self.selected = Some(SelectedFile {
            path: path.into(),
            bank_name: bank_name.into(),
            account_name: account_name.into(),
        });
        self.enter(UploadStage::FileSelected);
    }

    /// Parse the selected file and persist the raw upload.
    pub async fn preprocess(&mut self) -> Result<&PreprocessingResult, UploadError> {
        self.require(UploadStage::FileSelected)?;
        let selected = self
            .selected
            .clone()
            .ok_or_else(|| flow_error("no file selected"))?;

        let result = self
            .preprocessor
            .preprocess_file(&selected.path, &selected.bank_name, &selected.account_name)
            .await?;
        self.enter(UploadStage::Preprocessed);
        Ok(self.preprocessing.insert(result))
    }

    /// Split the preprocessed candidates into new/duplicate against storage.
    pub async fn harmonize(&mut self) -> Result<&HarmonizationResult, UploadError> {
        self.require(UploadStage::Preprocessed)?;
        let candidates = self
            .preprocessing
            .as_ref()
            .map(|p| p.transactions.clone())
            .ok_or_else(|| flow_error("no preprocessing result"))?;

        let result = harmonize(self.storage.as_ref(), candidates).await?;
        self.enter(UploadStage::Harmonized);
        Ok(self.harmonization.insert(result))
    }

    /// Replace the pending new-transaction set with the user's edited copy.
    /// Only legal while reviewing, i.e. in the Harmonized stage.
    pub fn edit_new_transactions(
        &mut self,
        transactions: Vec<ParsedTransaction>,
    ) -> Result<(), UploadError> {
        if self.stage != UploadStage::Harmonized {
            return Err(flow_error("can only edit transactions during review"));
        }
        if let Some(h) = self.harmonization.as_mut() {
            h.new_transactions = transactions;
        }
        Ok(())
    }

    /// Persist the reviewed new-transaction set.
    pub async fn commit(&mut self) -> Result<&CommitResult, UploadError> {
        self.require(UploadStage::Harmonized)?;
        let transactions = self
            .harmonization
            .as_ref()
            .map(|h| h.new_transactions.clone())
            .ok_or_else(|| flow_error("no harmonization result"))?;

        let result = commit(self.storage.as_ref(), transactions).await;
        self.stage = UploadStage::Committed;
        Ok(self.commit_result.insert(result))
    }

    /// Step back one stage, discarding the results the forward step produced.
    pub fn back(&mut self) {
        let previous = match self.stage {
            UploadStage::Setup | UploadStage::FileSelected => UploadStage::Setup,
            UploadStage::Preprocessed => UploadStage::FileSelected,
            UploadStage::Harmonized => UploadStage::Preprocessed,
            UploadStage::Committed => UploadStage::Harmonized,
        };
        self.enter(previous);
    }

    /// The stage a forward transition starts from must be exactly `from`:
    /// skipping ahead is illegal, and re-running a step first requires
    /// stepping back.
    fn require(&self, from: UploadStage) -> Result<(), UploadError> {
        if self.stage != from {
            return Err(flow_error(format!(
                "illegal transition from {:?} (expected {from:?})",
                self.stage
            )));
        }
        Ok(())
    }

    /// Move to `stage` and drop every result that belongs downstream of it.
    fn enter(&mut self, stage: UploadStage) {
        self.stage = stage;
        if stage < UploadStage::FileSelected {
            self.selected = None;
        }
        if stage < UploadStage::Preprocessed {
            self.preprocessing = None;
        }
        if stage < UploadStage::Harmonized {
            self.harmonization = None;
        }
        if stage < UploadStage::Committed {
            self.commit_result = None;
        }
    }
}

fn flow_error(message: impl std::fmt::Display) -> UploadError {
    UploadError::Other(anyhow::anyhow!("{message}"))
}

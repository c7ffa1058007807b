//! Upload pipeline handlers.
//!
//! Three operations, one per pipeline stage: `POST /upload/preprocess`
//! (multipart file + bank_name + account_name), `POST /upload/harmonize`
//! (candidate transactions), `POST /upload/commit` (reviewed transactions).
//! The API is stateless; legal call ordering is the caller's contract.

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use finanza::models::ParsedTransaction;
use finanza::storage::Storage;
use finanza::upload::{
    commit, harmonize, CommitResult, HarmonizationResult, PreprocessingResult, Preprocessor,
    UploadError,
};

/// Personal statement exports are small; anything bigger is a mistake.
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub preprocessor: Preprocessor,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/upload/preprocess", post(preprocess))
        .route("/upload/harmonize", post(harmonize_handler))
        .route("/upload/commit", post(commit_handler))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_SIZE))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error response: a status code and a JSON `{error}` body.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        (self.status, body).into_response()
    }
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::UnsupportedBank(_) | UploadError::FileFormat(_) => {
                Self::bad_request(err.to_string())
            }
            UploadError::Other(e) => Self::internal(e.to_string()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err.to_string())
    }
}

/// POST /upload/preprocess
///
/// Multipart form: `file` (the statement export), `bank_name`,
/// `account_name`.
async fn preprocess(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<PreprocessingResult>, AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut filename = String::new();
    let mut bank_name: Option<String> = None;
    let mut account_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(format!("Failed to read form field: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = field.file_name().unwrap_or("upload").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                file_data = Some(bytes.to_vec());
            }
            "bank_name" => {
                bank_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| AppError::bad_request("Failed to read bank_name"))?,
                );
            }
            "account_name" => {
                account_name = Some(
                    field
                        .text()
                        .await
                        .map_err(|_| AppError::bad_request("Failed to read account_name"))?,
                );
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| AppError::bad_request("Missing file field"))?;
    let bank_name = bank_name.ok_or_else(|| AppError::bad_request("Missing bank_name field"))?;
    let account_name =
        account_name.ok_or_else(|| AppError::bad_request("Missing account_name field"))?;

    info!(bank = %bank_name, account = %account_name, bytes = file_data.len(), "preprocess request");
    let result = state
        .preprocessor
        .preprocess_bytes(&file_data, &filename, &bank_name, &account_name)
        .await?;
    Ok(Json(result))
}

/// POST /upload/harmonize
async fn harmonize_handler(
    State(state): State<Arc<AppState>>,
    Json(candidates): Json<Vec<ParsedTransaction>>,
) -> Result<Json<HarmonizationResult>, AppError> {
    let result = harmonize(state.storage.as_ref(), candidates).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct CommitRequest {
    pub transactions: Vec<ParsedTransaction>,
}

/// POST /upload/commit
async fn commit_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CommitRequest>,
) -> Result<Json<CommitResult>, AppError> {
    let result = commit(state.storage.as_ref(), request.transactions).await;
    Ok(Json(result))
}

//! HTTP API exposing the three upload pipeline operations.

#[cfg(feature = "http")]
mod api;

#[cfg(feature = "http")]
pub use api::{router, AppError, AppState, MAX_UPLOAD_SIZE};

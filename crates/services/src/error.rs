//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{QuestionValidationError, SessionError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the question generation client.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("question generation returned an empty response")]
    EmptyResponse,
    #[error("question generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("question generation returned an unusable payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Validation(#[from] QuestionValidationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the practice flow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeError {
    #[error("unit not found")]
    UnitNotFound,
    #[error("session not found")]
    SessionNotFound,
    #[error("question not found")]
    QuestionNotFound,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("unit not found")]
    UnitNotFound,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

//! Error taxonomy (§7). Component-internal errors are small focused
//! `thiserror` types, mirroring the teacher's one-struct-per-failure-kind
//! convention; only the orchestration boundary aggregates them into one
//! enum via `#[from]`.

use thiserror::Error;

use crate::profile::SynthesisError;
use crate::types::ProviderError;

/// Raised when the vision model returns non-JSON or structurally invalid
/// JSON after one repair attempt (§4.1 step 3, §7).
#[derive(Debug, Error)]
#[error("extraction failed for image {image_id}: {reason}")]
pub struct ExtractionFailure {
    pub image_id: uuid::Uuid,
    pub reason: String,
}

/// Raised when profile synthesis is requested before any descriptors
/// exist for the portfolio (§4.2, §7).
#[derive(Debug, Error)]
#[error("style profile for portfolio {portfolio_id} is incomplete: no descriptors found")]
pub struct ProfileIncomplete {
    pub portfolio_id: uuid::Uuid,
}

/// Raised by storage adapters on I/O failure. Wraps the underlying
/// driver error without committing the caller to a particular backend.
#[derive(Debug, Error)]
#[error("storage error: {0}")]
pub struct StorageError(pub String);

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError(err.to_string())
    }
}

/// Top-level error returned by the orchestrator's public functions.
/// Aggregates the component-internal error kinds the way
/// `server/routes.rs` maps its internal errors to one response shape at
/// the edge -- here, one enum instead of one HTTP status.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),

    #[error(transparent)]
    ProfileIncomplete(#[from] ProfileIncomplete),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Storage(StorageError::from(err))
    }
}

impl From<SynthesisError> for CoreError {
    fn from(err: SynthesisError) -> Self {
        match err {
            SynthesisError::Incomplete(e) => CoreError::ProfileIncomplete(e),
            SynthesisError::Storage(e) => CoreError::Storage(e),
        }
    }
}

//! Error types for the backfill engine

use crate::result::BackfillResult;
use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced by a [`TableStore`](crate::TableStore) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The addressed record does not exist (updates never create records)
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Request was throttled by the storage service
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Key or attribute could not be represented by the store
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Storage/IO error
    #[error("Storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn throttled(msg: impl Into<String>) -> Self {
        Self::Throttled(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

/// Fatal errors that abort a backfill run
#[derive(Error, Debug)]
pub enum BackfillError {
    /// A page request failed. `progress` holds whatever was already applied
    /// before the failure (always empty under the collect strategy).
    #[error("Scan failed on page {page}: {source}")]
    Scan {
        page: usize,
        #[source]
        source: StoreError,
        progress: Box<BackfillResult>,
    },

    /// Engine options are unusable
    #[error("Invalid backfill options: {0}")]
    InvalidOptions(String),
}

impl BackfillError {
    /// Counters accumulated before the run aborted, if any.
    pub fn progress(&self) -> Option<&BackfillResult> {
        match self {
            BackfillError::Scan { progress, .. } => Some(progress),
            BackfillError::InvalidOptions(_) => None,
        }
    }
}

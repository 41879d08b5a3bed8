//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use outline_core::model::{OutlineError, OutlineId};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the presentation session engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("outline {0} not found")]
    NotFound(OutlineId),

    #[error(transparent)]
    Validation(#[from] OutlineError),

    #[error("outline store unavailable: {reason}")]
    StoreUnavailable {
        reason: String,
        #[source]
        source: Option<StorageError>,
    },
}

impl SessionError {
    pub(crate) fn store(source: StorageError) -> Self {
        Self::StoreUnavailable {
            reason: source.to_string(),
            source: Some(source),
        }
    }

    pub(crate) fn timeout(after: Duration) -> Self {
        Self::StoreUnavailable {
            reason: format!("no response within {after:?}"),
            source: None,
        }
    }

    /// Map a store error for the outline `id`. `NotFound` stays distinguishable.
    pub(crate) fn from_storage(id: OutlineId, err: StorageError) -> Self {
        match err {
            StorageError::NotFound => Self::NotFound(id),
            other => Self::store(other),
        }
    }
}

/// Errors emitted by `OutlineService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum OutlineServiceError {
    #[error(transparent)]
    Outline(#[from] OutlineError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by the text-to-outline generator.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeneratorError {
    #[error("outline generator is not configured")]
    Disabled,
    #[error("source text is empty")]
    EmptyInput,
    #[error("outline generator returned an empty response")]
    EmptyResponse,
    #[error("outline generator returned malformed sections: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("outline generator request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
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

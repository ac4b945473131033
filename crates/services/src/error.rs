//! Shared error types for the services crate.

use thiserror::Error;

use coach_core::CatalogError;
use coach_core::model::AssessmentId;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by attempt services.
///
/// Rejected state-machine transitions are not errors here; they come back as
/// `TransitionRejected` and leave the attempt untouched.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AttemptError {
    #[error("unknown assessment: {0}")]
    UnknownAssessment(AssessmentId),
    #[error("result recording task did not finish: {0}")]
    RecorderTask(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
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
    Catalog(#[from] CatalogError),
}

//! Error types for lm-migrate
//!
//! Only run-aborting failures live here. Row-level read and write failures
//! are recorded in the [`MigrationReport`](crate::MigrationReport) instead.

use lm_core::CoreError;
use lm_db::DbError;
use thiserror::Error;

/// Fatal migration errors
#[derive(Error, Debug)]
pub enum MigrateError {
    /// Missing locales, missing default locale, unknown root, bad catalog (P001)
    #[error("[P001] {0}")]
    Configuration(#[from] CoreError),

    /// The query plan is structurally wrong (P002)
    #[error("[P002] Plan construction failed for {entity}: {message}")]
    PlanConstruction { entity: String, message: String },

    /// The database could not be inspected or prepared (P003)
    #[error("[P003] Database error before migration: {0}")]
    Database(#[from] DbError),
}

impl MigrateError {
    pub(crate) fn plan(entity: impl Into<String>, message: impl Into<String>) -> Self {
        MigrateError::PlanConstruction {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Whether the error stems from configuration rather than the plan or storage
    pub fn is_configuration(&self) -> bool {
        matches!(self, MigrateError::Configuration(_))
    }
}

/// Result type alias for MigrateError
pub type MigrateResult<T> = Result<T, MigrateError>;

//! Creation store error types.

use ck_models::ContentError;
use thiserror::Error;

/// Result type for creation store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the creation store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Corrupt row {id}: {source}")]
    CorruptRow {
        id: String,
        #[source]
        source: ContentError,
    },
}

impl StoreError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn corrupt_row(id: impl ToString, source: ContentError) -> Self {
        Self::CorruptRow {
            id: id.to_string(),
            source,
        }
    }
}

//! Database error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Migration error: {0}")]
    Migration(String),
}

impl DbError {
    /// Classify a failed write.
    ///
    /// A UNIQUE violation that slipped past the pre-insert checks becomes
    /// `Duplicate`, a dangling foreign key becomes `NotFound`, so both
    /// backends report the same errors.
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        match err.as_database_error() {
            Some(db) if db.is_unique_violation() => {
                DbError::Duplicate(format!("{} already exists", what))
            }
            Some(db) if db.is_foreign_key_violation() => {
                DbError::NotFound(format!("Referenced record for {}", what))
            }
            _ => DbError::Connection(err),
        }
    }
}

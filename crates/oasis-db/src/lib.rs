//! Postgres access layer for the Wild Oasis booking tables
//!
//! Implements `oasis_core::Store` on top of an sqlx pool. Uses the existing
//! schema - NO migrations. Every request becomes one statement with all
//! caller values bound as parameters.

pub mod client;
pub mod queries;
pub mod schema;

pub use client::*;
pub use schema::*;

use oasis_core::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionError(#[from] sqlx::Error),

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unexpected row shape: {0}")]
    Decode(String),

    #[error("Missing tables: {0:?}")]
    MissingTables(Vec<String>),
}

pub type DbResult<T> = Result<T, DbError>;

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(sqlx::Error::Database(db))
                if db.is_unique_violation()
                    || db.is_foreign_key_violation()
                    || db.is_check_violation() =>
            {
                StoreError::ConstraintViolation(db.message().to_string())
            }
            DbError::InvalidQuery(msg) => StoreError::InvalidQuery(msg),
            other => StoreError::Backend(other.to_string()),
        }
    }
}

//! Store error types.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unreachable: {0}")]
    Unreachable(String),

    #[error("Duplicate entry: {0}")]
    Duplicate(String),

    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),
}

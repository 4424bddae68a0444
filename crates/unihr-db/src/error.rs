//! Database-specific error types and conversions.

use unihr_core::error::UniHrError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// A statement in a query script failed (including a `THROW`).
    #[error("Query failed: {0}")]
    Query(String),

    /// A stored row could not be mapped back to a domain type.
    #[error("Invalid stored data: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity} ({key})")]
    AlreadyExists { entity: String, key: String },

    /// An optimistic guard did not hold when the script ran.
    #[error("Concurrent modification of {entity} {id}: {reason}")]
    Conflict {
        entity: String,
        id: String,
        reason: String,
    },
}

impl From<DbError> for UniHrError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => UniHrError::NotFound { entity, id },
            DbError::AlreadyExists { entity, key } => UniHrError::AlreadyExists { entity, key },
            DbError::Conflict { entity, id, reason } => UniHrError::Conflict { entity, id, reason },
            DbError::Decode(message) => UniHrError::StructuralIntegrity(message),
            other => UniHrError::Database(other.to_string()),
        }
    }
}

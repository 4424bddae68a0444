//! Error types for the UniHR governance core.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniHrError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity} ({key})")]
    AlreadyExists { entity: String, key: String },

    /// The action is not legal for the entity's current stage/status.
    /// Nothing was written.
    #[error("Invalid transition: cannot {action} {entity} at {state}")]
    InvalidTransition {
        entity: String,
        action: String,
        state: String,
    },

    /// Inserting the edge would make a unit its own ancestor.
    #[error("Cycle detected: {child_id} is an ancestor of {parent_id}")]
    CycleDetected { parent_id: String, child_id: String },

    /// Optimistic precondition mismatch or concurrent modification.
    /// The caller must re-read and retry.
    #[error("Conflict on {entity} {id}: {reason}")]
    Conflict {
        entity: String,
        id: String,
        reason: String,
    },

    /// Stored data violates a hierarchy or audit invariant.
    #[error("Structural integrity violation: {0}")]
    StructuralIntegrity(String),

    #[error("Authorization denied: {reason}")]
    AuthorizationDenied { reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl UniHrError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(entity: &str, id: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            reason: reason.into(),
        }
    }
}

pub type UniHrResult<T> = Result<T, UniHrError>;

//! Governance error types.

use thiserror::Error;
use unihr_core::error::UniHrError;
use unihr_core::models::org_unit::OrgUnitStatus;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum GovernanceError {
    #[error("org unit {id} is {status}, expected {expected}")]
    UnitStatus {
        id: Uuid,
        status: OrgUnitStatus,
        expected: OrgUnitStatus,
    },

    #[error("org unit {id} still has {count} active child unit(s)")]
    ActiveChildren { id: Uuid, count: usize },

    #[error("placing org unit {id} under {parent_id} exceeds the maximum depth of {max}")]
    DepthExceeded { id: Uuid, parent_id: Uuid, max: usize },

    #[error("effective date must not be in the future")]
    FutureEffectiveDate,

    #[error("missing permission {permission}")]
    MissingPermission { permission: String },

    #[error("{permission} does not cover org unit {org_unit_id}")]
    OutOfScope {
        permission: String,
        org_unit_id: Uuid,
    },

    #[error("self-only scope does not allow {action}")]
    SelfOnlyAction { action: String },
}

impl From<GovernanceError> for UniHrError {
    fn from(err: GovernanceError) -> Self {
        match err {
            GovernanceError::UnitStatus { .. }
            | GovernanceError::ActiveChildren { .. }
            | GovernanceError::DepthExceeded { .. }
            | GovernanceError::FutureEffectiveDate => UniHrError::Validation {
                message: err.to_string(),
            },
            GovernanceError::MissingPermission { .. }
            | GovernanceError::OutOfScope { .. }
            | GovernanceError::SelfOnlyAction { .. } => UniHrError::AuthorizationDenied {
                reason: err.to_string(),
            },
        }
    }
}

//! Org assignment domain model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UniHrError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum AssignmentType {
    #[default]
    Permanent,
    Concurrent,
    Acting,
    Secondment,
}

impl AssignmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentType::Permanent => "Permanent",
            AssignmentType::Concurrent => "Concurrent",
            AssignmentType::Acting => "Acting",
            AssignmentType::Secondment => "Secondment",
        }
    }
}

impl FromStr for AssignmentType {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Permanent" => Ok(AssignmentType::Permanent),
            "Concurrent" => Ok(AssignmentType::Concurrent),
            "Acting" => Ok(AssignmentType::Acting),
            "Secondment" => Ok(AssignmentType::Secondment),
            other => Err(UniHrError::validation(format!(
                "unknown assignment type: {other}"
            ))),
        }
    }
}

/// Membership of an employee in an org unit.
///
/// Soft-deleted by setting `end_date`; never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgAssignment {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub org_unit_id: Uuid,
    pub position_id: Option<Uuid>,
    pub assignment_type: AssignmentType,
    pub is_primary: bool,
    /// Share of the employee's time, 1..=100.
    pub allocation_percent: u32,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrgAssignment {
    /// Whether the assignment is in force at `at`.
    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && self.end_date.is_none_or(|end| at < end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrgAssignment {
    pub employee_id: Uuid,
    pub org_unit_id: Uuid,
    pub position_id: Option<Uuid>,
    pub assignment_type: AssignmentType,
    pub is_primary: bool,
    pub allocation_percent: u32,
    pub start_date: DateTime<Utc>,
}

impl CreateOrgAssignment {
    pub fn validate(&self) -> Result<(), UniHrError> {
        if !(1..=100).contains(&self.allocation_percent) {
            return Err(UniHrError::validation(format!(
                "allocation must be between 1 and 100 percent, got {}",
                self.allocation_percent
            )));
        }
        Ok(())
    }
}

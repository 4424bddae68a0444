//! Employee-to-org-unit assignments, the input of scope resolution.

use chrono::{DateTime, Utc};
use tracing::info;
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::models::assignment::{CreateOrgAssignment, OrgAssignment};
use unihr_core::models::org_unit::OrgUnitStatus;
use unihr_core::repository::{OrgAssignmentRepository, OrgUnitRepository};
use uuid::Uuid;

use crate::hierarchy::expect_status;

pub struct AssignmentService<A: OrgAssignmentRepository, U: OrgUnitRepository> {
    assignment_repo: A,
    unit_repo: U,
}

impl<A: OrgAssignmentRepository, U: OrgUnitRepository> AssignmentService<A, U> {
    pub fn new(assignment_repo: A, unit_repo: U) -> Self {
        Self {
            assignment_repo,
            unit_repo,
        }
    }

    /// Assign an employee to an active unit. An employee holds at most one
    /// primary assignment at a time.
    pub async fn assign(&self, input: CreateOrgAssignment) -> UniHrResult<OrgAssignment> {
        input.validate()?;

        let unit = self.unit_repo.get_by_id(input.org_unit_id).await?;
        expect_status(&unit, OrgUnitStatus::Active)?;

        if input.is_primary {
            let active = self
                .assignment_repo
                .list_active_for_employee(input.employee_id, input.start_date)
                .await?;
            if let Some(primary) = active.iter().find(|a| a.is_primary) {
                return Err(UniHrError::validation(format!(
                    "employee {} already has primary assignment {}",
                    input.employee_id, primary.id
                )));
            }
        }

        let assignment = self.assignment_repo.create(input).await?;
        info!(
            assignment_id = %assignment.id,
            employee_id = %assignment.employee_id,
            org_unit_id = %assignment.org_unit_id,
            primary = assignment.is_primary,
            "Org assignment created"
        );
        Ok(assignment)
    }

    /// End an open assignment. Assignments are never deleted.
    pub async fn end_assignment(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
    ) -> UniHrResult<OrgAssignment> {
        let current = self.assignment_repo.get_by_id(id).await?;
        if current.end_date.is_some() {
            return Err(UniHrError::validation(format!(
                "assignment {id} has already ended"
            )));
        }
        if end_date <= current.start_date {
            return Err(UniHrError::validation(format!(
                "end date {end_date} must be after the start date {}",
                current.start_date
            )));
        }

        let ended = self.assignment_repo.end(id, end_date).await?;
        info!(assignment_id = %id, %end_date, "Org assignment ended");
        Ok(ended)
    }

    pub async fn active_for_employee(
        &self,
        employee_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        self.assignment_repo
            .list_active_for_employee(employee_id, as_of)
            .await
    }

    pub async fn active_in_units(
        &self,
        org_unit_ids: Vec<Uuid>,
        as_of: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        self.assignment_repo
            .list_active_in_units(org_unit_ids, as_of)
            .await
    }

    /// Every assignment the employee ever held, oldest first.
    pub async fn history(&self, employee_id: Uuid) -> UniHrResult<Vec<OrgAssignment>> {
        self.assignment_repo.list_for_employee(employee_id).await
    }
}

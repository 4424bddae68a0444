//! SurrealDB implementation of [`OrgAssignmentRepository`].
//!
//! Every write bumps the scope revision in the same transaction.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use unihr_core::error::UniHrResult;
use unihr_core::models::assignment::{CreateOrgAssignment, OrgAssignment};
use unihr_core::repository::OrgAssignmentRepository;
use uuid::Uuid;

use super::{parse_enum, parse_opt_uuid, parse_uuid, script_error, uuids_to_strings};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AssignmentRowWithId {
    record_id: String,
    employee_id: String,
    org_unit_id: String,
    position_id: Option<String>,
    assignment_type: String,
    is_primary: bool,
    allocation_percent: u32,
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl AssignmentRowWithId {
    fn try_into_assignment(self) -> Result<OrgAssignment, DbError> {
        Ok(OrgAssignment {
            id: parse_uuid("assignment", &self.record_id)?,
            employee_id: parse_uuid("employee", &self.employee_id)?,
            org_unit_id: parse_uuid("org unit", &self.org_unit_id)?,
            position_id: parse_opt_uuid("position", self.position_id)?,
            assignment_type: parse_enum(&self.assignment_type)?,
            is_primary: self.is_primary,
            allocation_percent: self.allocation_percent,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ScopeRevisionRow {
    revision: u64,
}

/// Current value of the scope revision counter.
pub(crate) async fn fetch_scope_revision<C: Connection>(db: &Surreal<C>) -> Result<u64, DbError> {
    let mut result = db.query("SELECT revision FROM scope_state:main").await?;
    let rows: Vec<ScopeRevisionRow> = result.take(0)?;
    rows.first()
        .map(|r| r.revision)
        .ok_or_else(|| DbError::NotFound {
            entity: "scope_state".into(),
            id: "main".into(),
        })
}

const CREATE_SCRIPT: &str = "\
BEGIN TRANSACTION;
CREATE type::record('org_assignment', $id) SET
    employee_id = $employee_id, org_unit_id = $org_unit_id,
    position_id = $position_id, assignment_type = $assignment_type,
    is_primary = $is_primary, allocation_percent = $allocation_percent,
    start_date = $start_date;
UPDATE scope_state:main SET revision += 1, updated_at = time::now();
COMMIT TRANSACTION;
";

const END_SCRIPT: &str = "\
BEGIN TRANSACTION;
UPDATE type::record('org_assignment', $id)
    SET end_date = $end_date WHERE end_date = NONE;
UPDATE scope_state:main SET revision += 1, updated_at = time::now();
COMMIT TRANSACTION;
";

/// Assignments in force at `$at`.
const ACTIVE_AT: &str = "start_date <= $at AND (end_date = NONE OR end_date > $at)";

/// SurrealDB implementation of the OrgAssignment repository.
#[derive(Clone)]
pub struct SurrealOrgAssignmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrgAssignmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select(
        &self,
        filter: &str,
        employee_id: Option<Uuid>,
        unit_ids: Vec<String>,
        at: Option<DateTime<Utc>>,
    ) -> Result<Vec<OrgAssignment>, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * \
             FROM org_assignment WHERE {filter} \
             ORDER BY start_date ASC"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("employee_id", employee_id.map(|id| id.to_string())))
            .bind(("unit_ids", unit_ids))
            .bind(("at", at))
            .await?;

        let rows: Vec<AssignmentRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(|row| row.try_into_assignment())
            .collect()
    }
}

impl<C: Connection> OrgAssignmentRepository for SurrealOrgAssignmentRepository<C> {
    async fn create(&self, input: CreateOrgAssignment) -> UniHrResult<OrgAssignment> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(CREATE_SCRIPT)
            .bind(("id", id_str.clone()))
            .bind(("employee_id", input.employee_id.to_string()))
            .bind(("org_unit_id", input.org_unit_id.to_string()))
            .bind(("position_id", input.position_id.map(|id| id.to_string())))
            .bind(("assignment_type", input.assignment_type.as_str().to_string()))
            .bind(("is_primary", input.is_primary))
            .bind(("allocation_percent", input.allocation_percent))
            .bind(("start_date", input.start_date))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| script_error(e.to_string(), "org_assignment", &id_str))?;

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> UniHrResult<OrgAssignment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('org_assignment', $id)",
            )
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AssignmentRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_assignment".into(),
            id: id_str,
        })?;

        Ok(row.try_into_assignment()?)
    }

    async fn end(&self, id: Uuid, end_date: DateTime<Utc>) -> UniHrResult<OrgAssignment> {
        let id_str = id.to_string();

        let result = self
            .db
            .query(END_SCRIPT)
            .bind(("id", id_str.clone()))
            .bind(("end_date", end_date))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| script_error(e.to_string(), "org_assignment", &id_str))?;

        self.get_by_id(id).await
    }

    async fn list_for_employee(&self, employee_id: Uuid) -> UniHrResult<Vec<OrgAssignment>> {
        Ok(self
            .select("employee_id = $employee_id", Some(employee_id), Vec::new(), None)
            .await?)
    }

    async fn list_active(&self, at: DateTime<Utc>) -> UniHrResult<Vec<OrgAssignment>> {
        Ok(self.select(ACTIVE_AT, None, Vec::new(), Some(at)).await?)
    }

    async fn list_active_for_employee(
        &self,
        employee_id: Uuid,
        at: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        Ok(self
            .select(
                &format!("employee_id = $employee_id AND {ACTIVE_AT}"),
                Some(employee_id),
                Vec::new(),
                Some(at),
            )
            .await?)
    }

    async fn list_active_in_units(
        &self,
        org_unit_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        if org_unit_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .select(
                &format!("org_unit_id IN $unit_ids AND {ACTIVE_AT}"),
                None,
                uuids_to_strings(&org_unit_ids),
                Some(at),
            )
            .await?)
    }

    async fn scope_revision(&self) -> UniHrResult<u64> {
        Ok(fetch_scope_revision(&self.db).await?)
    }
}

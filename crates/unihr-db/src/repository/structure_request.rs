//! SurrealDB implementation of [`OrgStructureRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;
use unihr_core::error::UniHrResult;
use unihr_core::models::structure_request::{
    NewStructureRequest, OrgStructureRequest, StructurePayload, StructureRequestType,
};
use unihr_core::models::workflow::WorkflowStatus;
use unihr_core::repository::{OrgStructureRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_opt_uuid, parse_uuid, script_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct StructureRequestRowWithId {
    record_id: String,
    request_type: String,
    status: String,
    requester_id: String,
    target_org_unit_id: String,
    owner_org_id: String,
    payload: serde_json::Value,
    workflow_step: u64,
    current_reviewer_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl StructureRequestRowWithId {
    fn try_into_request(self) -> Result<OrgStructureRequest, DbError> {
        let request_type: StructureRequestType = parse_enum(&self.request_type)?;
        let payload = StructurePayload::from_document(request_type, self.payload)
            .map_err(|e| DbError::Decode(format!("request {}: {e}", self.record_id)))?;

        Ok(OrgStructureRequest {
            id: parse_uuid("structure request", &self.record_id)?,
            request_type,
            status: parse_enum(&self.status)?,
            requester_id: parse_uuid("requester", &self.requester_id)?,
            target_org_unit_id: parse_uuid("target org unit", &self.target_org_unit_id)?,
            owner_org_id: parse_uuid("owner org", &self.owner_org_id)?,
            payload,
            workflow_step: self.workflow_step,
            current_reviewer_id: parse_opt_uuid("reviewer", self.current_reviewer_id)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const CREATE_REQUEST_SCRIPT: &str = "\
BEGIN TRANSACTION;
IF $create_unit {
    CREATE type::record('org_unit', $unit_id) SET
        code = $code, name = $name, unit_type = $unit_type,
        status = 'Draft', description = $description,
        metadata = $metadata, version = 0;
};
CREATE type::record('org_structure_request', $id) SET
    request_type = $request_type, status = $status,
    requester_id = $requester_id,
    target_org_unit_id = $target_org_unit_id,
    owner_org_id = $owner_org_id, payload = $payload,
    workflow_step = $workflow_step;
IF $submitted {
    CREATE type::record('workflow_history', $h_id) SET
        target_table = 'org_structure_request', target_id = $id,
        sequence = $h_sequence, action = $h_action,
        reviewer_id = $h_reviewer_id, reviewer_role = $h_reviewer_role,
        comments = $h_comments, from_status = $h_from_status,
        to_status = $h_to_status;
};
COMMIT TRANSACTION;
";

/// Load one structure request by id.
pub(crate) async fn fetch_structure_request<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<OrgStructureRequest, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM type::record('org_structure_request', $id)",
        )
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<StructureRequestRowWithId> = result.take(0)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "org_structure_request".into(),
        id: id_str,
    })?;

    row.try_into_request()
}

/// SurrealDB implementation of the org structure request repository.
#[derive(Clone)]
pub struct SurrealOrgStructureRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrgStructureRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrgStructureRepository for SurrealOrgStructureRepository<C> {
    async fn create(&self, input: NewStructureRequest) -> UniHrResult<OrgStructureRequest> {
        let id = input.id;
        let id_str = id.to_string();
        let request_type = input.payload.request_type();
        let payload = input.payload.to_document()?;

        let (status, workflow_step) = match &input.submission {
            Some(h) => (h.to.status, h.sequence),
            None => (WorkflowStatus::Draft, 0),
        };

        let unit = input.draft_unit;
        let submission = input.submission;

        let response = self
            .db
            .query(CREATE_REQUEST_SCRIPT)
            .bind(("id", id_str.clone()))
            .bind(("create_unit", unit.is_some()))
            .bind(("unit_id", input.target_org_unit_id.to_string()))
            .bind(("code", unit.as_ref().map(|u| u.code.clone()).unwrap_or_default()))
            .bind(("name", unit.as_ref().map(|u| u.name.clone()).unwrap_or_default()))
            .bind((
                "unit_type",
                unit.as_ref()
                    .map(|u| u.unit_type.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ))
            .bind((
                "description",
                unit.as_ref().and_then(|u| u.description.clone()),
            ))
            .bind((
                "metadata",
                unit.map(|u| u.metadata)
                    .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            ))
            .bind(("request_type", request_type.as_str().to_string()))
            .bind(("status", status.as_str().to_string()))
            .bind(("requester_id", input.requester_id.to_string()))
            .bind(("target_org_unit_id", input.target_org_unit_id.to_string()))
            .bind(("owner_org_id", input.owner_org_id.to_string()))
            .bind(("payload", payload))
            .bind(("workflow_step", workflow_step))
            .bind(("submitted", submission.is_some()))
            .bind(("h_id", Uuid::new_v4().to_string()))
            .bind(("h_sequence", workflow_step))
            .bind((
                "h_action",
                submission
                    .as_ref()
                    .map(|h| h.action.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ))
            .bind((
                "h_reviewer_id",
                submission
                    .as_ref()
                    .map(|h| h.reviewer_id.to_string())
                    .unwrap_or_default(),
            ))
            .bind((
                "h_reviewer_role",
                submission
                    .as_ref()
                    .map(|h| h.reviewer_role.clone())
                    .unwrap_or_default(),
            ))
            .bind((
                "h_comments",
                submission.as_ref().and_then(|h| h.comments.clone()),
            ))
            .bind((
                "h_from_status",
                submission
                    .as_ref()
                    .map(|h| h.from.status.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ))
            .bind((
                "h_to_status",
                submission
                    .as_ref()
                    .map(|h| h.to.status.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ))
            .await
            .map_err(DbError::from)?;

        if let Err(e) = response.check() {
            return Err(script_error(e.to_string(), "org_structure_request", &id_str).into());
        }

        info!(
            request_id = %id,
            request_type = request_type.as_str(),
            status = status.as_str(),
            "Org structure request created"
        );

        Ok(fetch_structure_request(&self.db, id).await?)
    }

    async fn get_by_id(&self, id: Uuid) -> UniHrResult<OrgStructureRequest> {
        Ok(fetch_structure_request(&self.db, id).await?)
    }

    async fn list_by_owner(
        &self,
        owner_org_id: Uuid,
        pagination: Pagination,
    ) -> UniHrResult<PaginatedResult<OrgStructureRequest>> {
        let owner_str = owner_org_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM org_structure_request \
                 WHERE owner_org_id = $owner_org_id GROUP ALL",
            )
            .bind(("owner_org_id", owner_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM org_structure_request \
                 WHERE owner_org_id = $owner_org_id \
                 ORDER BY created_at DESC \
                 LIMIT $limit START $offset",
            )
            .bind(("owner_org_id", owner_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StructureRequestRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_request())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}

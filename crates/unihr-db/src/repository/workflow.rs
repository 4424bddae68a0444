//! SurrealDB implementation of [`WorkflowRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{info, warn};
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::models::workflow::{
    CreateWorkflowItem, WorkflowApprovalHistory, WorkflowItem, WorkflowSnapshot, WorkflowStage,
    WorkflowState, WorkflowStatus, WorkflowSubject, WorkflowTarget,
};
use unihr_core::repository::{TransitionCommit, WorkflowRepository};
use uuid::Uuid;

use super::assignment::fetch_scope_revision;
use super::hierarchy::{STRUCTURAL_STATEMENTS, StructuralBinds, bind_structural, fetch_revision};
use super::structure_request::fetch_structure_request;
use super::{parse_enum, parse_opt_uuid, parse_uuid, script_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct WorkflowItemRowWithId {
    record_id: String,
    subject: String,
    subject_id: String,
    title: String,
    owner_org_id: String,
    requester_id: String,
    stage: String,
    status: String,
    current_reviewer_id: Option<String>,
    priority: String,
    notes: Option<String>,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl WorkflowItemRowWithId {
    fn try_into_item(self) -> Result<WorkflowItem, DbError> {
        Ok(WorkflowItem {
            id: parse_uuid("workflow item", &self.record_id)?,
            subject: parse_enum(&self.subject)?,
            subject_id: parse_uuid("subject", &self.subject_id)?,
            title: self.title,
            owner_org_id: parse_uuid("owner org", &self.owner_org_id)?,
            requester_id: parse_uuid("requester", &self.requester_id)?,
            stage: parse_enum(&self.stage)?,
            status: parse_enum(&self.status)?,
            current_reviewer_id: parse_opt_uuid("reviewer", self.current_reviewer_id)?,
            priority: parse_enum(&self.priority)?,
            notes: self.notes,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct ApprovalHistoryRowWithId {
    record_id: String,
    target_table: String,
    target_id: String,
    sequence: u64,
    action: String,
    reviewer_id: String,
    reviewer_role: String,
    comments: Option<String>,
    from_stage: Option<String>,
    to_stage: Option<String>,
    from_status: String,
    to_status: String,
    created_at: DateTime<Utc>,
}

impl ApprovalHistoryRowWithId {
    fn try_into_history(self) -> Result<WorkflowApprovalHistory, DbError> {
        let target_id = parse_uuid("target", &self.target_id)?;
        let target = match self.target_table.as_str() {
            "workflow_item" => WorkflowTarget::Item(target_id),
            "org_structure_request" => WorkflowTarget::StructureRequest(target_id),
            other => {
                return Err(DbError::Decode(format!("unknown workflow table: {other}")));
            }
        };

        Ok(WorkflowApprovalHistory {
            id: parse_uuid("history", &self.record_id)?,
            target,
            sequence: self.sequence,
            action: parse_enum(&self.action)?,
            reviewer_id: parse_uuid("reviewer", &self.reviewer_id)?,
            reviewer_role: self.reviewer_role,
            comments: self.comments,
            from_stage: parse_opt_stage(self.from_stage)?,
            to_stage: parse_opt_stage(self.to_stage)?,
            from_status: parse_enum(&self.from_status)?,
            to_status: parse_enum(&self.to_status)?,
            created_at: self.created_at,
        })
    }
}

fn parse_opt_stage(value: Option<String>) -> Result<Option<WorkflowStage>, DbError> {
    value.map(|v| parse_enum(&v)).transpose()
}

/// Column holding the optimistic version of each workflow table.
fn version_field(target: WorkflowTarget) -> &'static str {
    match target {
        WorkflowTarget::Item(_) => "version",
        WorkflowTarget::StructureRequest(_) => "workflow_step",
    }
}

fn transition_script(target: WorkflowTarget, with_structural: bool) -> String {
    let table = target.table();
    let version = version_field(target);
    let stage_set = match target {
        WorkflowTarget::Item(_) => "stage = $w_stage,",
        WorkflowTarget::StructureRequest(_) => "",
    };
    let structural = if with_structural {
        STRUCTURAL_STATEMENTS
    } else {
        ""
    };

    format!(
        "BEGIN TRANSACTION;
LET $w_version = (SELECT VALUE {version} FROM ONLY type::record('{table}', $w_id));
IF $w_version != $w_expected_version {{
    THROW 'unihr-conflict: workflow version changed';
}};
LET $w_scope_revision = (SELECT VALUE revision FROM ONLY scope_state:main);
IF $w_scope_revision != $w_expected_scope_revision {{
    THROW 'unihr-conflict: actor scope changed';
}};
UPDATE type::record('{table}', $w_id) SET
    {stage_set}
    status = $w_status,
    current_reviewer_id = $w_reviewer_id,
    {version} += 1,
    updated_at = time::now();
CREATE type::record('workflow_history', $w_history_id) SET
    target_table = '{table}', target_id = $w_id,
    sequence = $w_sequence, action = $w_action,
    reviewer_id = $w_history_reviewer, reviewer_role = $w_reviewer_role,
    comments = $w_comments,
    from_stage = $w_from_stage, to_stage = $w_to_stage,
    from_status = $w_from_status, to_status = $w_to_status;
{structural}COMMIT TRANSACTION;
"
    )
}

/// SurrealDB implementation of the workflow repository.
#[derive(Clone)]
pub struct SurrealWorkflowRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealWorkflowRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn fetch_item(&self, id: Uuid) -> Result<WorkflowItem, DbError> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM type::record('workflow_item', $id)",
            )
            .bind(("id", id_str.clone()))
            .await?;

        let rows: Vec<WorkflowItemRowWithId> = result.take(0)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "workflow_item".into(),
            id: id_str,
        })?;

        row.try_into_item()
    }

    async fn fetch_snapshot(&self, target: WorkflowTarget) -> Result<WorkflowSnapshot, DbError> {
        match target {
            WorkflowTarget::Item(id) => {
                let item = self.fetch_item(id).await?;
                Ok(WorkflowSnapshot {
                    target,
                    subject: item.subject,
                    state: WorkflowState::staged(item.stage, item.status),
                    version: item.version,
                    owner_org_id: item.owner_org_id,
                    requester_id: item.requester_id,
                    current_reviewer_id: item.current_reviewer_id,
                })
            }
            WorkflowTarget::StructureRequest(id) => {
                let request = fetch_structure_request(&self.db, id).await?;
                Ok(WorkflowSnapshot {
                    target,
                    subject: WorkflowSubject::OrgStructure,
                    state: WorkflowState::unstaged(request.status),
                    version: request.workflow_step,
                    owner_org_id: request.owner_org_id,
                    requester_id: request.requester_id,
                    current_reviewer_id: request.current_reviewer_id,
                })
            }
        }
    }

    /// Explain a failed transition script: a moved guard is a conflict,
    /// anything else is reported as is.
    async fn transition_failure(
        &self,
        message: String,
        target: WorkflowTarget,
        expected_version: u64,
        expected_scope_revision: u64,
        expected_revision: Option<u64>,
    ) -> Result<DbError, DbError> {
        let id = target.id().to_string();

        let current = self.fetch_snapshot(target).await?;
        if current.version != expected_version {
            warn!(
                target_id = %id,
                expected_version,
                current_version = current.version,
                "Workflow entity changed concurrently"
            );
            return Ok(DbError::Conflict {
                entity: target.table().into(),
                id,
                reason: format!(
                    "version moved from {expected_version} to {}",
                    current.version
                ),
            });
        }

        let scope_revision = fetch_scope_revision(&self.db).await?;
        if scope_revision != expected_scope_revision {
            warn!(
                target_id = %id,
                expected_scope_revision,
                current_scope_revision = scope_revision,
                "Assignments or relations changed during transition"
            );
            return Ok(DbError::Conflict {
                entity: target.table().into(),
                id,
                reason: format!(
                    "scope revision moved from {expected_scope_revision} to {scope_revision}"
                ),
            });
        }

        if let Some(expected_revision) = expected_revision {
            let revision = fetch_revision(&self.db).await?;
            if revision != expected_revision {
                warn!(
                    target_id = %id,
                    expected_revision,
                    current_revision = revision,
                    "Hierarchy changed during approval"
                );
                return Ok(DbError::Conflict {
                    entity: target.table().into(),
                    id,
                    reason: format!(
                        "hierarchy revision moved from {expected_revision} to {revision}"
                    ),
                });
            }
        }

        Ok(script_error(message, target.table(), &id))
    }
}

impl<C: Connection> WorkflowRepository for SurrealWorkflowRepository<C> {
    async fn create_item(&self, input: CreateWorkflowItem) -> UniHrResult<WorkflowItem> {
        if input.subject == WorkflowSubject::OrgStructure {
            return Err(UniHrError::validation(
                "org structure changes are opened as structure requests",
            ));
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('workflow_item', $id) SET \
                 subject = $subject, subject_id = $subject_id, title = $title, \
                 owner_org_id = $owner_org_id, requester_id = $requester_id, \
                 stage = $stage, status = $status, priority = $priority, \
                 notes = $notes, version = 0",
            )
            .bind(("id", id_str.clone()))
            .bind(("subject", input.subject.as_str().to_string()))
            .bind(("subject_id", input.subject_id.to_string()))
            .bind(("title", input.title))
            .bind(("owner_org_id", input.owner_org_id.to_string()))
            .bind(("requester_id", input.requester_id.to_string()))
            .bind(("stage", WorkflowStage::Faculty.as_str().to_string()))
            .bind(("status", WorkflowStatus::Draft.as_str().to_string()))
            .bind(("priority", input.priority.as_str().to_string()))
            .bind(("notes", input.notes))
            .await
            .map_err(DbError::from)?;

        result
            .check()
            .map_err(|e| script_error(e.to_string(), "workflow_item", &id_str))?;

        Ok(self.fetch_item(id).await?)
    }

    async fn get_item(&self, id: Uuid) -> UniHrResult<WorkflowItem> {
        Ok(self.fetch_item(id).await?)
    }

    async fn load_snapshot(&self, target: WorkflowTarget) -> UniHrResult<WorkflowSnapshot> {
        Ok(self.fetch_snapshot(target).await?)
    }

    async fn commit(&self, commit: TransitionCommit) -> UniHrResult<WorkflowSnapshot> {
        let target = commit.target;
        let expected_version = commit.expected_version;
        let expected_scope_revision = commit.expected_scope_revision;
        let expected_revision = commit.structural.as_ref().map(|s| s.expected_revision);
        let history = commit.history;

        let script = transition_script(target, commit.structural.is_some());
        let query = self
            .db
            .query(&script)
            .bind(("w_id", target.id().to_string()))
            .bind(("w_expected_version", expected_version))
            .bind(("w_expected_scope_revision", expected_scope_revision))
            .bind(("w_stage", commit.to.stage.map(|s| s.as_str().to_string())))
            .bind(("w_status", commit.to.status.as_str().to_string()))
            .bind((
                "w_reviewer_id",
                commit.current_reviewer_id.map(|id| id.to_string()),
            ))
            .bind(("w_history_id", Uuid::new_v4().to_string()))
            .bind(("w_sequence", history.sequence))
            .bind(("w_action", history.action.as_str().to_string()))
            .bind(("w_history_reviewer", history.reviewer_id.to_string()))
            .bind(("w_reviewer_role", history.reviewer_role))
            .bind(("w_comments", history.comments))
            .bind((
                "w_from_stage",
                history.from.stage.map(|s| s.as_str().to_string()),
            ))
            .bind((
                "w_to_stage",
                history.to.stage.map(|s| s.as_str().to_string()),
            ))
            .bind(("w_from_status", history.from.status.as_str().to_string()))
            .bind(("w_to_status", history.to.status.as_str().to_string()));

        let query = match commit.structural {
            Some(structural) => bind_structural!(query, StructuralBinds::from(structural)),
            None => query,
        };

        let response = query.await.map_err(DbError::from)?;

        if let Err(e) = response.check() {
            let err = self
                .transition_failure(
                    e.to_string(),
                    target,
                    expected_version,
                    expected_scope_revision,
                    expected_revision,
                )
                .await?;
            return Err(err.into());
        }

        info!(
            target_id = %target.id(),
            table = target.table(),
            action = history.action.as_str(),
            from = %history.from,
            to = %history.to,
            reviewer_id = %history.reviewer_id,
            "Workflow transition committed"
        );

        Ok(self.fetch_snapshot(target).await?)
    }

    async fn history(&self, target: WorkflowTarget) -> UniHrResult<Vec<WorkflowApprovalHistory>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM workflow_history \
                 WHERE target_table = $target_table AND target_id = $target_id \
                 ORDER BY sequence ASC",
            )
            .bind(("target_table", target.table().to_string()))
            .bind(("target_id", target.id().to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ApprovalHistoryRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_history())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

//! Approval workflow engine.
//!
//! Drives course/program publication items and org structure requests
//! through the transition table in [`unihr_core::transition`]. Each accepted
//! action is written as one transaction: the new state, one approval
//! history record and, for an approved structure request, the structural
//! change it describes.

use chrono::Utc;
use tracing::{error, info, warn};
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::models::actor::Actor;
use unihr_core::models::workflow::{
    CreateWorkflowItem, NewApprovalHistory, WorkflowAction, WorkflowApprovalHistory,
    WorkflowItem, WorkflowSnapshot, WorkflowState, WorkflowStatus, WorkflowTarget,
};
use unihr_core::repository::{
    HierarchyRepository, OrgAssignmentRepository, OrgStructureRepository, OrgUnitRepository,
    TransitionCommit, WorkflowRepository,
};
use unihr_core::scope::ScopeResult;
use unihr_core::transition::{next_state, required_permission, verify_chain};
use uuid::Uuid;

use crate::error::GovernanceError;
use crate::hierarchy::HierarchyService;
use crate::scope::{ScopeResolver, ensure_org_unit_in_scope};

/// Input for one workflow action.
#[derive(Debug, Clone)]
pub struct ApplyAction {
    pub target: WorkflowTarget,
    pub action: WorkflowAction,
    pub actor: Actor,
    pub comment: Option<String>,
    /// State the caller last observed. A mismatch is a conflict.
    pub expected: WorkflowState,
}

/// Approval workflow engine.
///
/// Generic over repository implementations so that the workflow layer
/// has no dependency on the database crate.
pub struct WorkflowEngine<W, S, U, H, A>
where
    W: WorkflowRepository,
    S: OrgStructureRepository,
    U: OrgUnitRepository,
    H: HierarchyRepository,
    A: OrgAssignmentRepository,
{
    workflow_repo: W,
    structure_repo: S,
    hierarchy: HierarchyService<U, H>,
    scope: ScopeResolver<H, A>,
}

impl<W, S, U, H, A> WorkflowEngine<W, S, U, H, A>
where
    W: WorkflowRepository,
    S: OrgStructureRepository,
    U: OrgUnitRepository,
    H: HierarchyRepository,
    A: OrgAssignmentRepository,
{
    pub fn new(
        workflow_repo: W,
        structure_repo: S,
        hierarchy: HierarchyService<U, H>,
        scope: ScopeResolver<H, A>,
    ) -> Self {
        Self {
            workflow_repo,
            structure_repo,
            hierarchy,
            scope,
        }
    }

    /// Open a publication workflow for a course or program. The item
    /// starts at `{Faculty, Draft}`.
    pub async fn create_item(
        &self,
        input: CreateWorkflowItem,
        actor: &Actor,
    ) -> UniHrResult<WorkflowItem> {
        if input.title.trim().is_empty() {
            return Err(UniHrError::validation("workflow item title must not be empty"));
        }
        if input.requester_id != actor.id {
            return Err(UniHrError::validation(
                "workflow items must be opened by their requester",
            ));
        }

        let permission = required_permission(input.subject, None, WorkflowAction::Submit);
        self.scope
            .authorize(actor, &permission, input.owner_org_id, input.requester_id)
            .await?;

        let item = self.workflow_repo.create_item(input).await?;
        info!(
            item_id = %item.id,
            subject = item.subject.as_str(),
            owner_org_id = %item.owner_org_id,
            "Workflow item created"
        );
        Ok(item)
    }

    pub async fn get_item(&self, id: Uuid) -> UniHrResult<WorkflowItem> {
        self.workflow_repo.get_item(id).await
    }

    pub async fn snapshot(&self, target: WorkflowTarget) -> UniHrResult<WorkflowSnapshot> {
        self.workflow_repo.load_snapshot(target).await
    }

    /// Approval history of `target`, oldest first.
    pub async fn history(
        &self,
        target: WorkflowTarget,
    ) -> UniHrResult<Vec<WorkflowApprovalHistory>> {
        self.workflow_repo.history(target).await
    }

    /// Check that the stored history of `target` is a gap-free chain
    /// ending in its current state.
    pub async fn verify_chain(&self, target: WorkflowTarget) -> UniHrResult<()> {
        let snapshot = self.workflow_repo.load_snapshot(target).await?;
        let history = self.workflow_repo.history(target).await?;

        let result = if snapshot.version != history.len() as u64 {
            Err(UniHrError::StructuralIntegrity(format!(
                "{} {} is at version {} but has {} history record(s)",
                target.table(),
                target.id(),
                snapshot.version,
                history.len()
            )))
        } else {
            verify_chain(snapshot.subject.kind(), &history, snapshot.state)
        };

        if let Err(e) = &result {
            error!(target_id = %target.id(), error = %e, "Workflow history chain broken");
        }
        result
    }

    /// Apply one workflow action.
    pub async fn apply(&self, input: ApplyAction) -> UniHrResult<WorkflowSnapshot> {
        let target = input.target;
        let actor = &input.actor;

        // 1. Load the current state and version.
        let snapshot = self.workflow_repo.load_snapshot(target).await?;

        // 2. The caller must have seen the current state.
        if snapshot.state != input.expected {
            warn!(
                target_id = %target.id(),
                expected = %input.expected,
                current = %snapshot.state,
                "Stale workflow state"
            );
            return Err(UniHrError::Conflict {
                entity: target.table().into(),
                id: target.id().to_string(),
                reason: format!(
                    "expected {} but entity is at {}",
                    input.expected, snapshot.state
                ),
            });
        }

        // 3. Look up the transition.
        let to = next_state(snapshot.subject.kind(), snapshot.state, input.action)
            .ok_or_else(|| UniHrError::InvalidTransition {
                entity: target.table().into(),
                action: input.action.as_str().into(),
                state: snapshot.state.to_string(),
            })?;

        // 4. Authorize against the owning org unit. The scope revision read
        //    first guards the commit.
        let permission = required_permission(snapshot.subject, snapshot.state.stage, input.action);
        let scope_revision = self.scope.revision().await?;
        let scope = self
            .scope
            .authorize(actor, &permission, snapshot.owner_org_id, snapshot.requester_id)
            .await?;
        if matches!(scope, ScopeResult::SelfOnly { .. }) && input.action != WorkflowAction::Submit
        {
            warn!(actor_id = %actor.id, action = input.action.as_str(), "Self-only actor");
            return Err(GovernanceError::SelfOnlyAction {
                action: input.action.as_str().into(),
            }
            .into());
        }

        // 5. Plan the structural change of an approved structure request.
        //    The approver must also cover the unit it is placed under.
        let structural = match target {
            WorkflowTarget::StructureRequest(id) if to.status == WorkflowStatus::Approved => {
                let request = self.structure_repo.get_by_id(id).await?;
                if let Some(parent_id) = request.payload.change.destination_parent() {
                    ensure_org_unit_in_scope(actor, &permission, &scope, parent_id)?;
                }
                Some(
                    self.hierarchy
                        .plan_for_request(&request, actor.id, Utc::now())
                        .await?,
                )
            }
            _ => None,
        };

        // 6. Commit, guarded by the version read in step 1 and the scope
        //    revision read in step 4.
        let current_reviewer_id =
            (input.action == WorkflowAction::StartReview).then_some(actor.id);
        let committed = self
            .workflow_repo
            .commit(TransitionCommit {
                target,
                expected_version: snapshot.version,
                expected_scope_revision: scope_revision,
                to,
                current_reviewer_id,
                history: NewApprovalHistory {
                    sequence: snapshot.version + 1,
                    action: input.action,
                    reviewer_id: actor.id,
                    reviewer_role: permission,
                    comments: input.comment,
                    from: snapshot.state,
                    to,
                },
                structural,
            })
            .await?;

        info!(
            target_id = %target.id(),
            action = input.action.as_str(),
            from = %snapshot.state,
            to = %committed.state,
            version = committed.version,
            actor_id = %actor.id,
            "Workflow transition applied"
        );
        Ok(committed)
    }
}

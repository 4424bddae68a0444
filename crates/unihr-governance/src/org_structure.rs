//! Org structure requests: proposals to create, rename, move or archive a
//! unit. Nothing structural happens here; the change is applied when the
//! request is approved through the workflow engine.

use chrono::{DateTime, Utc};
use tracing::info;
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::models::actor::Actor;
use unihr_core::models::org_unit::{
    NewDraftUnit, OrgUnit, OrgUnitStatus, OrgUnitType, validate_code, validate_name,
};
use unihr_core::models::relation::RelationType;
use unihr_core::models::structure_request::{
    NewStructureRequest, OrgStructureRequest, StructureChange, StructurePayload,
};
use unihr_core::models::workflow::{
    NewApprovalHistory, WorkflowAction, WorkflowKind, WorkflowState, WorkflowSubject,
};
use unihr_core::repository::{
    HierarchyRepository, OrgAssignmentRepository, OrgStructureRepository, OrgUnitRepository,
    PaginatedResult, Pagination,
};
use unihr_core::transition::{initial_state, next_state, required_permission};
use uuid::Uuid;

use crate::hierarchy::{HierarchyService, ensure_not_future, expect_status};
use crate::scope::ScopeResolver;

/// Input for proposing a new org unit.
#[derive(Debug, Clone)]
pub struct CreateOrgUnit {
    pub code: String,
    pub name: String,
    pub unit_type: OrgUnitType,
    pub parent_id: Option<Uuid>,
    pub relation_type: RelationType,
    /// Defaults to the approval time.
    pub effective_from: Option<DateTime<Utc>>,
    /// Unit authorizing the request.
    pub owner_org_id: Uuid,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    /// Supporting details stored in the request payload.
    pub details: Option<serde_json::Value>,
    /// Open the request already submitted.
    pub submit: bool,
}

/// A draft unit together with the request that will activate it.
#[derive(Debug, Clone)]
pub struct ProposedOrgUnit {
    pub unit: OrgUnit,
    pub request: OrgStructureRequest,
}

/// Input for proposing a move.
#[derive(Debug, Clone)]
pub struct ProposeMove {
    pub unit_id: Uuid,
    pub new_parent_id: Option<Uuid>,
    pub relation_type: RelationType,
    pub effective_from: DateTime<Utc>,
    pub details: Option<serde_json::Value>,
}

pub struct OrgStructureService<S, U, H, A>
where
    S: OrgStructureRepository,
    U: OrgUnitRepository,
    H: HierarchyRepository,
    A: OrgAssignmentRepository,
{
    structure_repo: S,
    hierarchy: HierarchyService<U, H>,
    scope: ScopeResolver<H, A>,
}

impl<S, U, H, A> OrgStructureService<S, U, H, A>
where
    S: OrgStructureRepository,
    U: OrgUnitRepository,
    H: HierarchyRepository,
    A: OrgAssignmentRepository,
{
    pub fn new(
        structure_repo: S,
        hierarchy: HierarchyService<U, H>,
        scope: ScopeResolver<H, A>,
    ) -> Self {
        Self {
            structure_repo,
            hierarchy,
            scope,
        }
    }

    /// Insert a draft unit and the request that will activate it, in one
    /// transaction.
    pub async fn create_org_unit(
        &self,
        input: CreateOrgUnit,
        actor: &Actor,
    ) -> UniHrResult<ProposedOrgUnit> {
        validate_code(&input.code)?;
        validate_name(&input.name)?;
        if let Some(from) = input.effective_from {
            ensure_not_future(from)?;
        }

        self.authorize_submit(actor, input.owner_org_id).await?;
        self.hierarchy.ensure_code_free(&input.code).await?;
        if let Some(parent_id) = input.parent_id {
            self.destination_parent(parent_id, actor).await?;
        }

        let unit_id = Uuid::new_v4();
        let draft = NewDraftUnit {
            id: unit_id,
            code: input.code,
            name: input.name.trim().to_string(),
            unit_type: input.unit_type,
            description: input.description,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        };
        let change = StructureChange::CreateUnit {
            parent_id: input.parent_id,
            relation_type: input.relation_type,
            effective_from: input.effective_from,
        };

        let request = self
            .open_request(
                actor,
                unit_id,
                input.owner_org_id,
                change,
                input.details,
                Some(draft),
                input.submit,
            )
            .await?;
        let unit = self.hierarchy.get_unit(unit_id).await?;

        Ok(ProposedOrgUnit { unit, request })
    }

    pub async fn propose_rename(
        &self,
        unit_id: Uuid,
        new_name: &str,
        details: Option<serde_json::Value>,
        actor: &Actor,
    ) -> UniHrResult<OrgStructureRequest> {
        validate_name(new_name)?;
        let unit = self.active_target(unit_id, actor).await?;
        if unit.name == new_name.trim() {
            return Err(UniHrError::validation(format!(
                "org unit {unit_id} is already named {new_name:?}"
            )));
        }

        let change = StructureChange::RenameUnit {
            new_name: new_name.trim().to_string(),
        };
        self.open_request(actor, unit_id, unit_id, change, details, None, false)
            .await
    }

    /// Propose a move. The cycle check runs here for early feedback and
    /// again when the request is approved.
    pub async fn propose_move(
        &self,
        input: ProposeMove,
        actor: &Actor,
    ) -> UniHrResult<OrgStructureRequest> {
        ensure_not_future(input.effective_from)?;
        self.active_target(input.unit_id, actor).await?;

        if let Some(parent_id) = input.new_parent_id {
            self.destination_parent(parent_id, actor).await?;
            if self
                .hierarchy
                .would_create_cycle(parent_id, input.unit_id, input.effective_from)
                .await?
            {
                return Err(UniHrError::CycleDetected {
                    parent_id: parent_id.to_string(),
                    child_id: input.unit_id.to_string(),
                });
            }
        }

        let change = StructureChange::MoveUnit {
            new_parent_id: input.new_parent_id,
            relation_type: input.relation_type,
            effective_from: input.effective_from,
        };
        self.open_request(
            actor,
            input.unit_id,
            input.unit_id,
            change,
            input.details,
            None,
            false,
        )
        .await
    }

    pub async fn propose_archive(
        &self,
        unit_id: Uuid,
        effective_from: Option<DateTime<Utc>>,
        reason: Option<String>,
        actor: &Actor,
    ) -> UniHrResult<OrgStructureRequest> {
        if let Some(from) = effective_from {
            ensure_not_future(from)?;
        }
        self.active_target(unit_id, actor).await?;

        let change = StructureChange::ArchiveUnit {
            effective_from,
            reason,
        };
        self.open_request(actor, unit_id, unit_id, change, None, None, false)
            .await
    }

    pub async fn get_request(&self, id: Uuid) -> UniHrResult<OrgStructureRequest> {
        self.structure_repo.get_by_id(id).await
    }

    /// Requests owned by `owner_org_id`, newest first.
    pub async fn list_requests(
        &self,
        owner_org_id: Uuid,
        pagination: Pagination,
    ) -> UniHrResult<PaginatedResult<OrgStructureRequest>> {
        self.structure_repo
            .list_by_owner(owner_org_id, pagination)
            .await
    }

    async fn authorize_submit(&self, actor: &Actor, owner_org_id: Uuid) -> UniHrResult<()> {
        self.scope
            .authorize(actor, &submit_permission(), owner_org_id, actor.id)
            .await?;
        Ok(())
    }

    /// Load `unit_id`, require it to be active and authorize `actor` to
    /// propose changes to it.
    async fn active_target(&self, unit_id: Uuid, actor: &Actor) -> UniHrResult<OrgUnit> {
        let unit = self.hierarchy.get_unit(unit_id).await?;
        expect_status(&unit, OrgUnitStatus::Active)?;
        self.authorize_submit(actor, unit_id).await?;
        Ok(unit)
    }

    /// Require the unit a proposal places something under to be active and
    /// inside the actor's own scope.
    async fn destination_parent(&self, parent_id: Uuid, actor: &Actor) -> UniHrResult<()> {
        let parent = self.hierarchy.get_unit(parent_id).await?;
        expect_status(&parent, OrgUnitStatus::Active)?;
        self.scope
            .authorize_org_unit(actor, &submit_permission(), parent_id)
            .await?;
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn open_request(
        &self,
        actor: &Actor,
        target_org_unit_id: Uuid,
        owner_org_id: Uuid,
        change: StructureChange,
        details: Option<serde_json::Value>,
        draft_unit: Option<NewDraftUnit>,
        submit: bool,
    ) -> UniHrResult<OrgStructureRequest> {
        let request_type = change.request_type();
        let payload = StructurePayload::new(change, details);
        payload.validate(request_type)?;

        let submission = if submit {
            let from = initial_state(WorkflowKind::OrgStructure);
            let to = submitted(from)?;
            Some(NewApprovalHistory {
                sequence: 1,
                action: WorkflowAction::Submit,
                reviewer_id: actor.id,
                reviewer_role: submit_permission(),
                comments: None,
                from,
                to,
            })
        } else {
            None
        };

        let request = self
            .structure_repo
            .create(NewStructureRequest {
                id: Uuid::new_v4(),
                requester_id: actor.id,
                target_org_unit_id,
                owner_org_id,
                payload,
                draft_unit,
                submission,
            })
            .await?;

        info!(
            request_id = %request.id,
            request_type = request.request_type.as_str(),
            target_org_unit_id = %target_org_unit_id,
            status = %request.status,
            "Org structure request opened"
        );
        Ok(request)
    }
}

fn submit_permission() -> String {
    required_permission(WorkflowSubject::OrgStructure, None, WorkflowAction::Submit)
}

fn submitted(from: WorkflowState) -> UniHrResult<WorkflowState> {
    next_state(WorkflowKind::OrgStructure, from, WorkflowAction::Submit).ok_or_else(|| {
        UniHrError::Internal(format!("org structure requests cannot be submitted from {from}"))
    })
}

//! Hierarchy service: time-travel queries over the org chart and the
//! planning of structural changes.
//!
//! Every structural write is planned here against the hierarchy revision
//! read at the start of planning, then committed by the repository as one
//! transaction guarded by that revision. Approval side effects reuse the
//! same planners so that a workflow-driven move and a direct move are the
//! same change.
//!
//! The service does not authorize; callers own that decision.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{error, info, warn};
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::hierarchy::{
    HierarchySnapshot, IntegrityReport, OrgTreeNode, StructuralCommit, audit_hierarchy,
    current_parent, plan_relation_change, would_create_cycle,
};
use unihr_core::models::history::{ChangeType, NewOrgUnitHistory};
use unihr_core::models::org_unit::{
    NewDraftUnit, OrgUnit, OrgUnitStatus, OrgUnitType, validate_code, validate_name,
};
use unihr_core::models::relation::{NewRelation, OrgUnitRelation, RelationType};
use unihr_core::models::structure_request::{OrgStructureRequest, StructureChange};
use unihr_core::repository::{HierarchyRepository, OrgUnitRepository};
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;

/// Input for registering an active unit directly (bootstrap and import).
#[derive(Debug, Clone)]
pub struct RegisterUnit {
    pub code: String,
    pub name: String,
    pub unit_type: OrgUnitType,
    pub description: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub parent_id: Option<Uuid>,
    pub relation_type: RelationType,
    pub effective_from: DateTime<Utc>,
}

/// Input for a structural move.
#[derive(Debug, Clone)]
pub struct MoveUnit {
    pub unit_id: Uuid,
    /// `None` detaches the unit and makes it a root.
    pub new_parent_id: Option<Uuid>,
    pub relation_type: RelationType,
    pub effective_from: DateTime<Utc>,
    pub note: Option<String>,
}

/// Hierarchy queries and structural change planning.
pub struct HierarchyService<U: OrgUnitRepository, H: HierarchyRepository> {
    unit_repo: U,
    hierarchy_repo: H,
    config: GovernanceConfig,
}

impl<U: OrgUnitRepository, H: HierarchyRepository> HierarchyService<U, H> {
    pub fn new(unit_repo: U, hierarchy_repo: H, config: GovernanceConfig) -> Self {
        Self {
            unit_repo,
            hierarchy_repo,
            config,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The parent/child graph in effect at `as_of`.
    pub async fn snapshot(&self, as_of: DateTime<Utc>) -> UniHrResult<HierarchySnapshot> {
        let relations = self.hierarchy_repo.list_active_at(as_of).await?;
        HierarchySnapshot::build(as_of, &relations)
    }

    /// `roots` plus every unit below them at `as_of`.
    pub async fn descendants(
        &self,
        roots: &[Uuid],
        as_of: DateTime<Utc>,
    ) -> UniHrResult<BTreeSet<Uuid>> {
        self.snapshot(as_of)
            .await?
            .descendants(roots.iter().copied())
    }

    /// Parent chain of `unit_id` at `as_of`, nearest first.
    pub async fn ancestors(&self, unit_id: Uuid, as_of: DateTime<Utc>) -> UniHrResult<Vec<Uuid>> {
        self.snapshot(as_of).await?.ancestors(unit_id)
    }

    /// The relation placing `child_id` at `as_of`, or `None` for a root.
    pub async fn current_parent(
        &self,
        child_id: Uuid,
        as_of: DateTime<Utc>,
    ) -> UniHrResult<Option<OrgUnitRelation>> {
        let relations = self.hierarchy_repo.list_for_child(child_id).await?;
        current_parent(child_id, &relations, as_of)
    }

    /// Whether an edge `parent_id -> child_id` starting at `from` would
    /// close a loop.
    pub async fn would_create_cycle(
        &self,
        parent_id: Uuid,
        child_id: Uuid,
        from: DateTime<Utc>,
    ) -> UniHrResult<bool> {
        let relations = self.hierarchy_repo.list_effective_since(from).await?;
        Ok(would_create_cycle(&relations, parent_id, child_id, from))
    }

    /// Nested org chart of the non-archived units under `roots` at `as_of`.
    pub async fn tree(
        &self,
        roots: &[Uuid],
        as_of: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgTreeNode>> {
        let snapshot = self.snapshot(as_of).await?;
        let units: HashMap<Uuid, OrgUnit> = self
            .unit_repo
            .list_all()
            .await?
            .into_iter()
            .filter(|u| u.status != OrgUnitStatus::Archived)
            .map(|u| (u.id, u))
            .collect();
        snapshot.tree(roots, &units)
    }

    /// Scan every unit and relation for invariant violations.
    pub async fn verify_integrity(&self) -> UniHrResult<IntegrityReport> {
        let units = self.unit_repo.list_all().await?;
        let relations = self.hierarchy_repo.list_all().await?;
        let report = audit_hierarchy(&units, &relations, Utc::now());

        for violation in &report.violations {
            error!(?violation, "Org hierarchy integrity violation");
        }
        if report.is_clean() {
            info!(
                units = units.len(),
                relations = relations.len(),
                "Org hierarchy integrity verified"
            );
        }

        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Direct structural changes
    // -----------------------------------------------------------------------

    /// Insert an active unit, optionally under `parent_id`, in one
    /// transaction.
    pub async fn register_unit(
        &self,
        input: RegisterUnit,
        changed_by: Option<Uuid>,
    ) -> UniHrResult<OrgUnit> {
        validate_code(&input.code)?;
        validate_name(&input.name)?;
        self.ensure_code_free(&input.code).await?;

        let id = Uuid::new_v4();
        let draft = NewDraftUnit {
            id,
            code: input.code,
            name: input.name.trim().to_string(),
            unit_type: input.unit_type,
            description: input.description,
            metadata: input
                .metadata
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
        };

        let mut plan = self
            .plan_placement(
                id,
                &draft.name,
                input.parent_id,
                input.relation_type,
                input.effective_from,
                changed_by,
                json!({ "source": "register" }),
            )
            .await?;
        plan.create_unit = Some(draft);

        self.hierarchy_repo.commit_structural_change(plan).await
    }

    /// Move a unit under a new parent (or detach it), closing its current
    /// relation at `effective_from`.
    pub async fn move_unit(&self, input: MoveUnit, changed_by: Option<Uuid>) -> UniHrResult<OrgUnit> {
        let unit_id = input.unit_id;
        let plan = self.plan_move(input, changed_by, json!({})).await?;
        let unit = self.hierarchy_repo.commit_structural_change(plan).await?;
        info!(org_unit_id = %unit_id, parent_id = ?unit.parent_id, "Org unit moved");
        Ok(unit)
    }

    // -----------------------------------------------------------------------
    // Planning
    // -----------------------------------------------------------------------

    /// Plan the structural side effect of approving `request`.
    pub async fn plan_for_request(
        &self,
        request: &OrgStructureRequest,
        changed_by: Uuid,
        now: DateTime<Utc>,
    ) -> UniHrResult<StructuralCommit> {
        let unit_id = request.target_org_unit_id;
        let details = json!({
            "request_id": request.id.to_string(),
            "details": request.payload.details.clone(),
        });

        match &request.payload.change {
            StructureChange::CreateUnit {
                parent_id,
                relation_type,
                effective_from,
            } => {
                let unit = self.unit_repo.get_by_id(unit_id).await?;
                expect_status(&unit, OrgUnitStatus::Draft)?;
                self.plan_placement(
                    unit_id,
                    &unit.name,
                    *parent_id,
                    *relation_type,
                    effective_from.unwrap_or(now),
                    Some(changed_by),
                    details,
                )
                .await
            }
            StructureChange::RenameUnit { new_name } => {
                self.plan_rename(unit_id, new_name, Some(changed_by), details)
                    .await
            }
            StructureChange::MoveUnit {
                new_parent_id,
                relation_type,
                effective_from,
            } => {
                self.plan_move(
                    MoveUnit {
                        unit_id,
                        new_parent_id: *new_parent_id,
                        relation_type: *relation_type,
                        effective_from: *effective_from,
                        note: None,
                    },
                    Some(changed_by),
                    details,
                )
                .await
            }
            StructureChange::ArchiveUnit {
                effective_from,
                reason,
            } => {
                self.plan_archive(
                    unit_id,
                    effective_from.unwrap_or(now),
                    reason.clone(),
                    Some(changed_by),
                    details,
                )
                .await
            }
        }
    }

    /// Activate `unit_id` and attach it under `parent_id`.
    #[allow(clippy::too_many_arguments)]
    async fn plan_placement(
        &self,
        unit_id: Uuid,
        name: &str,
        parent_id: Option<Uuid>,
        relation_type: RelationType,
        effective_from: DateTime<Utc>,
        changed_by: Option<Uuid>,
        details: serde_json::Value,
    ) -> UniHrResult<StructuralCommit> {
        ensure_not_future(effective_from)?;
        let expected_revision = self.hierarchy_repo.revision().await?;

        let insert_relation = match parent_id {
            Some(parent_id) => {
                self.check_new_edge(unit_id, parent_id, effective_from).await?;
                Some(NewRelation {
                    id: Uuid::new_v4(),
                    parent_id,
                    child_id: unit_id,
                    relation_type,
                    effective_from,
                    note: None,
                })
            }
            None => None,
        };

        Ok(StructuralCommit {
            unit_id,
            create_unit: None,
            expected_revision,
            effective_at: effective_from,
            close_relation: None,
            insert_relation,
            new_status: Some(OrgUnitStatus::Active),
            new_name: None,
            parent_projection: Some(parent_id),
            history: NewOrgUnitHistory {
                org_unit_id: unit_id,
                change_type: ChangeType::Created,
                old_name: None,
                new_name: Some(name.to_string()),
                details: merge_details(
                    details,
                    json!({
                        "parent_id": parent_id.map(|id| id.to_string()),
                        "relation_type": relation_type.as_str(),
                        "effective_from": effective_from,
                    }),
                ),
                changed_by,
            },
        })
    }

    async fn plan_rename(
        &self,
        unit_id: Uuid,
        new_name: &str,
        changed_by: Option<Uuid>,
        details: serde_json::Value,
    ) -> UniHrResult<StructuralCommit> {
        validate_name(new_name)?;
        let new_name = new_name.trim().to_string();

        let expected_revision = self.hierarchy_repo.revision().await?;
        let unit = self.unit_repo.get_by_id(unit_id).await?;
        expect_status(&unit, OrgUnitStatus::Active)?;
        if unit.name == new_name {
            return Err(UniHrError::validation(format!(
                "org unit {unit_id} is already named {new_name:?}"
            )));
        }

        Ok(StructuralCommit {
            unit_id,
            create_unit: None,
            expected_revision,
            effective_at: Utc::now(),
            close_relation: None,
            insert_relation: None,
            new_status: None,
            new_name: Some(new_name.clone()),
            parent_projection: None,
            history: NewOrgUnitHistory {
                org_unit_id: unit_id,
                change_type: ChangeType::Renamed,
                old_name: Some(unit.name),
                new_name: Some(new_name),
                details,
                changed_by,
            },
        })
    }

    async fn plan_move(
        &self,
        input: MoveUnit,
        changed_by: Option<Uuid>,
        details: serde_json::Value,
    ) -> UniHrResult<StructuralCommit> {
        let unit_id = input.unit_id;
        ensure_not_future(input.effective_from)?;

        let expected_revision = self.hierarchy_repo.revision().await?;
        let unit = self.unit_repo.get_by_id(unit_id).await?;
        expect_status(&unit, OrgUnitStatus::Active)?;

        let relations = self.hierarchy_repo.list_for_child(unit_id).await?;
        let old_parent = relations
            .iter()
            .find(|r| r.is_open())
            .map(|r| r.parent_id);
        if old_parent == input.new_parent_id {
            return Err(UniHrError::validation(format!(
                "org unit {unit_id} is already placed there"
            )));
        }

        if let Some(parent_id) = input.new_parent_id {
            self.check_new_edge(unit_id, parent_id, input.effective_from)
                .await?;
        }
        let close_relation = plan_relation_change(unit_id, &relations, input.effective_from)?;

        let insert_relation = input.new_parent_id.map(|parent_id| NewRelation {
            id: Uuid::new_v4(),
            parent_id,
            child_id: unit_id,
            relation_type: input.relation_type,
            effective_from: input.effective_from,
            note: input.note.clone(),
        });

        Ok(StructuralCommit {
            unit_id,
            create_unit: None,
            expected_revision,
            effective_at: input.effective_from,
            close_relation,
            insert_relation,
            new_status: None,
            new_name: None,
            parent_projection: Some(input.new_parent_id),
            history: NewOrgUnitHistory {
                org_unit_id: unit_id,
                change_type: ChangeType::Moved,
                old_name: None,
                new_name: None,
                details: merge_details(
                    details,
                    json!({
                        "from_parent_id": old_parent.map(|id| id.to_string()),
                        "to_parent_id": input.new_parent_id.map(|id| id.to_string()),
                        "relation_type": input.relation_type.as_str(),
                        "effective_from": input.effective_from,
                        "note": input.note,
                    }),
                ),
                changed_by,
            },
        })
    }

    async fn plan_archive(
        &self,
        unit_id: Uuid,
        effective_from: DateTime<Utc>,
        reason: Option<String>,
        changed_by: Option<Uuid>,
        details: serde_json::Value,
    ) -> UniHrResult<StructuralCommit> {
        ensure_not_future(effective_from)?;

        let expected_revision = self.hierarchy_repo.revision().await?;
        let unit = self.unit_repo.get_by_id(unit_id).await?;
        expect_status(&unit, OrgUnitStatus::Active)?;

        let snapshot = self.snapshot(Utc::now()).await?;
        let children = snapshot.children(unit_id);
        if !children.is_empty() {
            warn!(org_unit_id = %unit_id, children = children.len(), "Archive blocked");
            return Err(GovernanceError::ActiveChildren {
                id: unit_id,
                count: children.len(),
            }
            .into());
        }

        let relations = self.hierarchy_repo.list_for_child(unit_id).await?;
        let close_relation = plan_relation_change(unit_id, &relations, effective_from)?;
        let old_parent = relations
            .iter()
            .find(|r| r.is_open())
            .map(|r| r.parent_id);

        Ok(StructuralCommit {
            unit_id,
            create_unit: None,
            expected_revision,
            effective_at: effective_from,
            close_relation,
            insert_relation: None,
            new_status: Some(OrgUnitStatus::Archived),
            new_name: None,
            parent_projection: Some(None),
            history: NewOrgUnitHistory {
                org_unit_id: unit_id,
                change_type: ChangeType::Archived,
                old_name: None,
                new_name: None,
                details: merge_details(
                    details,
                    json!({
                        "from_parent_id": old_parent.map(|id| id.to_string()),
                        "effective_from": effective_from,
                        "reason": reason,
                    }),
                ),
                changed_by,
            },
        })
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    /// Validate a new `parent_id -> unit_id` edge: the parent must be an
    /// active unit, the edge must not close a loop and the resulting depth
    /// must stay within bounds.
    async fn check_new_edge(
        &self,
        unit_id: Uuid,
        parent_id: Uuid,
        effective_from: DateTime<Utc>,
    ) -> UniHrResult<()> {
        let parent = self.unit_repo.get_by_id(parent_id).await?;
        expect_status(&parent, OrgUnitStatus::Active)?;

        if self
            .would_create_cycle(parent_id, unit_id, effective_from)
            .await?
        {
            warn!(%parent_id, child_id = %unit_id, "Rejected edge: cycle");
            return Err(UniHrError::CycleDetected {
                parent_id: parent_id.to_string(),
                child_id: unit_id.to_string(),
            });
        }

        let snapshot = self.snapshot(Utc::now()).await?;
        let depth = snapshot.depth(parent_id)? + 1;
        let subtree_height = subtree_height(&snapshot, unit_id);
        if depth + subtree_height > self.config.max_hierarchy_depth {
            return Err(GovernanceError::DepthExceeded {
                id: unit_id,
                parent_id,
                max: self.config.max_hierarchy_depth,
            }
            .into());
        }

        Ok(())
    }

    pub(crate) async fn ensure_code_free(&self, code: &str) -> UniHrResult<()> {
        match self.unit_repo.get_by_code(code).await {
            Ok(_) => Err(UniHrError::AlreadyExists {
                entity: "org_unit".into(),
                key: format!("code={code}"),
            }),
            Err(UniHrError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub(crate) async fn get_unit(&self, id: Uuid) -> UniHrResult<OrgUnit> {
        self.unit_repo.get_by_id(id).await
    }
}

pub(crate) fn expect_status(unit: &OrgUnit, expected: OrgUnitStatus) -> UniHrResult<()> {
    if unit.status != expected {
        return Err(GovernanceError::UnitStatus {
            id: unit.id,
            status: unit.status,
            expected,
        }
        .into());
    }
    Ok(())
}

pub(crate) fn ensure_not_future(effective_from: DateTime<Utc>) -> UniHrResult<()> {
    if effective_from > Utc::now() {
        return Err(GovernanceError::FutureEffectiveDate.into());
    }
    Ok(())
}

/// Levels below `unit_id` (0 for a leaf). Bounded by the snapshot size.
fn subtree_height(snapshot: &HierarchySnapshot, unit_id: Uuid) -> usize {
    let mut height = 0;
    let mut level = vec![unit_id];
    let mut seen = BTreeSet::from([unit_id]);
    loop {
        let next: Vec<Uuid> = level
            .iter()
            .flat_map(|id| snapshot.children(*id).iter().copied())
            .filter(|id| seen.insert(*id))
            .collect();
        if next.is_empty() {
            return height;
        }
        height += 1;
        level = next;
    }
}

/// Add `extra` keys to the caller-supplied details object.
fn merge_details(details: serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    match (details, extra) {
        (serde_json::Value::Object(mut base), serde_json::Value::Object(extra)) => {
            base.extend(extra);
            serde_json::Value::Object(base)
        }
        (_, extra) => extra,
    }
}

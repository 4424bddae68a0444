//! Authorization scope resolution.
//!
//! Scope is recomputed on every call from the actor's grants, their
//! active org assignments and the hierarchy in effect now. Nothing is
//! cached, and every path that cannot prove access fails closed.

use std::collections::BTreeSet;

use chrono::Utc;
use tracing::{debug, warn};
use unihr_core::error::UniHrResult;
use unihr_core::hierarchy::HierarchySnapshot;
use unihr_core::models::actor::Actor;
use unihr_core::models::assignment::OrgAssignment;
use unihr_core::repository::{HierarchyRepository, OrgAssignmentRepository};
use unihr_core::scope::{ScopeResult, has_org_wide_grant};
use uuid::Uuid;

use crate::config::GovernanceConfig;
use crate::error::GovernanceError;

/// Resolves what an actor may read or act upon for one permission.
pub struct ScopeResolver<H: HierarchyRepository, A: OrgAssignmentRepository> {
    hierarchy_repo: H,
    assignment_repo: A,
    config: GovernanceConfig,
}

impl<H: HierarchyRepository, A: OrgAssignmentRepository> ScopeResolver<H, A> {
    pub fn new(hierarchy_repo: H, assignment_repo: A, config: GovernanceConfig) -> Self {
        Self {
            hierarchy_repo,
            assignment_repo,
            config,
        }
    }

    /// Current scope revision. Read it before resolving a scope and hand
    /// it to the write the scope gates, so that a concurrent assignment or
    /// relation change fails that write instead of slipping past it.
    pub async fn revision(&self) -> UniHrResult<u64> {
        self.assignment_repo.scope_revision().await
    }

    /// Resolve the scope of `permission` for `actor`.
    ///
    /// 1. A blanket grant or `<permission>:all` gives [`ScopeResult::All`].
    /// 2. Not holding `permission` at all is denied.
    /// 3. Active assignments seed an [`ScopeResult::OrgSubtree`].
    /// 4. Otherwise the actor only sees their own records.
    pub async fn scope_for(&self, actor: &Actor, permission: &str) -> UniHrResult<ScopeResult> {
        if has_org_wide_grant(actor, permission, &self.config.blanket_permissions) {
            debug!(actor_id = %actor.id, permission, "Organization-wide scope");
            return Ok(ScopeResult::All);
        }

        if !actor.has_permission(permission) {
            warn!(actor_id = %actor.id, permission, "Permission not granted");
            return Err(GovernanceError::MissingPermission {
                permission: permission.into(),
            }
            .into());
        }

        let now = Utc::now();
        let assignments = self
            .assignment_repo
            .list_active_for_employee(actor.id, now)
            .await?;

        let roots: BTreeSet<Uuid> = assignments
            .iter()
            .filter(|a| a.is_primary || !self.config.scope_from_primary_only)
            .map(|a| a.org_unit_id)
            .collect();

        if roots.is_empty() {
            debug!(actor_id = %actor.id, permission, "Self-only scope");
            return Ok(ScopeResult::SelfOnly { actor_id: actor.id });
        }

        let relations = self.hierarchy_repo.list_active_at(now).await?;
        let snapshot = HierarchySnapshot::build(now, &relations)?;
        let units = snapshot.descendants(roots.iter().copied())?;

        debug!(
            actor_id = %actor.id,
            permission,
            roots = roots.len(),
            units = units.len(),
            "Org subtree scope"
        );
        Ok(ScopeResult::OrgSubtree { roots, units })
    }

    /// Check that `actor` may exercise `permission` on an entity owned by
    /// `owner_org_id` and belonging to `subject_owner_id`.
    pub async fn authorize(
        &self,
        actor: &Actor,
        permission: &str,
        owner_org_id: Uuid,
        subject_owner_id: Uuid,
    ) -> UniHrResult<ScopeResult> {
        let scope = self.scope_for(actor, permission).await?;

        if !scope.permits(owner_org_id, subject_owner_id) {
            warn!(
                actor_id = %actor.id,
                permission,
                %owner_org_id,
                "Target outside actor scope"
            );
            return Err(GovernanceError::OutOfScope {
                permission: permission.into(),
                org_unit_id: owner_org_id,
            }
            .into());
        }

        Ok(scope)
    }

    /// Check that `org_unit_id` itself lies inside the scope of
    /// `permission`. Unlike [`ScopeResolver::authorize`], a self-only scope
    /// never passes.
    pub async fn authorize_org_unit(
        &self,
        actor: &Actor,
        permission: &str,
        org_unit_id: Uuid,
    ) -> UniHrResult<ScopeResult> {
        let scope = self.scope_for(actor, permission).await?;
        ensure_org_unit_in_scope(actor, permission, &scope, org_unit_id)?;
        Ok(scope)
    }

    /// Active assignments visible to `actor` under `permission`.
    pub async fn visible_employees(
        &self,
        actor: &Actor,
        permission: &str,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        let now = Utc::now();
        match self.scope_for(actor, permission).await? {
            ScopeResult::All => self.assignment_repo.list_active(now).await,
            ScopeResult::OrgSubtree { units, .. } => {
                self.assignment_repo
                    .list_active_in_units(units.into_iter().collect(), now)
                    .await
            }
            ScopeResult::SelfOnly { actor_id } => {
                self.assignment_repo
                    .list_active_for_employee(actor_id, now)
                    .await
            }
        }
    }
}

/// Fail with `OutOfScope` unless `scope` covers `org_unit_id`.
pub(crate) fn ensure_org_unit_in_scope(
    actor: &Actor,
    permission: &str,
    scope: &ScopeResult,
    org_unit_id: Uuid,
) -> UniHrResult<()> {
    if scope.permits_org_unit(org_unit_id) {
        return Ok(());
    }
    warn!(
        actor_id = %actor.id,
        permission,
        %org_unit_id,
        "Org unit outside actor scope"
    );
    Err(GovernanceError::OutOfScope {
        permission: permission.into(),
        org_unit_id,
    }
    .into())
}

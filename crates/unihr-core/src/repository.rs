//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Every mutating operation that
//! touches more than one record is applied by the store as a single
//! transaction.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::UniHrResult;
use crate::hierarchy::StructuralCommit;
use crate::models::{
    assignment::{CreateOrgAssignment, OrgAssignment},
    history::OrgUnitHistory,
    org_unit::OrgUnit,
    relation::OrgUnitRelation,
    structure_request::{NewStructureRequest, OrgStructureRequest},
    workflow::{
        CreateWorkflowItem, NewApprovalHistory, WorkflowApprovalHistory, WorkflowItem,
        WorkflowSnapshot, WorkflowState, WorkflowTarget,
    },
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Org hierarchy
// ---------------------------------------------------------------------------

pub trait OrgUnitRepository: Send + Sync {
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = UniHrResult<OrgUnit>> + Send;
    fn get_by_code(&self, code: &str) -> impl Future<Output = UniHrResult<OrgUnit>> + Send;
    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = UniHrResult<PaginatedResult<OrgUnit>>> + Send;
    fn list_all(&self) -> impl Future<Output = UniHrResult<Vec<OrgUnit>>> + Send;
    /// Change log of one unit, oldest first.
    fn history(
        &self,
        org_unit_id: Uuid,
    ) -> impl Future<Output = UniHrResult<Vec<OrgUnitHistory>>> + Send;
}

/// Effective-dated relations plus the atomic structural write path.
///
/// Relations are never written individually: every change goes through
/// [`HierarchyRepository::commit_structural_change`] (or the structural
/// part of a [`TransitionCommit`]).
pub trait HierarchyRepository: Send + Sync {
    fn list_all(&self) -> impl Future<Output = UniHrResult<Vec<OrgUnitRelation>>> + Send;
    /// Relations whose interval contains `at`.
    fn list_active_at(
        &self,
        at: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<Vec<OrgUnitRelation>>> + Send;
    /// Relations still in effect at or after `from`.
    fn list_effective_since(
        &self,
        from: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<Vec<OrgUnitRelation>>> + Send;
    fn list_for_child(
        &self,
        child_id: Uuid,
    ) -> impl Future<Output = UniHrResult<Vec<OrgUnitRelation>>> + Send;
    /// Current hierarchy revision. Bumped by every structural commit.
    fn revision(&self) -> impl Future<Output = UniHrResult<u64>> + Send;
    /// Apply a planned change atomically. Fails with `Conflict` when the
    /// revision moved since the plan was made.
    fn commit_structural_change(
        &self,
        commit: StructuralCommit,
    ) -> impl Future<Output = UniHrResult<OrgUnit>> + Send;
}

pub trait OrgStructureRepository: Send + Sync {
    /// Insert the request, its draft unit and its first history record
    /// (when present) in one transaction.
    fn create(
        &self,
        input: NewStructureRequest,
    ) -> impl Future<Output = UniHrResult<OrgStructureRequest>> + Send;
    fn get_by_id(&self, id: Uuid)
    -> impl Future<Output = UniHrResult<OrgStructureRequest>> + Send;
    fn list_by_owner(
        &self,
        owner_org_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = UniHrResult<PaginatedResult<OrgStructureRequest>>> + Send;
}

// ---------------------------------------------------------------------------
// Approval workflow
// ---------------------------------------------------------------------------

/// One accepted transition, ready to be written.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    pub target: WorkflowTarget,
    /// Version read before the transition was computed.
    pub expected_version: u64,
    /// Scope revision read before the actor's scope was resolved.
    pub expected_scope_revision: u64,
    pub to: WorkflowState,
    pub current_reviewer_id: Option<Uuid>,
    pub history: NewApprovalHistory,
    /// Structural side effect committed in the same transaction.
    pub structural: Option<StructuralCommit>,
}

pub trait WorkflowRepository: Send + Sync {
    fn create_item(
        &self,
        input: CreateWorkflowItem,
    ) -> impl Future<Output = UniHrResult<WorkflowItem>> + Send;
    fn get_item(&self, id: Uuid) -> impl Future<Output = UniHrResult<WorkflowItem>> + Send;
    fn load_snapshot(
        &self,
        target: WorkflowTarget,
    ) -> impl Future<Output = UniHrResult<WorkflowSnapshot>> + Send;
    /// Write the transition. Fails with `Conflict` if the target's version
    /// is no longer `expected_version` or the scope revision is no longer
    /// `expected_scope_revision`.
    fn commit(
        &self,
        commit: TransitionCommit,
    ) -> impl Future<Output = UniHrResult<WorkflowSnapshot>> + Send;
    /// Approval history of one target, ordered by sequence.
    fn history(
        &self,
        target: WorkflowTarget,
    ) -> impl Future<Output = UniHrResult<Vec<WorkflowApprovalHistory>>> + Send;
}

// ---------------------------------------------------------------------------
// Org assignments
// ---------------------------------------------------------------------------

pub trait OrgAssignmentRepository: Send + Sync {
    fn create(
        &self,
        input: CreateOrgAssignment,
    ) -> impl Future<Output = UniHrResult<OrgAssignment>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = UniHrResult<OrgAssignment>> + Send;
    /// Soft-delete: sets `end_date`.
    fn end(
        &self,
        id: Uuid,
        end_date: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<OrgAssignment>> + Send;
    fn list_for_employee(
        &self,
        employee_id: Uuid,
    ) -> impl Future<Output = UniHrResult<Vec<OrgAssignment>>> + Send;
    /// Every assignment in force at `at`.
    fn list_active(
        &self,
        at: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<Vec<OrgAssignment>>> + Send;
    fn list_active_for_employee(
        &self,
        employee_id: Uuid,
        at: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<Vec<OrgAssignment>>> + Send;
    fn list_active_in_units(
        &self,
        org_unit_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> impl Future<Output = UniHrResult<Vec<OrgAssignment>>> + Send;
    /// Current scope revision. Bumped by every assignment write and every
    /// change to the org unit relations.
    fn scope_revision(&self) -> impl Future<Output = UniHrResult<u64>> + Send;
}

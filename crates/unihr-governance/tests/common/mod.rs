//! Shared fixture: every governance service wired to one in-memory
//! SurrealDB instance.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use unihr_core::models::actor::Actor;
use unihr_core::models::assignment::{AssignmentType, CreateOrgAssignment};
use unihr_core::models::org_unit::{OrgUnit, OrgUnitType};
use unihr_core::models::relation::RelationType;
use unihr_db::repository::{
    SurrealHierarchyRepository, SurrealOrgAssignmentRepository, SurrealOrgStructureRepository,
    SurrealOrgUnitRepository, SurrealWorkflowRepository,
};
use unihr_governance::{
    AssignmentService, GovernanceConfig, HierarchyService, OrgStructureService, RegisterUnit,
    ScopeResolver, WorkflowEngine,
};
use uuid::Uuid;

pub type Units = SurrealOrgUnitRepository<Db>;
pub type Relations = SurrealHierarchyRepository<Db>;
pub type Assignments = SurrealOrgAssignmentRepository<Db>;
pub type Requests = SurrealOrgStructureRepository<Db>;
pub type Workflows = SurrealWorkflowRepository<Db>;

pub struct Harness {
    pub db: Surreal<Db>,
    pub units: Units,
    pub relations: Relations,
    pub hierarchy: HierarchyService<Units, Relations>,
    pub scope: ScopeResolver<Relations, Assignments>,
    pub assignments: AssignmentService<Assignments, Units>,
    pub org: OrgStructureService<Requests, Units, Relations, Assignments>,
    pub workflow: WorkflowEngine<Workflows, Requests, Units, Relations, Assignments>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_config(GovernanceConfig::default()).await
    }

    pub async fn with_config(config: GovernanceConfig) -> Self {
        let db = Surreal::new::<Mem>(()).await.unwrap();
        db.use_ns("test").use_db("test").await.unwrap();
        unihr_db::run_migrations(&db).await.unwrap();

        let units = SurrealOrgUnitRepository::new(db.clone());
        let relations = SurrealHierarchyRepository::new(db.clone());
        let assignment_repo = SurrealOrgAssignmentRepository::new(db.clone());
        let requests = SurrealOrgStructureRepository::new(db.clone());
        let workflows = SurrealWorkflowRepository::new(db.clone());

        let hierarchy =
            || HierarchyService::new(units.clone(), relations.clone(), config.clone());
        let scope = || ScopeResolver::new(relations.clone(), assignment_repo.clone(), config.clone());

        Self {
            db: db.clone(),
            hierarchy: hierarchy(),
            scope: scope(),
            assignments: AssignmentService::new(assignment_repo.clone(), units.clone()),
            org: OrgStructureService::new(requests.clone(), hierarchy(), scope()),
            workflow: WorkflowEngine::new(workflows, requests, hierarchy(), scope()),
            units,
            relations,
        }
    }

    /// Register an active unit effective ten days ago.
    pub async fn unit(&self, code: &str, parent_id: Option<Uuid>) -> OrgUnit {
        self.unit_at(code, parent_id, days_ago(10)).await
    }

    pub async fn unit_at(
        &self,
        code: &str,
        parent_id: Option<Uuid>,
        effective_from: DateTime<Utc>,
    ) -> OrgUnit {
        self.hierarchy
            .register_unit(
                RegisterUnit {
                    code: code.into(),
                    name: format!("Unit {code}"),
                    unit_type: OrgUnitType::Department,
                    description: None,
                    metadata: None,
                    parent_id,
                    relation_type: RelationType::Administrative,
                    effective_from,
                },
                None,
            )
            .await
            .unwrap()
    }

    /// Assign `employee_id` to `org_unit_id` starting yesterday.
    pub async fn assign(&self, employee_id: Uuid, org_unit_id: Uuid, is_primary: bool) {
        self.assignments
            .assign(CreateOrgAssignment {
                employee_id,
                org_unit_id,
                position_id: None,
                assignment_type: AssignmentType::Permanent,
                is_primary,
                allocation_percent: 100,
                start_date: days_ago(1),
            })
            .await
            .unwrap();
    }
}

pub fn days_ago(days: i64) -> DateTime<Utc> {
    Utc::now() - Duration::days(days)
}

pub fn admin() -> Actor {
    Actor::new(Uuid::new_v4(), ["system.admin"])
}

pub fn actor(permissions: &[&str]) -> Actor {
    Actor::new(Uuid::new_v4(), permissions.iter().copied())
}

//! Integration tests for the approval workflow engine and org structure
//! requests.

mod common;

use chrono::{DateTime, Utc};
use common::{Assignments, Harness, actor, admin};
use unihr_core::error::{UniHrError, UniHrResult};
use unihr_core::models::actor::Actor;
use unihr_core::models::assignment::{CreateOrgAssignment, OrgAssignment};
use unihr_core::models::history::ChangeType;
use unihr_core::models::org_unit::{OrgUnitStatus, OrgUnitType};
use unihr_core::models::relation::RelationType;
use unihr_core::models::workflow::WorkflowStage::{AcademicBoard, AcademicOffice, Faculty};
use unihr_core::models::workflow::WorkflowStatus::{
    Approved, Draft, Published, Rejected, Reviewing, Submitted,
};
use unihr_core::models::workflow::{
    CreateWorkflowItem, WorkflowAction, WorkflowPriority, WorkflowState, WorkflowSubject,
    WorkflowTarget,
};
use unihr_core::repository::{OrgAssignmentRepository, OrgUnitRepository};
use unihr_db::repository::{
    SurrealOrgAssignmentRepository, SurrealOrgStructureRepository, SurrealWorkflowRepository,
};
use unihr_governance::{
    ApplyAction, CreateOrgUnit, GovernanceConfig, HierarchyService, ProposeMove, ScopeResolver,
    WorkflowEngine,
};
use uuid::Uuid;

fn action(
    target: WorkflowTarget,
    action: WorkflowAction,
    actor: &Actor,
    expected: WorkflowState,
) -> ApplyAction {
    ApplyAction {
        target,
        action,
        actor: actor.clone(),
        comment: None,
        expected,
    }
}

fn staged(
    stage: unihr_core::models::workflow::WorkflowStage,
    status: unihr_core::models::workflow::WorkflowStatus,
) -> WorkflowState {
    WorkflowState::staged(stage, status)
}

/// Course reviewers assigned at `org_unit_id`.
struct Reviewers {
    lecturer: Actor,
    office: Actor,
    board: Actor,
    publisher: Actor,
}

async fn reviewers(h: &Harness, org_unit_id: Uuid) -> Reviewers {
    let r = Reviewers {
        lecturer: actor(&["course.submit"]),
        office: actor(&["course.review.academic_office"]),
        board: actor(&["course.review.academic_board"]),
        publisher: actor(&["course.publish"]),
    };
    for a in [&r.lecturer, &r.office, &r.board, &r.publisher] {
        h.assign(a.id, org_unit_id, true).await;
    }
    r
}

async fn course(h: &Harness, owner_org_id: Uuid, requester: &Actor) -> WorkflowTarget {
    let item = h
        .workflow
        .create_item(
            CreateWorkflowItem {
                subject: WorkflowSubject::Course,
                subject_id: Uuid::new_v4(),
                title: "Pharmacology I".into(),
                owner_org_id,
                requester_id: requester.id,
                priority: WorkflowPriority::Normal,
                notes: None,
            },
            requester,
        )
        .await
        .unwrap();
    assert_eq!(item.stage, Faculty);
    assert_eq!(item.status, Draft);
    WorkflowTarget::Item(item.id)
}

#[tokio::test]
async fn scenario_a_org_unit_created_through_approval() {
    let h = Harness::new().await;
    let school = h.unit("TRUONG_Y_DUOC", None).await;
    let officer = actor(&["org_structure.submit", "org_structure.approve"]);
    h.assign(officer.id, school.id, true).await;

    let proposed = h
        .org
        .create_org_unit(
            CreateOrgUnit {
                code: "KHOA_DUOC".into(),
                name: "Khoa Dược".into(),
                unit_type: OrgUnitType::Faculty,
                parent_id: Some(school.id),
                relation_type: RelationType::Academic,
                effective_from: None,
                owner_org_id: school.id,
                description: None,
                metadata: None,
                details: Some(serde_json::json!({ "decision": "QD-2024-17" })),
                submit: false,
            },
            &officer,
        )
        .await
        .unwrap();
    assert_eq!(proposed.unit.status, OrgUnitStatus::Draft);
    assert_eq!(proposed.unit.parent_id, None);
    assert_eq!(proposed.request.status, Draft);

    let target = WorkflowTarget::StructureRequest(proposed.request.id);
    let submitted = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Submit,
            &officer,
            WorkflowState::unstaged(Draft),
        ))
        .await
        .unwrap();
    assert_eq!(submitted.state, WorkflowState::unstaged(Submitted));
    assert_eq!(
        h.units.get_by_id(proposed.unit.id).await.unwrap().status,
        OrgUnitStatus::Draft
    );

    let approved = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &officer,
            WorkflowState::unstaged(Submitted),
        ))
        .await
        .unwrap();
    assert_eq!(approved.state, WorkflowState::unstaged(Approved));

    let unit = h.units.get_by_id(proposed.unit.id).await.unwrap();
    assert_eq!(unit.status, OrgUnitStatus::Active);
    assert_eq!(unit.parent_id, Some(school.id));

    let history = h.units.history(unit.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::Created);
    assert_eq!(history[0].changed_by, Some(officer.id));

    let request = h.org.get_request(proposed.request.id).await.unwrap();
    assert_eq!(request.status, Approved);
    assert_eq!(request.workflow_step, 2);
    h.workflow.verify_chain(target).await.unwrap();
}

#[tokio::test]
async fn submitted_request_writes_first_history_record() {
    let h = Harness::new().await;
    let school = h.unit("SCHOOL", None).await;
    let lead = admin();

    let proposed = h
        .org
        .create_org_unit(
            CreateOrgUnit {
                code: "LAB_X".into(),
                name: "Lab X".into(),
                unit_type: OrgUnitType::Center,
                parent_id: Some(school.id),
                relation_type: RelationType::Administrative,
                effective_from: None,
                owner_org_id: school.id,
                description: Some("research lab".into()),
                metadata: None,
                details: None,
                submit: true,
            },
            &lead,
        )
        .await
        .unwrap();
    assert_eq!(proposed.request.status, Submitted);

    let target = WorkflowTarget::StructureRequest(proposed.request.id);
    let history = h.workflow.history(target).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, WorkflowAction::Submit);
    assert_eq!(history[0].sequence, 1);
    h.workflow.verify_chain(target).await.unwrap();
}

#[tokio::test]
async fn rejected_request_leaves_unit_in_draft() {
    let h = Harness::new().await;
    let school = h.unit("SCHOOL", None).await;
    let lead = admin();

    let proposed = h
        .org
        .create_org_unit(
            CreateOrgUnit {
                code: "DRAFTY".into(),
                name: "Drafty".into(),
                unit_type: OrgUnitType::Office,
                parent_id: Some(school.id),
                relation_type: RelationType::Administrative,
                effective_from: None,
                owner_org_id: school.id,
                description: None,
                metadata: None,
                details: None,
                submit: true,
            },
            &lead,
        )
        .await
        .unwrap();

    let target = WorkflowTarget::StructureRequest(proposed.request.id);
    let rejected = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Reject,
            &lead,
            WorkflowState::unstaged(Submitted),
        ))
        .await
        .unwrap();
    assert_eq!(rejected.state, WorkflowState::unstaged(Rejected));

    let unit = h.units.get_by_id(proposed.unit.id).await.unwrap();
    assert_eq!(unit.status, OrgUnitStatus::Draft);
    assert!(h.units.history(unit.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn approved_archive_request_archives_unit() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let old = h.unit("OLD", Some(uni.id)).await;
    let lead = admin();

    let request = h
        .org
        .propose_archive(old.id, None, Some("merged".into()), &lead)
        .await
        .unwrap();
    assert_eq!(request.owner_org_id, old.id);

    let target = WorkflowTarget::StructureRequest(request.id);
    h.workflow
        .apply(action(
            target,
            WorkflowAction::Submit,
            &lead,
            WorkflowState::unstaged(Draft),
        ))
        .await
        .unwrap();
    h.workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &lead,
            WorkflowState::unstaged(Submitted),
        ))
        .await
        .unwrap();

    let unit = h.units.get_by_id(old.id).await.unwrap();
    assert_eq!(unit.status, OrgUnitStatus::Archived);
    assert_eq!(unit.parent_id, None);
    let tree = h
        .hierarchy
        .tree(&[uni.id], Utc::now())
        .await
        .unwrap();
    assert!(tree[0].children.is_empty());
}

#[tokio::test]
async fn archive_with_active_children_is_not_approved() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;
    h.unit("PHARM", Some(med.id)).await;
    let lead = admin();

    let request = h.org.propose_archive(med.id, None, None, &lead).await.unwrap();
    let target = WorkflowTarget::StructureRequest(request.id);
    h.workflow
        .apply(action(
            target,
            WorkflowAction::Submit,
            &lead,
            WorkflowState::unstaged(Draft),
        ))
        .await
        .unwrap();

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &lead,
            WorkflowState::unstaged(Submitted),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::Validation { .. }));

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.state, WorkflowState::unstaged(Submitted));
    assert_eq!(
        h.units.get_by_id(med.id).await.unwrap().status,
        OrgUnitStatus::Active
    );
}

#[tokio::test]
async fn proposed_move_into_own_subtree_is_rejected() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;
    let pharm = h.unit("PHARM", Some(med.id)).await;

    let err = h
        .org
        .propose_move(
            ProposeMove {
                unit_id: med.id,
                new_parent_id: Some(pharm.id),
                relation_type: RelationType::Administrative,
                effective_from: common::days_ago(1),
                details: None,
            },
            &admin(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::CycleDetected { .. }));
}

#[tokio::test]
async fn scenario_b_course_publication() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let pharmacy = h.unit("KHOA_DUOC", Some(uni.id)).await;
    let r = reviewers(&h, uni.id).await;
    let target = course(&h, pharmacy.id, &r.lecturer).await;

    let steps = [
        (WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft), staged(AcademicOffice, Submitted)),
        (WorkflowAction::Approve, &r.office, staged(AcademicOffice, Submitted), staged(AcademicBoard, Submitted)),
        (WorkflowAction::Approve, &r.board, staged(AcademicBoard, Submitted), staged(AcademicBoard, Approved)),
        (WorkflowAction::Publish, &r.publisher, staged(AcademicBoard, Approved), staged(AcademicBoard, Published)),
    ];
    for (act, who, from, to) in steps {
        let snapshot = h.workflow.apply(action(target, act, who, from)).await.unwrap();
        assert_eq!(snapshot.state, to);
    }

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &r.board,
            staged(AcademicBoard, Published),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::InvalidTransition { .. }));

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.state, staged(AcademicBoard, Published));
    assert_eq!(snapshot.version, 4);

    let history = h.workflow.history(target).await.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[1].reviewer_id, r.office.id);
    assert_eq!(history[1].reviewer_role, "course.review.academic_office");
    h.workflow.verify_chain(target).await.unwrap();
}

#[tokio::test]
async fn return_and_resubmit() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let r = reviewers(&h, uni.id).await;
    let target = course(&h, uni.id, &r.lecturer).await;

    h.workflow
        .apply(action(target, WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft)))
        .await
        .unwrap();
    let reviewing = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::StartReview,
            &r.office,
            staged(AcademicOffice, Submitted),
        ))
        .await
        .unwrap();
    assert_eq!(reviewing.state, staged(AcademicOffice, Reviewing));
    assert_eq!(reviewing.current_reviewer_id, Some(r.office.id));

    let returned = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Return,
            &r.office,
            staged(AcademicOffice, Reviewing),
        ))
        .await
        .unwrap();
    assert_eq!(returned.state, staged(Faculty, Reviewing));
    assert_eq!(returned.current_reviewer_id, None);

    let resubmitted = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Submit,
            &r.lecturer,
            staged(Faculty, Reviewing),
        ))
        .await
        .unwrap();
    assert_eq!(resubmitted.state, staged(AcademicOffice, Submitted));
    h.workflow.verify_chain(target).await.unwrap();
}

#[tokio::test]
async fn invalid_transition_writes_nothing() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let r = reviewers(&h, uni.id).await;
    let target = course(&h, uni.id, &r.lecturer).await;

    for _ in 0..2 {
        let err = h
            .workflow
            .apply(action(target, WorkflowAction::Publish, &r.publisher, staged(Faculty, Draft)))
            .await
            .unwrap_err();
        assert!(matches!(err, UniHrError::InvalidTransition { .. }));
    }

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.state, staged(Faculty, Draft));
    assert_eq!(snapshot.version, 0);
    assert!(h.workflow.history(target).await.unwrap().is_empty());
}

#[tokio::test]
async fn stale_expected_state_is_a_conflict() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let r = reviewers(&h, uni.id).await;
    let target = course(&h, uni.id, &r.lecturer).await;

    h.workflow
        .apply(action(target, WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft)))
        .await
        .unwrap();

    let err = h
        .workflow
        .apply(action(target, WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft)))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::Conflict { .. }));
    assert_eq!(h.workflow.snapshot(target).await.unwrap().version, 1);
}

#[tokio::test]
async fn scenario_d_concurrent_approvals() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let r = reviewers(&h, uni.id).await;
    let second_office = actor(&["course.review.academic_office"]);
    h.assign(second_office.id, uni.id, true).await;
    let target = course(&h, uni.id, &r.lecturer).await;

    h.workflow
        .apply(action(target, WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft)))
        .await
        .unwrap();

    let seen = staged(AcademicOffice, Submitted);
    let (first, second) = tokio::join!(
        h.workflow
            .apply(action(target, WorkflowAction::Approve, &r.office, seen)),
        h.workflow
            .apply(action(target, WorkflowAction::Approve, &second_office, seen)),
    );

    let results = [first, second];
    let ok: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(UniHrError::Conflict { .. })))
        .count();
    assert_eq!(ok.len(), 1);
    assert_eq!(conflicts, 1);
    assert_eq!(ok[0].state, staged(AcademicBoard, Submitted));

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.version, 2);
    assert_eq!(h.workflow.history(target).await.unwrap().len(), 2);
    h.workflow.verify_chain(target).await.unwrap();
}

#[tokio::test]
async fn reviewer_outside_scope_is_denied() {
    let h = Harness::new().await;
    let faculty = h.unit("FAC_A", None).await;
    let other = h.unit("FAC_B", None).await;
    let lecturer = actor(&["course.submit"]);
    h.assign(lecturer.id, faculty.id, true).await;
    let outsider = actor(&["course.review.academic_office"]);
    h.assign(outsider.id, other.id, true).await;

    let target = course(&h, faculty.id, &lecturer).await;
    h.workflow
        .apply(action(target, WorkflowAction::Submit, &lecturer, staged(Faculty, Draft)))
        .await
        .unwrap();

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &outsider,
            staged(AcademicOffice, Submitted),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &lecturer,
            staged(AcademicOffice, Submitted),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));

    assert_eq!(h.workflow.snapshot(target).await.unwrap().version, 1);
}

#[tokio::test]
async fn self_only_actor_may_only_submit_own_items() {
    let h = Harness::new().await;
    let faculty = h.unit("FAC", None).await;
    let author = actor(&["course.submit", "course.review.academic_office"]);

    let target = course(&h, faculty.id, &author).await;
    h.workflow
        .apply(action(target, WorkflowAction::Submit, &author, staged(Faculty, Draft)))
        .await
        .unwrap();

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &author,
            staged(AcademicOffice, Submitted),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));
}

fn lab_under(code: &str, parent_id: Uuid, owner_org_id: Uuid, submit: bool) -> CreateOrgUnit {
    CreateOrgUnit {
        code: code.into(),
        name: format!("Lab {code}"),
        unit_type: OrgUnitType::Center,
        parent_id: Some(parent_id),
        relation_type: RelationType::Administrative,
        effective_from: None,
        owner_org_id,
        description: None,
        metadata: None,
        details: None,
        submit,
    }
}

#[tokio::test]
async fn proposal_under_parent_outside_scope_is_denied() {
    let h = Harness::new().await;
    let fac_a = h.unit("FAC_A", None).await;
    let fac_b = h.unit("FAC_B", None).await;
    let dept_a = h.unit("DEPT_A", Some(fac_a.id)).await;
    let dean = actor(&["org_structure.submit", "org_structure.approve"]);
    h.assign(dean.id, fac_a.id, true).await;

    let err = h
        .org
        .create_org_unit(lab_under("LAB_B", fac_b.id, fac_a.id, false), &dean)
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));
    assert!(matches!(
        h.units.get_by_code("LAB_B").await,
        Err(UniHrError::NotFound { .. })
    ));

    let err = h
        .org
        .propose_move(
            ProposeMove {
                unit_id: dept_a.id,
                new_parent_id: Some(fac_b.id),
                relation_type: RelationType::Administrative,
                effective_from: common::days_ago(1),
                details: None,
            },
            &dean,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));
}

#[tokio::test]
async fn approval_under_parent_outside_scope_is_denied() {
    let h = Harness::new().await;
    let fac_a = h.unit("FAC_A", None).await;
    let fac_b = h.unit("FAC_B", None).await;
    let dean = actor(&["org_structure.approve"]);
    h.assign(dean.id, fac_a.id, true).await;

    let proposed = h
        .org
        .create_org_unit(lab_under("LAB_B", fac_b.id, fac_a.id, true), &admin())
        .await
        .unwrap();
    let target = WorkflowTarget::StructureRequest(proposed.request.id);

    let err = h
        .workflow
        .apply(action(
            target,
            WorkflowAction::Approve,
            &dean,
            WorkflowState::unstaged(Submitted),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.state, WorkflowState::unstaged(Submitted));
    let unit = h.units.get_by_id(proposed.unit.id).await.unwrap();
    assert_eq!(unit.status, OrgUnitStatus::Draft);
    assert_eq!(unit.parent_id, None);
}

/// Assignment store racing an HR officer: every assignment handed out
/// for an employee is ended right after it is read.
#[derive(Clone)]
struct EndedAfterRead(Assignments);

impl OrgAssignmentRepository for EndedAfterRead {
    async fn create(&self, input: CreateOrgAssignment) -> UniHrResult<OrgAssignment> {
        self.0.create(input).await
    }

    async fn get_by_id(&self, id: Uuid) -> UniHrResult<OrgAssignment> {
        self.0.get_by_id(id).await
    }

    async fn end(&self, id: Uuid, end_date: DateTime<Utc>) -> UniHrResult<OrgAssignment> {
        self.0.end(id, end_date).await
    }

    async fn list_for_employee(&self, employee_id: Uuid) -> UniHrResult<Vec<OrgAssignment>> {
        self.0.list_for_employee(employee_id).await
    }

    async fn list_active(&self, at: DateTime<Utc>) -> UniHrResult<Vec<OrgAssignment>> {
        self.0.list_active(at).await
    }

    async fn list_active_for_employee(
        &self,
        employee_id: Uuid,
        at: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        let active = self.0.list_active_for_employee(employee_id, at).await?;
        for assignment in &active {
            self.0.end(assignment.id, Utc::now()).await?;
        }
        Ok(active)
    }

    async fn list_active_in_units(
        &self,
        org_unit_ids: Vec<Uuid>,
        at: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgAssignment>> {
        self.0.list_active_in_units(org_unit_ids, at).await
    }

    async fn scope_revision(&self) -> UniHrResult<u64> {
        self.0.scope_revision().await
    }
}

#[tokio::test]
async fn assignment_ended_during_approval_is_a_conflict() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let r = reviewers(&h, uni.id).await;
    let target = course(&h, uni.id, &r.lecturer).await;
    h.workflow
        .apply(action(target, WorkflowAction::Submit, &r.lecturer, staged(Faculty, Draft)))
        .await
        .unwrap();

    let config = GovernanceConfig::default();
    let racing = WorkflowEngine::new(
        SurrealWorkflowRepository::new(h.db.clone()),
        SurrealOrgStructureRepository::new(h.db.clone()),
        HierarchyService::new(h.units.clone(), h.relations.clone(), config.clone()),
        ScopeResolver::new(
            h.relations.clone(),
            EndedAfterRead(SurrealOrgAssignmentRepository::new(h.db.clone())),
            config,
        ),
    );

    let seen = staged(AcademicOffice, Submitted);
    let err = racing
        .apply(action(target, WorkflowAction::Approve, &r.office, seen))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::Conflict { .. }), "got {err:?}");

    let snapshot = h.workflow.snapshot(target).await.unwrap();
    assert_eq!(snapshot.state, seen);
    assert_eq!(snapshot.version, 1);
    assert_eq!(h.workflow.history(target).await.unwrap().len(), 1);

    // A retry resolves the scope again and no longer finds the assignment.
    let err = h
        .workflow
        .apply(action(target, WorkflowAction::Approve, &r.office, seen))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AuthorizationDenied { .. }));
}

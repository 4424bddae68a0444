//! Integration tests for the org unit and hierarchy repositories using
//! in-memory SurrealDB.

use chrono::{Duration, Utc};
use serde_json::json;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use unihr_core::error::UniHrError;
use unihr_core::hierarchy::StructuralCommit;
use unihr_core::models::history::{ChangeType, NewOrgUnitHistory};
use unihr_core::models::org_unit::{NewDraftUnit, OrgUnitStatus, OrgUnitType};
use unihr_core::models::relation::{NewRelation, RelationType};
use unihr_core::repository::{HierarchyRepository, OrgUnitRepository, Pagination};
use unihr_db::repository::{SurrealHierarchyRepository, SurrealOrgUnitRepository};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    unihr_db::run_migrations(&db).await.unwrap();
    db
}

/// Plan that inserts a new active unit under `parent`.
fn register(
    code: &str,
    parent: Option<Uuid>,
    revision: u64,
    at: chrono::DateTime<Utc>,
) -> StructuralCommit {
    let id = Uuid::new_v4();
    StructuralCommit {
        unit_id: id,
        create_unit: Some(NewDraftUnit {
            id,
            code: code.into(),
            name: format!("Unit {code}"),
            unit_type: OrgUnitType::Faculty,
            description: None,
            metadata: json!({}),
        }),
        expected_revision: revision,
        effective_at: at,
        close_relation: None,
        insert_relation: parent.map(|parent_id| NewRelation {
            id: Uuid::new_v4(),
            parent_id,
            child_id: id,
            relation_type: RelationType::Administrative,
            effective_from: at,
            note: None,
        }),
        new_status: Some(OrgUnitStatus::Active),
        new_name: None,
        parent_projection: Some(parent),
        history: NewOrgUnitHistory {
            org_unit_id: id,
            change_type: ChangeType::Created,
            old_name: None,
            new_name: Some(format!("Unit {code}")),
            details: json!({}),
            changed_by: None,
        },
    }
}

#[tokio::test]
async fn register_units_and_project_parent() {
    let db = setup().await;
    let hierarchy = SurrealHierarchyRepository::new(db.clone());
    let units = SurrealOrgUnitRepository::new(db);
    let t0 = Utc::now() - Duration::days(10);

    let root = hierarchy
        .commit_structural_change(register("UNI", None, 0, t0))
        .await
        .unwrap();
    assert_eq!(root.status, OrgUnitStatus::Active);
    assert_eq!(root.parent_id, None);
    assert_eq!(root.version, 1);

    let child = hierarchy
        .commit_structural_change(register("FAC", Some(root.id), 1, t0))
        .await
        .unwrap();
    assert_eq!(child.parent_id, Some(root.id));
    assert_eq!(hierarchy.revision().await.unwrap(), 2);

    let by_code = units.get_by_code("FAC").await.unwrap();
    assert_eq!(by_code.id, child.id);

    let active = hierarchy.list_active_at(Utc::now()).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].parent_id, root.id);
    assert_eq!(active[0].child_id, child.id);
    assert!(active[0].is_open());

    let history = units.history(child.id).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].change_type, ChangeType::Created);

    let page = units.list(Pagination::default()).await.unwrap();
    assert_eq!(page.total, 2);
}

#[tokio::test]
async fn stale_revision_is_a_conflict_and_writes_nothing() {
    let db = setup().await;
    let hierarchy = SurrealHierarchyRepository::new(db.clone());
    let units = SurrealOrgUnitRepository::new(db);
    let t0 = Utc::now();

    hierarchy
        .commit_structural_change(register("UNI", None, 0, t0))
        .await
        .unwrap();

    let err = hierarchy
        .commit_structural_change(register("LATE", None, 0, t0))
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::Conflict { .. }), "got {err:?}");

    assert!(matches!(
        units.get_by_code("LATE").await,
        Err(UniHrError::NotFound { .. })
    ));
    assert_eq!(hierarchy.revision().await.unwrap(), 1);
}

#[tokio::test]
async fn duplicate_code_is_rejected() {
    let db = setup().await;
    let hierarchy = SurrealHierarchyRepository::new(db);
    let t0 = Utc::now();

    hierarchy
        .commit_structural_change(register("UNI", None, 0, t0))
        .await
        .unwrap();
    let err = hierarchy
        .commit_structural_change(register("UNI", None, 1, t0))
        .await
        .unwrap_err();
    assert!(!matches!(err, UniHrError::Conflict { .. }), "got {err:?}");
    assert_eq!(hierarchy.revision().await.unwrap(), 1);
}

#[tokio::test]
async fn move_closes_old_relation_and_keeps_history() {
    let db = setup().await;
    let hierarchy = SurrealHierarchyRepository::new(db.clone());
    let units = SurrealOrgUnitRepository::new(db);
    let t0 = Utc::now() - Duration::days(30);
    let t1 = Utc::now() - Duration::days(1);

    let a = hierarchy
        .commit_structural_change(register("A", None, 0, t0))
        .await
        .unwrap();
    let b = hierarchy
        .commit_structural_change(register("B", None, 1, t0))
        .await
        .unwrap();
    let c = hierarchy
        .commit_structural_change(register("C", Some(a.id), 2, t0))
        .await
        .unwrap();

    let open = hierarchy.list_for_child(c.id).await.unwrap();
    assert_eq!(open.len(), 1);

    let moved = hierarchy
        .commit_structural_change(StructuralCommit {
            unit_id: c.id,
            create_unit: None,
            expected_revision: 3,
            effective_at: t1,
            close_relation: Some(open[0].id),
            insert_relation: Some(NewRelation {
                id: Uuid::new_v4(),
                parent_id: b.id,
                child_id: c.id,
                relation_type: RelationType::Administrative,
                effective_from: t1,
                note: Some("restructure".into()),
            }),
            new_status: None,
            new_name: None,
            parent_projection: Some(Some(b.id)),
            history: NewOrgUnitHistory {
                org_unit_id: c.id,
                change_type: ChangeType::Moved,
                old_name: None,
                new_name: None,
                details: json!({ "from": a.id.to_string(), "to": b.id.to_string() }),
                changed_by: None,
            },
        })
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(b.id));
    assert_eq!(moved.status, OrgUnitStatus::Active);
    assert_eq!(moved.version, 2);

    let relations = hierarchy.list_for_child(c.id).await.unwrap();
    assert_eq!(relations.len(), 2);
    assert_eq!(relations[0].parent_id, a.id);
    assert_eq!(relations[0].effective_to, Some(t1));
    assert!(relations[1].is_open());

    // Before the move C was still under A.
    let earlier = hierarchy
        .list_active_at(t1 - Duration::hours(1))
        .await
        .unwrap();
    assert!(earlier.iter().any(|r| r.child_id == c.id && r.parent_id == a.id));

    let since = hierarchy.list_effective_since(t1).await.unwrap();
    assert!(since.iter().all(|r| r.parent_id != a.id || r.child_id != c.id));

    let history = units.history(c.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].change_type, ChangeType::Moved);
}

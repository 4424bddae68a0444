//! Integration tests for the hierarchy service.

mod common;

use chrono::{Duration, Utc};
use common::{Harness, days_ago};
use unihr_core::error::UniHrError;
use unihr_core::models::history::ChangeType;
use unihr_core::models::relation::RelationType;
use unihr_core::repository::{HierarchyRepository, OrgUnitRepository};
use unihr_governance::{GovernanceConfig, MoveUnit};
use uuid::Uuid;

fn move_input(unit_id: Uuid, new_parent_id: Option<Uuid>) -> MoveUnit {
    MoveUnit {
        unit_id,
        new_parent_id,
        relation_type: RelationType::Administrative,
        effective_from: days_ago(1),
        note: Some("restructuring".into()),
    }
}

#[tokio::test]
async fn descendants_and_ancestors_follow_current_edges() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;
    let pharm = h.unit("PHARM", Some(med.id)).await;
    let law = h.unit("LAW", Some(uni.id)).await;

    let now = Utc::now();
    let below_med = h.hierarchy.descendants(&[med.id], now).await.unwrap();
    assert_eq!(below_med.len(), 2);
    assert!(below_med.contains(&med.id));
    assert!(below_med.contains(&pharm.id));
    assert!(!below_med.contains(&law.id));

    let chain = h.hierarchy.ancestors(pharm.id, now).await.unwrap();
    assert_eq!(chain, vec![med.id, uni.id]);

    let parent = h.hierarchy.current_parent(pharm.id, now).await.unwrap();
    assert_eq!(parent.map(|r| r.parent_id), Some(med.id));
    assert!(h.hierarchy.current_parent(uni.id, now).await.unwrap().is_none());
}

#[tokio::test]
async fn register_rejects_duplicate_code() {
    let h = Harness::new().await;
    h.unit("UNI", None).await;

    let err = h
        .hierarchy
        .register_unit(
            unihr_governance::RegisterUnit {
                code: "UNI".into(),
                name: "Second university".into(),
                unit_type: unihr_core::models::org_unit::OrgUnitType::University,
                description: None,
                metadata: None,
                parent_id: None,
                relation_type: RelationType::Administrative,
                effective_from: days_ago(1),
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::AlreadyExists { .. }));
}

#[tokio::test]
async fn cycle_is_rejected_and_store_unchanged() {
    let h = Harness::new().await;
    let a = h.unit("A", None).await;
    let b = h.unit("B", Some(a.id)).await;
    let c = h.unit("C", Some(b.id)).await;

    let revision_before = h.relations.revision().await.unwrap();
    let relations_before = h.relations.list_all().await.unwrap().len();

    let err = h
        .hierarchy
        .move_unit(move_input(a.id, Some(c.id)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::CycleDetected { .. }));

    let err = h
        .hierarchy
        .move_unit(move_input(b.id, Some(b.id)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::CycleDetected { .. }));

    assert_eq!(h.relations.revision().await.unwrap(), revision_before);
    assert_eq!(h.relations.list_all().await.unwrap().len(), relations_before);
    let a_after = h.units.get_by_id(a.id).await.unwrap();
    assert_eq!(a_after.parent_id, None);
    assert_eq!(a_after.version, a.version);
}

#[tokio::test]
async fn backdated_move_is_checked_instant_by_instant() {
    let h = Harness::new().await;
    let q = h.unit_at("Q", None, days_ago(20)).await;
    let p = h.unit_at("P", Some(q.id), days_ago(10)).await;
    let c = h.unit_at("C", None, days_ago(20)).await;

    // P leaves Q five days ago; Q joins C three days ago.
    h.hierarchy
        .move_unit(
            MoveUnit {
                effective_from: days_ago(5),
                ..move_input(p.id, None)
            },
            None,
        )
        .await
        .unwrap();
    h.hierarchy
        .move_unit(
            MoveUnit {
                effective_from: days_ago(3),
                ..move_input(q.id, Some(c.id))
            },
            None,
        )
        .await
        .unwrap();

    // C under P from six days ago: C < P < Q until P left, Q < C < P
    // afterwards. P was once below Q, but never while Q was below C.
    let moved = h
        .hierarchy
        .move_unit(
            MoveUnit {
                effective_from: days_ago(6),
                ..move_input(c.id, Some(p.id))
            },
            None,
        )
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(p.id));

    let now = Utc::now();
    assert_eq!(
        h.hierarchy.ancestors(q.id, now).await.unwrap(),
        vec![c.id, p.id]
    );
    let five_and_a_half_days_ago = now - Duration::hours(132);
    assert_eq!(
        h.hierarchy
            .ancestors(c.id, five_and_a_half_days_ago)
            .await
            .unwrap(),
        vec![p.id, q.id]
    );
    assert!(h.hierarchy.verify_integrity().await.unwrap().is_clean());

    // Putting P back under Q would now close Q < C < P < Q.
    let err = h
        .hierarchy
        .move_unit(move_input(p.id, Some(q.id)), None)
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::CycleDetected { .. }));
}

#[tokio::test]
async fn move_keeps_history_queryable() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;
    let law = h.unit("LAW", Some(uni.id)).await;
    let lab = h.unit("LAB", Some(med.id)).await;

    let moved = h
        .hierarchy
        .move_unit(move_input(lab.id, Some(law.id)), Some(Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(moved.parent_id, Some(law.id));

    let now = Utc::now();
    let current = h.hierarchy.current_parent(lab.id, now).await.unwrap();
    assert_eq!(current.map(|r| r.parent_id), Some(law.id));
    let before = h.hierarchy.current_parent(lab.id, days_ago(5)).await.unwrap();
    assert_eq!(before.map(|r| r.parent_id), Some(med.id));

    let relations = h.relations.list_for_child(lab.id).await.unwrap();
    assert_eq!(relations.len(), 2);
    assert_eq!(relations.iter().filter(|r| r.is_open()).count(), 1);

    let history = h.units.history(lab.id).await.unwrap();
    let kinds: Vec<ChangeType> = history.iter().map(|e| e.change_type).collect();
    assert_eq!(kinds, vec![ChangeType::Created, ChangeType::Moved]);

    assert!(h.hierarchy.verify_integrity().await.unwrap().is_clean());
}

#[tokio::test]
async fn move_to_root_detaches_unit() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let inst = h.unit("INST", Some(uni.id)).await;

    let moved = h
        .hierarchy
        .move_unit(move_input(inst.id, None), None)
        .await
        .unwrap();
    assert_eq!(moved.parent_id, None);
    assert!(
        h.hierarchy
            .current_parent(inst.id, Utc::now())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn future_dated_move_is_rejected() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let law = h.unit("LAW", Some(uni.id)).await;
    let lab = h.unit("LAB", None).await;

    let mut input = move_input(lab.id, Some(law.id));
    input.effective_from = Utc::now() + Duration::days(30);
    let err = h.hierarchy.move_unit(input, None).await.unwrap_err();
    assert!(matches!(err, UniHrError::Validation { .. }));
}

#[tokio::test]
async fn move_cannot_start_before_current_relation() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let law = h.unit("LAW", Some(uni.id)).await;
    let lab = h.unit_at("LAB", Some(uni.id), days_ago(2)).await;

    let mut input = move_input(lab.id, Some(law.id));
    input.effective_from = days_ago(3);
    let err = h.hierarchy.move_unit(input, None).await.unwrap_err();
    assert!(matches!(err, UniHrError::Validation { .. }));
}

#[tokio::test]
async fn depth_limit_is_enforced() {
    let h = Harness::with_config(GovernanceConfig {
        max_hierarchy_depth: 1,
        ..GovernanceConfig::default()
    })
    .await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;

    let err = h
        .hierarchy
        .register_unit(
            unihr_governance::RegisterUnit {
                code: "PHARM".into(),
                name: "Pharmacy".into(),
                unit_type: unihr_core::models::org_unit::OrgUnitType::Department,
                description: None,
                metadata: None,
                parent_id: Some(med.id),
                relation_type: RelationType::Academic,
                effective_from: days_ago(1),
            },
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, UniHrError::Validation { .. }));
    assert!(h.units.get_by_code("PHARM").await.is_err());
}

#[tokio::test]
async fn tree_nests_units() {
    let h = Harness::new().await;
    let uni = h.unit("UNI", None).await;
    let med = h.unit("MED", Some(uni.id)).await;
    h.unit("PHARM", Some(med.id)).await;
    h.unit("LAW", Some(uni.id)).await;

    let tree = h.hierarchy.tree(&[uni.id], Utc::now()).await.unwrap();
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].unit.code, "UNI");
    assert_eq!(tree[0].children.len(), 2);
    let med_node = tree[0]
        .children
        .iter()
        .find(|n| n.unit.id == med.id)
        .unwrap();
    assert_eq!(med_node.children.len(), 1);
    assert_eq!(med_node.children[0].unit.code, "PHARM");
}

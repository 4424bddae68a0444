//! Hierarchy resolution over effective-dated relations.
//!
//! Everything here is pure: the store hands over relation rows and the
//! functions compute closures, parents, cycle checks and write plans.
//! Atomic application of a plan is the store's job (see
//! [`StructuralCommit`]).

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::error::{UniHrError, UniHrResult};
use crate::models::history::NewOrgUnitHistory;
use crate::models::org_unit::{NewDraftUnit, OrgUnit, OrgUnitStatus};
use crate::models::relation::{NewRelation, OrgUnitRelation};

/// The parent/child graph in effect at one instant.
///
/// Building the snapshot enforces the single-parent invariant: two
/// relations for the same child containing `as_of` is a structural
/// integrity error.
#[derive(Debug, Clone)]
pub struct HierarchySnapshot {
    as_of: DateTime<Utc>,
    parent_of: HashMap<Uuid, Uuid>,
    children_of: HashMap<Uuid, Vec<Uuid>>,
}

impl HierarchySnapshot {
    pub fn build(as_of: DateTime<Utc>, relations: &[OrgUnitRelation]) -> UniHrResult<Self> {
        let mut parent_of = HashMap::new();
        let mut children_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();

        for relation in relations.iter().filter(|r| r.contains(as_of)) {
            if let Some(existing) = parent_of.insert(relation.child_id, relation.parent_id) {
                error!(
                    child_id = %relation.child_id,
                    first_parent = %existing,
                    second_parent = %relation.parent_id,
                    %as_of,
                    "Overlapping org unit relations"
                );
                return Err(UniHrError::StructuralIntegrity(format!(
                    "org unit {} has more than one parent at {as_of}",
                    relation.child_id
                )));
            }
            children_of
                .entry(relation.parent_id)
                .or_default()
                .push(relation.child_id);
        }

        for children in children_of.values_mut() {
            children.sort();
        }

        Ok(Self {
            as_of,
            parent_of,
            children_of,
        })
    }

    pub fn as_of(&self) -> DateTime<Utc> {
        self.as_of
    }

    pub fn parent(&self, child_id: Uuid) -> Option<Uuid> {
        self.parent_of.get(&child_id).copied()
    }

    pub fn children(&self, parent_id: Uuid) -> &[Uuid] {
        self.children_of
            .get(&parent_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The roots plus every unit reachable from them.
    ///
    /// Breadth-first with a visited set, so it terminates on any input.
    /// Reaching an already visited unit that sits on a parent loop is
    /// reported as a structural integrity error.
    pub fn descendants(&self, roots: impl IntoIterator<Item = Uuid>) -> UniHrResult<BTreeSet<Uuid>> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();

        for root in roots {
            if visited.insert(root) {
                queue.push_back(root);
            }
        }

        while let Some(current) = queue.pop_front() {
            for &child in self.children(current) {
                if visited.insert(child) {
                    queue.push_back(child);
                } else if self.on_parent_loop(child) {
                    error!(
                        org_unit_id = %child,
                        as_of = %self.as_of,
                        "Cycle in org unit hierarchy"
                    );
                    return Err(UniHrError::StructuralIntegrity(format!(
                        "cycle through org unit {child} at {}",
                        self.as_of
                    )));
                }
            }
        }

        Ok(visited)
    }

    /// Parent chain of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: Uuid) -> UniHrResult<Vec<Uuid>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::from([id]);
        let mut current = id;

        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent) {
                error!(org_unit_id = %id, as_of = %self.as_of, "Cycle in ancestor chain");
                return Err(UniHrError::StructuralIntegrity(format!(
                    "cycle in ancestor chain of org unit {id} at {}",
                    self.as_of
                )));
            }
            chain.push(parent);
            current = parent;
        }

        Ok(chain)
    }

    /// Number of ancestors of `id`.
    pub fn depth(&self, id: Uuid) -> UniHrResult<usize> {
        self.ancestors(id).map(|chain| chain.len())
    }

    /// Nested view of the units reachable from `roots`.
    ///
    /// Units absent from `units` are skipped together with their subtrees.
    pub fn tree(
        &self,
        roots: &[Uuid],
        units: &HashMap<Uuid, OrgUnit>,
    ) -> UniHrResult<Vec<OrgTreeNode>> {
        // Fails on cycles, which makes the recursion below safe.
        self.descendants(roots.iter().copied())?;

        Ok(roots
            .iter()
            .filter_map(|root| self.tree_node(*root, units))
            .collect())
    }

    fn tree_node(&self, id: Uuid, units: &HashMap<Uuid, OrgUnit>) -> Option<OrgTreeNode> {
        let unit = units.get(&id)?.clone();
        let children = self
            .children(id)
            .iter()
            .filter_map(|child| self.tree_node(*child, units))
            .collect();
        Some(OrgTreeNode { unit, children })
    }

    fn on_parent_loop(&self, start: Uuid) -> bool {
        let mut seen = HashSet::from([start]);
        let mut current = start;
        while let Some(parent) = self.parent(current) {
            if !seen.insert(parent) {
                return true;
            }
            current = parent;
        }
        false
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgTreeNode {
    pub unit: OrgUnit,
    pub children: Vec<OrgTreeNode>,
}

/// Whether inserting `parent_id -> child_id` effective from `from` would
/// make `child_id` an ancestor of itself at some instant.
///
/// The new edge is open-ended, so every instant from `from` on is checked.
/// The relation set only changes where an interval starts or ends, so the
/// ancestor chain of `parent_id` is walked once at `from` and once at each
/// later boundary.
pub fn would_create_cycle(
    relations: &[OrgUnitRelation],
    parent_id: Uuid,
    child_id: Uuid,
    from: DateTime<Utc>,
) -> bool {
    if parent_id == child_id {
        return true;
    }

    let relevant: Vec<&OrgUnitRelation> = relations
        .iter()
        .filter(|r| r.effective_since(from))
        .collect();

    let mut instants = BTreeSet::from([from]);
    for relation in &relevant {
        instants.extend(
            [Some(relation.effective_from), relation.effective_to]
                .into_iter()
                .flatten()
                .filter(|at| *at > from),
        );
    }

    instants
        .into_iter()
        .any(|at| ancestor_at(&relevant, parent_id, child_id, at))
}

/// Whether `ancestor` sits on the parent chain of `unit_id` at `at`.
fn ancestor_at(
    relations: &[&OrgUnitRelation],
    unit_id: Uuid,
    ancestor: Uuid,
    at: DateTime<Utc>,
) -> bool {
    let mut parents_of: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for relation in relations.iter().filter(|r| r.contains(at)) {
        parents_of
            .entry(relation.child_id)
            .or_default()
            .push(relation.parent_id);
    }

    let mut visited = HashSet::from([unit_id]);
    let mut queue = VecDeque::from([unit_id]);
    while let Some(current) = queue.pop_front() {
        for &parent in parents_of.get(&current).map(Vec::as_slice).unwrap_or(&[]) {
            if parent == ancestor {
                return true;
            }
            if visited.insert(parent) {
                queue.push_back(parent);
            }
        }
    }

    false
}

/// The relation of `child_id` containing `as_of`, if any.
pub fn current_parent(
    child_id: Uuid,
    relations: &[OrgUnitRelation],
    as_of: DateTime<Utc>,
) -> UniHrResult<Option<OrgUnitRelation>> {
    let mut containing = relations
        .iter()
        .filter(|r| r.child_id == child_id && r.contains(as_of));

    let first = containing.next().cloned();
    if containing.next().is_some() {
        error!(child_id = %child_id, %as_of, "Overlapping org unit relations");
        return Err(UniHrError::StructuralIntegrity(format!(
            "org unit {child_id} has more than one parent at {as_of}"
        )));
    }
    Ok(first)
}

/// Check the non-overlap invariant for one child's relations.
pub fn verify_child_intervals(child_id: Uuid, relations: &[OrgUnitRelation]) -> UniHrResult<()> {
    let own: Vec<&OrgUnitRelation> = relations.iter().filter(|r| r.child_id == child_id).collect();

    if own.iter().filter(|r| r.is_open()).count() > 1 {
        error!(child_id = %child_id, "Multiple open org unit relations");
        return Err(UniHrError::StructuralIntegrity(format!(
            "org unit {child_id} has more than one open relation"
        )));
    }

    for (i, a) in own.iter().enumerate() {
        if let Some(b) = own[i + 1..].iter().find(|b| a.overlaps(b)) {
            error!(
                child_id = %child_id,
                first = %a.id,
                second = %b.id,
                "Overlapping org unit relations"
            );
            return Err(UniHrError::StructuralIntegrity(format!(
                "relations {} and {} of org unit {child_id} overlap",
                a.id, b.id
            )));
        }
    }

    Ok(())
}

/// Decide which relation must be closed so that a new relation for
/// `child_id` can start at `effective_from` without overlapping history.
///
/// Returns the id of the open relation to close, if there is one. The new
/// start must lie strictly after the open relation's start and not before
/// the end of any closed relation.
pub fn plan_relation_change(
    child_id: Uuid,
    relations: &[OrgUnitRelation],
    effective_from: DateTime<Utc>,
) -> UniHrResult<Option<Uuid>> {
    verify_child_intervals(child_id, relations)?;

    let mut to_close = None;
    for relation in relations.iter().filter(|r| r.child_id == child_id) {
        match relation.effective_to {
            Some(to) if to > effective_from => {
                return Err(UniHrError::validation(format!(
                    "effective date {effective_from} falls inside historical relation {} \
                     ending {to}",
                    relation.id
                )));
            }
            Some(_) => {}
            None => {
                if effective_from <= relation.effective_from {
                    return Err(UniHrError::validation(format!(
                        "effective date {effective_from} must be after the current \
                         relation start {}",
                        relation.effective_from
                    )));
                }
                to_close = Some(relation.id);
            }
        }
    }

    Ok(to_close)
}

/// Change to the `parent_id` projection of a unit.
///
/// `Some(Some(id))` sets, `Some(None)` clears, `None` leaves it unchanged.
pub type ParentProjection = Option<Option<Uuid>>;

/// A planned structural change, applied by the store as one atomic unit:
/// close/insert relations, update the unit row, append the history record
/// and bump the hierarchy revision.
#[derive(Debug, Clone)]
pub struct StructuralCommit {
    pub unit_id: Uuid,
    /// Unit row inserted (as `Active`) before anything else, for units
    /// registered directly rather than through a create request.
    pub create_unit: Option<NewDraftUnit>,
    /// Hierarchy revision the plan was computed against.
    pub expected_revision: u64,
    pub effective_at: DateTime<Utc>,
    pub close_relation: Option<Uuid>,
    pub insert_relation: Option<NewRelation>,
    pub new_status: Option<OrgUnitStatus>,
    pub new_name: Option<String>,
    pub parent_projection: ParentProjection,
    pub history: NewOrgUnitHistory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegrityViolation {
    MultipleOpenRelations { child_id: Uuid },
    OverlappingRelations { child_id: Uuid },
    ProjectionMismatch {
        org_unit_id: Uuid,
        projected: Option<Uuid>,
        effective: Option<Uuid>,
    },
    Cycle { org_unit_id: Uuid },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub violations: Vec<IntegrityViolation>,
}

impl IntegrityReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Scan units and relations for invariant violations without failing
/// fast, so that every problem is reported at once.
pub fn audit_hierarchy(
    units: &[OrgUnit],
    relations: &[OrgUnitRelation],
    now: DateTime<Utc>,
) -> IntegrityReport {
    let mut report = IntegrityReport::default();

    let children: BTreeSet<Uuid> = relations.iter().map(|r| r.child_id).collect();
    let mut intervals_ok = true;
    for child_id in children {
        let own: Vec<&OrgUnitRelation> =
            relations.iter().filter(|r| r.child_id == child_id).collect();
        if own.iter().filter(|r| r.is_open()).count() > 1 {
            report
                .violations
                .push(IntegrityViolation::MultipleOpenRelations { child_id });
            intervals_ok = false;
        } else if own
            .iter()
            .enumerate()
            .any(|(i, a)| own[i + 1..].iter().any(|b| a.overlaps(b)))
        {
            report
                .violations
                .push(IntegrityViolation::OverlappingRelations { child_id });
            intervals_ok = false;
        }
    }

    if !intervals_ok {
        return report;
    }

    // Intervals are sound, so the snapshot cannot fail.
    let Ok(snapshot) = HierarchySnapshot::build(now, relations) else {
        return report;
    };

    for unit in units {
        let effective = snapshot.parent(unit.id);
        if unit.parent_id != effective {
            report.violations.push(IntegrityViolation::ProjectionMismatch {
                org_unit_id: unit.id,
                projected: unit.parent_id,
                effective,
            });
        }
        if snapshot.on_parent_loop(unit.id) {
            report
                .violations
                .push(IntegrityViolation::Cycle { org_unit_id: unit.id });
        }
    }

    report
}

//! Authorization scope: what an actor may read or act upon.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::actor::Actor;

/// Suffix marking an organization-wide variant of a permission,
/// e.g. `employee.read:all`.
pub const ORG_WIDE_SUFFIX: &str = ":all";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScopeResult {
    /// Unrestricted.
    All,
    /// Anything owned by a unit in the descendant closure of `roots`.
    OrgSubtree {
        roots: BTreeSet<Uuid>,
        /// `roots` plus all their descendants at resolution time.
        units: BTreeSet<Uuid>,
    },
    /// Only entities belonging to the actor.
    SelfOnly { actor_id: Uuid },
}

impl ScopeResult {
    pub fn permits_org_unit(&self, org_unit_id: Uuid) -> bool {
        match self {
            ScopeResult::All => true,
            ScopeResult::OrgSubtree { units, .. } => units.contains(&org_unit_id),
            ScopeResult::SelfOnly { .. } => false,
        }
    }

    /// Whether an entity owned by `owner_org_id` and belonging to
    /// `subject_id` (its requester, or the employee it describes) is in
    /// scope.
    pub fn permits(&self, owner_org_id: Uuid, subject_id: Uuid) -> bool {
        match self {
            ScopeResult::SelfOnly { actor_id } => *actor_id == subject_id,
            other => other.permits_org_unit(owner_org_id),
        }
    }
}

/// Whether `actor` holds a grant implying organization-wide scope for
/// `permission`: one of the blanket permissions, or the `:all` variant.
pub fn has_org_wide_grant(actor: &Actor, permission: &str, blanket_permissions: &[String]) -> bool {
    blanket_permissions.iter().any(|p| actor.has_permission(p))
        || actor.has_permission(&format!("{permission}{ORG_WIDE_SUFFIX}"))
}

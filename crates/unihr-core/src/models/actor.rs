//! The acting principal, as resolved by the external identity provider.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated actor: an employee id plus the role-level permission
/// strings granted to them. The core never authenticates; it only consumes
/// this resolved view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: Uuid,
    pub permissions: BTreeSet<String>,
}

impl Actor {
    pub fn new<I, S>(id: Uuid, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            permissions: permissions.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

//! Governance configuration.

/// Configuration shared by the governance services.
#[derive(Debug, Clone)]
pub struct GovernanceConfig {
    /// Permissions that grant organization-wide scope for every permission
    /// (default: `*` and `system.admin`).
    pub blanket_permissions: Vec<String>,
    /// Seed org-subtree scopes only from the actor's primary assignment
    /// (default: true). When false, every active assignment seeds the
    /// subtree, including concurrent and acting ones.
    pub scope_from_primary_only: bool,
    /// Maximum number of ancestors a unit may have (default: 16).
    pub max_hierarchy_depth: usize,
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            blanket_permissions: vec!["*".into(), "system.admin".into()],
            scope_from_primary_only: true,
            max_hierarchy_depth: 16,
        }
    }
}

//! SurrealDB implementation of [`HierarchyRepository`].
//!
//! Structural changes are applied by a single transaction script that
//! checks the hierarchy revision, closes/inserts relations, updates the
//! unit row (including its `parent_id` projection), appends the history
//! record and bumps the revision. A change to the relations also bumps
//! the scope revision, since scopes are resolved over them. The same
//! statements are embedded in workflow transition scripts when an approval
//! carries a structural side effect.

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::{info, warn};
use unihr_core::error::UniHrResult;
use unihr_core::hierarchy::StructuralCommit;
use unihr_core::models::org_unit::OrgUnit;
use unihr_core::models::relation::OrgUnitRelation;
use unihr_core::repository::HierarchyRepository;
use uuid::Uuid;

use super::org_unit::fetch_org_unit;
use super::{parse_enum, parse_uuid, script_error};
use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct RelationRowWithId {
    record_id: String,
    parent_id: String,
    child_id: String,
    relation_type: String,
    effective_from: DateTime<Utc>,
    effective_to: Option<DateTime<Utc>>,
    note: Option<String>,
}

impl RelationRowWithId {
    fn try_into_relation(self) -> Result<OrgUnitRelation, DbError> {
        Ok(OrgUnitRelation {
            id: parse_uuid("relation", &self.record_id)?,
            parent_id: parse_uuid("parent", &self.parent_id)?,
            child_id: parse_uuid("child", &self.child_id)?,
            relation_type: parse_enum(&self.relation_type)?,
            effective_from: self.effective_from,
            effective_to: self.effective_to,
            note: self.note,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct RevisionRow {
    revision: u64,
}

/// Statements applying a [`StructuralCommit`]. Expects the `$s_*`
/// parameters bound by [`bind_structural!`] and must run inside a
/// transaction.
pub(crate) const STRUCTURAL_STATEMENTS: &str = "\
LET $s_revision = (SELECT VALUE revision FROM ONLY hierarchy_state:main);
IF $s_revision != $s_expected_revision {
    THROW 'unihr-conflict: hierarchy revision changed';
};
IF $s_create_unit {
    CREATE type::record('org_unit', $s_unit_id) SET
        code = $s_code, name = $s_name, unit_type = $s_unit_type,
        status = 'Draft', description = $s_description,
        metadata = $s_metadata, version = 0;
};
IF $s_close_relation != NONE {
    UPDATE type::record('org_unit_relation', $s_close_relation)
        SET effective_to = $s_effective_at;
};
IF $s_insert_relation {
    CREATE type::record('org_unit_relation', $s_relation_id) SET
        parent_id = $s_relation_parent, child_id = $s_unit_id,
        relation_type = $s_relation_type,
        effective_from = $s_relation_from, note = $s_relation_note;
};
IF $s_set_parent {
    UPDATE type::record('org_unit', $s_unit_id) SET parent_id = $s_parent_id;
};
UPDATE type::record('org_unit', $s_unit_id) SET
    status = $s_new_status ?? status,
    name = $s_new_name ?? name,
    version += 1,
    updated_at = time::now();
CREATE type::record('org_unit_history', $s_history_id) SET
    org_unit_id = $s_unit_id, change_type = $s_change_type,
    old_name = $s_old_name, new_name = $s_history_new_name,
    details = $s_details, changed_by = $s_changed_by;
UPDATE hierarchy_state:main SET revision += 1, updated_at = time::now();
IF $s_insert_relation OR $s_close_relation != NONE {
    UPDATE scope_state:main SET revision += 1, updated_at = time::now();
};
";

/// Owned, store-encoded values of a [`StructuralCommit`].
///
/// Every parameter is always bound; the flags select which statements
/// take effect.
pub(crate) struct StructuralBinds {
    pub expected_revision: u64,
    pub unit_id: String,
    pub create_unit: bool,
    pub code: String,
    pub name: String,
    pub unit_type: String,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub close_relation: Option<String>,
    pub effective_at: DateTime<Utc>,
    pub insert_relation: bool,
    pub relation_id: String,
    pub relation_parent: String,
    pub relation_type: String,
    pub relation_from: DateTime<Utc>,
    pub relation_note: Option<String>,
    pub set_parent: bool,
    pub parent_id: Option<String>,
    pub new_status: Option<String>,
    pub new_name: Option<String>,
    pub history_id: String,
    pub change_type: String,
    pub old_name: Option<String>,
    pub history_new_name: Option<String>,
    pub details: serde_json::Value,
    pub changed_by: Option<String>,
}

impl From<StructuralCommit> for StructuralBinds {
    fn from(commit: StructuralCommit) -> Self {
        let unit = commit.create_unit;
        let relation = commit.insert_relation;
        Self {
            expected_revision: commit.expected_revision,
            unit_id: commit.unit_id.to_string(),
            create_unit: unit.is_some(),
            code: unit.as_ref().map(|u| u.code.clone()).unwrap_or_default(),
            name: unit.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
            unit_type: unit
                .as_ref()
                .map(|u| u.unit_type.as_str())
                .unwrap_or_default()
                .to_string(),
            description: unit.as_ref().and_then(|u| u.description.clone()),
            metadata: unit
                .map(|u| u.metadata)
                .unwrap_or_else(|| serde_json::Value::Object(Default::default())),
            close_relation: commit.close_relation.map(|id| id.to_string()),
            effective_at: commit.effective_at,
            insert_relation: relation.is_some(),
            relation_id: relation
                .as_ref()
                .map(|r| r.id.to_string())
                .unwrap_or_default(),
            relation_parent: relation
                .as_ref()
                .map(|r| r.parent_id.to_string())
                .unwrap_or_default(),
            relation_type: relation
                .as_ref()
                .map(|r| r.relation_type.as_str())
                .unwrap_or_default()
                .to_string(),
            relation_from: relation
                .as_ref()
                .map(|r| r.effective_from)
                .unwrap_or(commit.effective_at),
            relation_note: relation.and_then(|r| r.note),
            set_parent: commit.parent_projection.is_some(),
            parent_id: commit.parent_projection.flatten().map(|id| id.to_string()),
            new_status: commit.new_status.map(|s| s.as_str().to_string()),
            new_name: commit.new_name,
            history_id: Uuid::new_v4().to_string(),
            change_type: commit.history.change_type.as_str().to_string(),
            old_name: commit.history.old_name,
            history_new_name: commit.history.new_name,
            details: commit.history.details,
            changed_by: commit.history.changed_by.map(|id| id.to_string()),
        }
    }
}

/// Bind every `$s_*` parameter of [`STRUCTURAL_STATEMENTS`] on a query.
macro_rules! bind_structural {
    ($query:expr, $binds:expr) => {{
        let b: $crate::repository::hierarchy::StructuralBinds = $binds;
        $query
            .bind(("s_expected_revision", b.expected_revision))
            .bind(("s_unit_id", b.unit_id))
            .bind(("s_create_unit", b.create_unit))
            .bind(("s_code", b.code))
            .bind(("s_name", b.name))
            .bind(("s_unit_type", b.unit_type))
            .bind(("s_description", b.description))
            .bind(("s_metadata", b.metadata))
            .bind(("s_close_relation", b.close_relation))
            .bind(("s_effective_at", b.effective_at))
            .bind(("s_insert_relation", b.insert_relation))
            .bind(("s_relation_id", b.relation_id))
            .bind(("s_relation_parent", b.relation_parent))
            .bind(("s_relation_type", b.relation_type))
            .bind(("s_relation_from", b.relation_from))
            .bind(("s_relation_note", b.relation_note))
            .bind(("s_set_parent", b.set_parent))
            .bind(("s_parent_id", b.parent_id))
            .bind(("s_new_status", b.new_status))
            .bind(("s_new_name", b.new_name))
            .bind(("s_history_id", b.history_id))
            .bind(("s_change_type", b.change_type))
            .bind(("s_old_name", b.old_name))
            .bind(("s_history_new_name", b.history_new_name))
            .bind(("s_details", b.details))
            .bind(("s_changed_by", b.changed_by))
    }};
}

pub(crate) use bind_structural;

/// Current value of the hierarchy revision counter.
pub(crate) async fn fetch_revision<C: Connection>(db: &Surreal<C>) -> Result<u64, DbError> {
    let mut result = db
        .query("SELECT revision FROM hierarchy_state:main")
        .await?;
    let rows: Vec<RevisionRow> = result.take(0)?;
    rows.first()
        .map(|r| r.revision)
        .ok_or_else(|| DbError::NotFound {
            entity: "hierarchy_state".into(),
            id: "main".into(),
        })
}

/// SurrealDB implementation of the hierarchy repository.
#[derive(Clone)]
pub struct SurrealHierarchyRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHierarchyRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn select_relations(
        &self,
        filter: &str,
        at: Option<DateTime<Utc>>,
        child_id: Option<Uuid>,
    ) -> Result<Vec<OrgUnitRelation>, DbError> {
        let query = format!(
            "SELECT meta::id(id) AS record_id, * \
             FROM org_unit_relation {filter} \
             ORDER BY effective_from ASC"
        );

        let mut result = self
            .db
            .query(&query)
            .bind(("at", at))
            .bind(("child_id", child_id.map(|id| id.to_string())))
            .await?;

        let rows: Vec<RelationRowWithId> = result.take(0)?;
        rows.into_iter()
            .map(|row| row.try_into_relation())
            .collect()
    }
}

impl<C: Connection> HierarchyRepository for SurrealHierarchyRepository<C> {
    async fn list_all(&self) -> UniHrResult<Vec<OrgUnitRelation>> {
        Ok(self.select_relations("", None, None).await?)
    }

    async fn list_active_at(&self, at: DateTime<Utc>) -> UniHrResult<Vec<OrgUnitRelation>> {
        Ok(self
            .select_relations(
                "WHERE effective_from <= $at \
                 AND (effective_to = NONE OR effective_to > $at)",
                Some(at),
                None,
            )
            .await?)
    }

    async fn list_effective_since(
        &self,
        from: DateTime<Utc>,
    ) -> UniHrResult<Vec<OrgUnitRelation>> {
        Ok(self
            .select_relations(
                "WHERE effective_to = NONE OR effective_to > $at",
                Some(from),
                None,
            )
            .await?)
    }

    async fn list_for_child(&self, child_id: Uuid) -> UniHrResult<Vec<OrgUnitRelation>> {
        Ok(self
            .select_relations("WHERE child_id = $child_id", None, Some(child_id))
            .await?)
    }

    async fn revision(&self) -> UniHrResult<u64> {
        Ok(fetch_revision(&self.db).await?)
    }

    async fn commit_structural_change(&self, commit: StructuralCommit) -> UniHrResult<OrgUnit> {
        let unit_id = commit.unit_id;
        let expected = commit.expected_revision;
        let change_type = commit.history.change_type;

        let script = format!("BEGIN TRANSACTION;\n{STRUCTURAL_STATEMENTS}COMMIT TRANSACTION;");
        let query = self.db.query(&script);
        let response = bind_structural!(query, StructuralBinds::from(commit))
            .await
            .map_err(DbError::from)?;

        if let Err(e) = response.check() {
            let current = fetch_revision(&self.db).await?;
            if current != expected {
                warn!(
                    org_unit_id = %unit_id,
                    expected_revision = expected,
                    current_revision = current,
                    "Hierarchy changed concurrently"
                );
                return Err(DbError::Conflict {
                    entity: "org_unit".into(),
                    id: unit_id.to_string(),
                    reason: format!(
                        "hierarchy revision moved from {expected} to {current}"
                    ),
                }
                .into());
            }
            return Err(script_error(e.to_string(), "org_unit", &unit_id.to_string()).into());
        }

        info!(
            org_unit_id = %unit_id,
            change = change_type.as_str(),
            revision = expected + 1,
            "Structural change committed"
        );

        Ok(fetch_org_unit(&self.db, unit_id).await?)
    }
}

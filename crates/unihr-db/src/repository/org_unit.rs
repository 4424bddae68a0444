//! SurrealDB implementation of [`OrgUnitRepository`].

use chrono::{DateTime, Utc};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use unihr_core::error::UniHrResult;
use unihr_core::models::history::OrgUnitHistory;
use unihr_core::models::org_unit::OrgUnit;
use unihr_core::repository::{OrgUnitRepository, PaginatedResult, Pagination};
use uuid::Uuid;

use super::{CountRow, parse_enum, parse_opt_uuid, parse_uuid};
use crate::error::DbError;

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
pub(crate) struct OrgUnitRowWithId {
    record_id: String,
    code: String,
    name: String,
    unit_type: String,
    status: String,
    parent_id: Option<String>,
    description: Option<String>,
    metadata: serde_json::Value,
    version: u64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrgUnitRowWithId {
    pub(crate) fn try_into_org_unit(self) -> Result<OrgUnit, DbError> {
        Ok(OrgUnit {
            id: parse_uuid("org unit", &self.record_id)?,
            code: self.code,
            name: self.name,
            unit_type: parse_enum(&self.unit_type)?,
            status: parse_enum(&self.status)?,
            parent_id: parse_opt_uuid("parent", self.parent_id)?,
            description: self.description,
            metadata: self.metadata,
            version: self.version,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, SurrealValue)]
struct HistoryRowWithId {
    record_id: String,
    org_unit_id: String,
    change_type: String,
    old_name: Option<String>,
    new_name: Option<String>,
    details: serde_json::Value,
    changed_by: Option<String>,
    changed_at: DateTime<Utc>,
}

impl HistoryRowWithId {
    fn try_into_history(self) -> Result<OrgUnitHistory, DbError> {
        Ok(OrgUnitHistory {
            id: parse_uuid("history", &self.record_id)?,
            org_unit_id: parse_uuid("org unit", &self.org_unit_id)?,
            change_type: parse_enum(&self.change_type)?,
            old_name: self.old_name,
            new_name: self.new_name,
            details: self.details,
            changed_by: parse_opt_uuid("changed_by", self.changed_by)?,
            changed_at: self.changed_at,
        })
    }
}

/// Load one org unit by id.
pub(crate) async fn fetch_org_unit<C: Connection>(
    db: &Surreal<C>,
    id: Uuid,
) -> Result<OrgUnit, DbError> {
    let id_str = id.to_string();

    let mut result = db
        .query(
            "SELECT meta::id(id) AS record_id, * \
             FROM type::record('org_unit', $id)",
        )
        .bind(("id", id_str.clone()))
        .await?;

    let rows: Vec<OrgUnitRowWithId> = result.take(0)?;
    let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
        entity: "org_unit".into(),
        id: id_str,
    })?;

    row.try_into_org_unit()
}

/// SurrealDB implementation of the OrgUnit repository.
///
/// Read-only: units are written exclusively by structural scripts in
/// [`super::SurrealHierarchyRepository`] and
/// [`super::SurrealOrgStructureRepository`].
#[derive(Clone)]
pub struct SurrealOrgUnitRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealOrgUnitRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> OrgUnitRepository for SurrealOrgUnitRepository<C> {
    async fn get_by_id(&self, id: Uuid) -> UniHrResult<OrgUnit> {
        Ok(fetch_org_unit(&self.db, id).await?)
    }

    async fn get_by_code(&self, code: &str) -> UniHrResult<OrgUnit> {
        let code_owned = code.to_string();

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM org_unit WHERE code = $code",
            )
            .bind(("code", code_owned))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "org_unit".into(),
            id: format!("code={code}"),
        })?;

        Ok(row.try_into_org_unit()?)
    }

    async fn list(&self, pagination: Pagination) -> UniHrResult<PaginatedResult<OrgUnit>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM org_unit GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM org_unit \
                 ORDER BY code ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRowWithId> = result.take(0).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(|row| row.try_into_org_unit())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    async fn list_all(&self) -> UniHrResult<Vec<OrgUnit>> {
        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM org_unit ORDER BY code ASC")
            .await
            .map_err(DbError::from)?;

        let rows: Vec<OrgUnitRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_org_unit())
            .collect::<Result<Vec<_>, DbError>>()?)
    }

    async fn history(&self, org_unit_id: Uuid) -> UniHrResult<Vec<OrgUnitHistory>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * \
                 FROM org_unit_history \
                 WHERE org_unit_id = $org_unit_id \
                 ORDER BY changed_at ASC",
            )
            .bind(("org_unit_id", org_unit_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HistoryRowWithId> = result.take(0).map_err(DbError::from)?;
        Ok(rows
            .into_iter()
            .map(|row| row.try_into_history())
            .collect::<Result<Vec<_>, DbError>>()?)
    }
}

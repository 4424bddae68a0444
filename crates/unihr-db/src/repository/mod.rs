//! SurrealDB repository implementations.

mod assignment;
mod hierarchy;
mod org_unit;
mod structure_request;
mod workflow;

pub use assignment::SurrealOrgAssignmentRepository;
pub use hierarchy::SurrealHierarchyRepository;

pub(crate) use assignment::fetch_scope_revision;
pub(crate) use hierarchy::fetch_revision;
pub use org_unit::SurrealOrgUnitRepository;
pub use structure_request::SurrealOrgStructureRepository;
pub use workflow::SurrealWorkflowRepository;

use std::str::FromStr;

use surrealdb_types::SurrealValue;
use unihr_core::error::UniHrError;
use uuid::Uuid;

use crate::error::DbError;

/// Prefix of every message thrown by an optimistic guard inside a
/// transaction script.
pub(crate) const CONFLICT_MARKER: &str = "unihr-conflict";

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub total: u64,
}

pub(crate) fn parse_uuid(field: &str, value: &str) -> Result<Uuid, DbError> {
    Uuid::parse_str(value).map_err(|e| DbError::Decode(format!("invalid {field} UUID: {e}")))
}

pub(crate) fn parse_opt_uuid(field: &str, value: Option<String>) -> Result<Option<Uuid>, DbError> {
    value.map(|v| parse_uuid(field, &v)).transpose()
}

/// Parse a string-encoded enum column.
pub(crate) fn parse_enum<T>(value: &str) -> Result<T, DbError>
where
    T: FromStr<Err = UniHrError>,
{
    value.parse().map_err(|e: UniHrError| DbError::Decode(e.to_string()))
}

/// Map the failure of a transaction script to a database error.
///
/// Depending on which statement failed first, the guard's message may be
/// reported or may be masked by the cancellation of the remaining
/// statements; callers that can re-read their guard should do so before
/// falling back to this.
pub(crate) fn script_error(message: String, entity: &str, id: &str) -> DbError {
    if message.contains(CONFLICT_MARKER) {
        DbError::Conflict {
            entity: entity.into(),
            id: id.into(),
            reason: message,
        }
    } else if message.contains("already contains") {
        DbError::AlreadyExists {
            entity: entity.into(),
            key: message,
        }
    } else {
        DbError::Query(message)
    }
}

pub(crate) fn uuids_to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

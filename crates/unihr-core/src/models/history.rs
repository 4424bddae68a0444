//! Org unit change log (append-only).

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UniHrError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ChangeType {
    Created,
    Renamed,
    Moved,
    Archived,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::Created => "Created",
            ChangeType::Renamed => "Renamed",
            ChangeType::Moved => "Moved",
            ChangeType::Archived => "Archived",
        }
    }
}

impl FromStr for ChangeType {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Created" => Ok(ChangeType::Created),
            "Renamed" => Ok(ChangeType::Renamed),
            "Moved" => Ok(ChangeType::Moved),
            "Archived" => Ok(ChangeType::Archived),
            other => Err(UniHrError::validation(format!(
                "unknown change type: {other}"
            ))),
        }
    }
}

/// One accepted structural change. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnitHistory {
    pub id: Uuid,
    pub org_unit_id: Uuid,
    pub change_type: ChangeType,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub details: serde_json::Value,
    pub changed_by: Option<Uuid>,
    pub changed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrgUnitHistory {
    pub org_unit_id: Uuid,
    pub change_type: ChangeType,
    pub old_name: Option<String>,
    pub new_name: Option<String>,
    pub details: serde_json::Value,
    pub changed_by: Option<Uuid>,
}

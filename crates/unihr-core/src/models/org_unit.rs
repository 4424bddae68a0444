//! Org unit domain model.
//!
//! An org unit is a node of the university's organizational chart
//! (university, school, faculty, department, ...). Units are never
//! deleted: they move from `Draft` to `Active` on workflow approval and
//! may later be `Archived`, so that history stays queryable.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UniHrError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrgUnitType {
    University,
    School,
    Faculty,
    Department,
    Division,
    Office,
    Center,
    Institute,
}

impl OrgUnitType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgUnitType::University => "University",
            OrgUnitType::School => "School",
            OrgUnitType::Faculty => "Faculty",
            OrgUnitType::Department => "Department",
            OrgUnitType::Division => "Division",
            OrgUnitType::Office => "Office",
            OrgUnitType::Center => "Center",
            OrgUnitType::Institute => "Institute",
        }
    }
}

impl FromStr for OrgUnitType {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "University" => Ok(OrgUnitType::University),
            "School" => Ok(OrgUnitType::School),
            "Faculty" => Ok(OrgUnitType::Faculty),
            "Department" => Ok(OrgUnitType::Department),
            "Division" => Ok(OrgUnitType::Division),
            "Office" => Ok(OrgUnitType::Office),
            "Center" => Ok(OrgUnitType::Center),
            "Institute" => Ok(OrgUnitType::Institute),
            other => Err(UniHrError::validation(format!(
                "unknown org unit type: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OrgUnitStatus {
    Draft,
    Active,
    Archived,
}

impl OrgUnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrgUnitStatus::Draft => "Draft",
            OrgUnitStatus::Active => "Active",
            OrgUnitStatus::Archived => "Archived",
        }
    }
}

impl FromStr for OrgUnitStatus {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(OrgUnitStatus::Draft),
            "Active" => Ok(OrgUnitStatus::Active),
            "Archived" => Ok(OrgUnitStatus::Archived),
            other => Err(UniHrError::validation(format!(
                "unknown org unit status: {other}"
            ))),
        }
    }
}

impl fmt::Display for OrgUnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnit {
    pub id: Uuid,
    /// Unique short code (e.g., `KHOA_DUOC`).
    pub code: String,
    pub name: String,
    pub unit_type: OrgUnitType,
    pub status: OrgUnitStatus,
    /// Current parent, projected from the open [`OrgUnitRelation`].
    ///
    /// Only the hierarchy transaction writes this field; it is not part
    /// of any update input.
    ///
    /// [`OrgUnitRelation`]: super::relation::OrgUnitRelation
    pub parent_id: Option<Uuid>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    /// Bumped on every structural write to the row.
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A draft unit created together with its structure request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewDraftUnit {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub unit_type: OrgUnitType,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
}

/// Validate an org unit code: upper-case ASCII letters, digits and `_`.
pub fn validate_code(code: &str) -> Result<(), UniHrError> {
    if code.is_empty() || code.len() > 64 {
        return Err(UniHrError::validation(
            "org unit code must be 1-64 characters",
        ));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(UniHrError::validation(format!(
            "org unit code {code:?} may only contain A-Z, 0-9 and _"
        )));
    }
    Ok(())
}

/// Validate a display name (non-blank, bounded length).
pub fn validate_name(name: &str) -> Result<(), UniHrError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(UniHrError::validation("org unit name must not be blank"));
    }
    if trimmed.chars().count() > 255 {
        return Err(UniHrError::validation(
            "org unit name must be at most 255 characters",
        ));
    }
    Ok(())
}

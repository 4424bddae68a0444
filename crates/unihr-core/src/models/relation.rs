//! Effective-dated parent/child relation between org units.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UniHrError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum RelationType {
    #[default]
    Administrative,
    Academic,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationType::Administrative => "Administrative",
            RelationType::Academic => "Academic",
        }
    }
}

impl FromStr for RelationType {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Administrative" => Ok(RelationType::Administrative),
            "Academic" => Ok(RelationType::Academic),
            other => Err(UniHrError::validation(format!(
                "unknown relation type: {other}"
            ))),
        }
    }
}

/// A time-bounded edge `parent_id -> child_id`.
///
/// The interval is half-open: `[effective_from, effective_to)`. A relation
/// with `effective_to == None` is "open".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgUnitRelation {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub relation_type: RelationType,
    pub effective_from: DateTime<Utc>,
    pub effective_to: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl OrgUnitRelation {
    pub fn is_open(&self) -> bool {
        self.effective_to.is_none()
    }

    /// Whether `at` lies inside `[effective_from, effective_to)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.effective_from <= at && self.effective_to.is_none_or(|to| at < to)
    }

    /// Whether the relation is in effect at any instant at or after `from`.
    pub fn effective_since(&self, from: DateTime<Utc>) -> bool {
        self.effective_to.is_none_or(|to| to > from)
    }

    /// Whether two intervals share at least one instant.
    pub fn overlaps(&self, other: &OrgUnitRelation) -> bool {
        let self_before_other_ends = other.effective_to.is_none_or(|to| self.effective_from < to);
        let other_before_self_ends = self.effective_to.is_none_or(|to| other.effective_from < to);
        self_before_other_ends && other_before_self_ends
    }
}

/// A relation about to be inserted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRelation {
    pub id: Uuid,
    pub parent_id: Uuid,
    pub child_id: Uuid,
    pub relation_type: RelationType,
    pub effective_from: DateTime<Utc>,
    pub note: Option<String>,
}

//! Org structure request: the workflow envelope around a proposed
//! structural change.
//!
//! The payload is a typed, versioned document. It is validated against the
//! request type when it crosses the boundary and again when it is decoded
//! from storage, so the core never threads untyped JSON around.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{UniHrError, UniHrResult};
use crate::models::org_unit::{NewDraftUnit, validate_name};
use crate::models::relation::RelationType;
use crate::models::workflow::{NewApprovalHistory, WorkflowStatus};

/// Current payload document version.
pub const PAYLOAD_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum StructureRequestType {
    CreateUnit,
    RenameUnit,
    MoveUnit,
    ArchiveUnit,
}

impl StructureRequestType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StructureRequestType::CreateUnit => "CreateUnit",
            StructureRequestType::RenameUnit => "RenameUnit",
            StructureRequestType::MoveUnit => "MoveUnit",
            StructureRequestType::ArchiveUnit => "ArchiveUnit",
        }
    }
}

impl FromStr for StructureRequestType {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CreateUnit" => Ok(StructureRequestType::CreateUnit),
            "RenameUnit" => Ok(StructureRequestType::RenameUnit),
            "MoveUnit" => Ok(StructureRequestType::MoveUnit),
            "ArchiveUnit" => Ok(StructureRequestType::ArchiveUnit),
            other => Err(UniHrError::validation(format!(
                "unknown structure request type: {other}"
            ))),
        }
    }
}

/// The intended change, one variant per request type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StructureChange {
    CreateUnit {
        parent_id: Option<Uuid>,
        #[serde(default)]
        relation_type: RelationType,
        /// Defaults to the approval time.
        #[serde(default)]
        effective_from: Option<DateTime<Utc>>,
    },
    RenameUnit {
        new_name: String,
    },
    MoveUnit {
        /// `None` detaches the unit and makes it a root.
        new_parent_id: Option<Uuid>,
        #[serde(default)]
        relation_type: RelationType,
        effective_from: DateTime<Utc>,
    },
    ArchiveUnit {
        #[serde(default)]
        effective_from: Option<DateTime<Utc>>,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl StructureChange {
    pub fn request_type(&self) -> StructureRequestType {
        match self {
            StructureChange::CreateUnit { .. } => StructureRequestType::CreateUnit,
            StructureChange::RenameUnit { .. } => StructureRequestType::RenameUnit,
            StructureChange::MoveUnit { .. } => StructureRequestType::MoveUnit,
            StructureChange::ArchiveUnit { .. } => StructureRequestType::ArchiveUnit,
        }
    }

    /// The unit this change places the target under, if any.
    pub fn destination_parent(&self) -> Option<Uuid> {
        match self {
            StructureChange::CreateUnit { parent_id, .. } => *parent_id,
            StructureChange::MoveUnit { new_parent_id, .. } => *new_parent_id,
            StructureChange::RenameUnit { .. } | StructureChange::ArchiveUnit { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StructurePayload {
    pub schema_version: u32,
    pub change: StructureChange,
    /// Free-form supporting details supplied by the requester. Must be a
    /// JSON object.
    #[serde(default = "empty_object")]
    pub details: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl StructurePayload {
    pub fn new(change: StructureChange, details: Option<serde_json::Value>) -> Self {
        Self {
            schema_version: PAYLOAD_SCHEMA_VERSION,
            change,
            details: details.unwrap_or_else(empty_object),
        }
    }

    pub fn request_type(&self) -> StructureRequestType {
        self.change.request_type()
    }

    /// Check the document against the schema of `request_type`.
    pub fn validate(&self, request_type: StructureRequestType) -> UniHrResult<()> {
        if self.schema_version != PAYLOAD_SCHEMA_VERSION {
            return Err(UniHrError::validation(format!(
                "unsupported payload schema version {} (expected {})",
                self.schema_version, PAYLOAD_SCHEMA_VERSION
            )));
        }
        if self.request_type() != request_type {
            return Err(UniHrError::validation(format!(
                "payload describes {} but request type is {}",
                self.request_type().as_str(),
                request_type.as_str()
            )));
        }
        if !self.details.is_object() {
            return Err(UniHrError::validation(
                "payload details must be a JSON object",
            ));
        }
        if let StructureChange::RenameUnit { new_name } = &self.change {
            validate_name(new_name)?;
        }
        Ok(())
    }

    /// Decode and validate a stored or inbound document.
    pub fn from_document(
        request_type: StructureRequestType,
        document: serde_json::Value,
    ) -> UniHrResult<Self> {
        let payload: StructurePayload = serde_json::from_value(document)
            .map_err(|e| UniHrError::validation(format!("malformed payload: {e}")))?;
        payload.validate(request_type)?;
        Ok(payload)
    }

    pub fn to_document(&self) -> UniHrResult<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| UniHrError::Internal(format!("payload serialization failed: {e}")))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrgStructureRequest {
    pub id: Uuid,
    pub request_type: StructureRequestType,
    pub status: WorkflowStatus,
    pub requester_id: Uuid,
    pub target_org_unit_id: Uuid,
    /// Unit authorizing the change.
    pub owner_org_id: Uuid,
    pub payload: StructurePayload,
    /// Number of accepted transitions; also the optimistic version.
    pub workflow_step: u64,
    pub current_reviewer_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Everything written when a structure request is opened.
#[derive(Debug, Clone)]
pub struct NewStructureRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub target_org_unit_id: Uuid,
    pub owner_org_id: Uuid,
    pub payload: StructurePayload,
    /// Draft unit inserted in the same transaction (create requests only).
    pub draft_unit: Option<NewDraftUnit>,
    /// When set, the request starts `Submitted` and this record is written
    /// as the first history entry.
    pub submission: Option<NewApprovalHistory>,
}

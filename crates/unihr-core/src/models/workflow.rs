//! Approval workflow domain model.
//!
//! Two kinds of entities run through the same state machine:
//! course/program publication items ([`WorkflowItem`]), which are routed
//! across departments by [`WorkflowStage`], and org structure requests,
//! which have no stage.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::UniHrError;

/// The department/body currently responsible for reviewing an item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowStage {
    Faculty,
    AcademicOffice,
    AcademicBoard,
}

impl WorkflowStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStage::Faculty => "Faculty",
            WorkflowStage::AcademicOffice => "AcademicOffice",
            WorkflowStage::AcademicBoard => "AcademicBoard",
        }
    }
}

impl FromStr for WorkflowStage {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Faculty" => Ok(WorkflowStage::Faculty),
            "AcademicOffice" => Ok(WorkflowStage::AcademicOffice),
            "AcademicBoard" => Ok(WorkflowStage::AcademicBoard),
            other => Err(UniHrError::validation(format!(
                "unknown workflow stage: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowStatus {
    Draft,
    Submitted,
    Reviewing,
    Approved,
    Rejected,
    Published,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "Draft",
            WorkflowStatus::Submitted => "Submitted",
            WorkflowStatus::Reviewing => "Reviewing",
            WorkflowStatus::Approved => "Approved",
            WorkflowStatus::Rejected => "Rejected",
            WorkflowStatus::Published => "Published",
        }
    }

    /// Statuses in which a reviewer may act on the entity.
    pub fn in_review(&self) -> bool {
        matches!(self, WorkflowStatus::Submitted | WorkflowStatus::Reviewing)
    }
}

impl FromStr for WorkflowStatus {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(WorkflowStatus::Draft),
            "Submitted" => Ok(WorkflowStatus::Submitted),
            "Reviewing" => Ok(WorkflowStatus::Reviewing),
            "Approved" => Ok(WorkflowStatus::Approved),
            "Rejected" => Ok(WorkflowStatus::Rejected),
            "Published" => Ok(WorkflowStatus::Published),
            other => Err(UniHrError::validation(format!(
                "unknown workflow status: {other}"
            ))),
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowAction {
    Submit,
    StartReview,
    Approve,
    Reject,
    Return,
    Publish,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::Submit => "Submit",
            WorkflowAction::StartReview => "StartReview",
            WorkflowAction::Approve => "Approve",
            WorkflowAction::Reject => "Reject",
            WorkflowAction::Return => "Return",
            WorkflowAction::Publish => "Publish",
        }
    }
}

impl FromStr for WorkflowAction {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Submit" => Ok(WorkflowAction::Submit),
            "StartReview" => Ok(WorkflowAction::StartReview),
            "Approve" => Ok(WorkflowAction::Approve),
            "Reject" => Ok(WorkflowAction::Reject),
            "Return" => Ok(WorkflowAction::Return),
            "Publish" => Ok(WorkflowAction::Publish),
            other => Err(UniHrError::validation(format!(
                "unknown workflow action: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum WorkflowPriority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl WorkflowPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPriority::Low => "Low",
            WorkflowPriority::Normal => "Normal",
            WorkflowPriority::High => "High",
            WorkflowPriority::Urgent => "Urgent",
        }
    }
}

impl FromStr for WorkflowPriority {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(WorkflowPriority::Low),
            "Normal" => Ok(WorkflowPriority::Normal),
            "High" => Ok(WorkflowPriority::High),
            "Urgent" => Ok(WorkflowPriority::Urgent),
            other => Err(UniHrError::validation(format!(
                "unknown workflow priority: {other}"
            ))),
        }
    }
}

/// What a workflow instance is about.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowSubject {
    Course,
    Program,
    OrgStructure,
}

impl WorkflowSubject {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowSubject::Course => "Course",
            WorkflowSubject::Program => "Program",
            WorkflowSubject::OrgStructure => "OrgStructure",
        }
    }

    pub fn kind(&self) -> WorkflowKind {
        match self {
            WorkflowSubject::Course | WorkflowSubject::Program => WorkflowKind::Publication,
            WorkflowSubject::OrgStructure => WorkflowKind::OrgStructure,
        }
    }

    /// Prefix of the permission strings guarding this subject's actions.
    pub fn permission_prefix(&self) -> &'static str {
        match self {
            WorkflowSubject::Course => "course",
            WorkflowSubject::Program => "program",
            WorkflowSubject::OrgStructure => "org_structure",
        }
    }
}

impl FromStr for WorkflowSubject {
    type Err = UniHrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Course" => Ok(WorkflowSubject::Course),
            "Program" => Ok(WorkflowSubject::Program),
            "OrgStructure" => Ok(WorkflowSubject::OrgStructure),
            other => Err(UniHrError::validation(format!(
                "unknown workflow subject: {other}"
            ))),
        }
    }
}

/// The transition table a workflow instance follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowKind {
    /// Multi-department routing: Faculty -> AcademicOffice -> AcademicBoard.
    Publication,
    /// Single approval step, no stage.
    OrgStructure,
}

/// `(stage, status)` pair; `stage` is `None` for org structure requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct WorkflowState {
    pub stage: Option<WorkflowStage>,
    pub status: WorkflowStatus,
}

impl WorkflowState {
    pub fn staged(stage: WorkflowStage, status: WorkflowStatus) -> Self {
        Self {
            stage: Some(stage),
            status,
        }
    }

    pub fn unstaged(status: WorkflowStatus) -> Self {
        Self {
            stage: None,
            status,
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{{{}, {}}}", stage.as_str(), self.status),
            None => write!(f, "{{{}}}", self.status),
        }
    }
}

/// Reference to a workflow instance.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum WorkflowTarget {
    Item(Uuid),
    StructureRequest(Uuid),
}

impl WorkflowTarget {
    pub fn id(&self) -> Uuid {
        match self {
            WorkflowTarget::Item(id) | WorkflowTarget::StructureRequest(id) => *id,
        }
    }

    /// Backing table name.
    pub fn table(&self) -> &'static str {
        match self {
            WorkflowTarget::Item(_) => "workflow_item",
            WorkflowTarget::StructureRequest(_) => "org_structure_request",
        }
    }
}

/// Course/program publication workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowItem {
    pub id: Uuid,
    pub subject: WorkflowSubject,
    /// Id of the course or program row (owned by external CRUD).
    pub subject_id: Uuid,
    pub title: String,
    /// Org unit that owns the course/program.
    pub owner_org_id: Uuid,
    pub requester_id: Uuid,
    pub stage: WorkflowStage,
    pub status: WorkflowStatus,
    pub current_reviewer_id: Option<Uuid>,
    pub priority: WorkflowPriority,
    pub notes: Option<String>,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkflowItem {
    pub subject: WorkflowSubject,
    pub subject_id: Uuid,
    pub title: String,
    pub owner_org_id: Uuid,
    pub requester_id: Uuid,
    pub priority: WorkflowPriority,
    pub notes: Option<String>,
}

/// The workflow-relevant view of any workflow instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSnapshot {
    pub target: WorkflowTarget,
    pub subject: WorkflowSubject,
    pub state: WorkflowState,
    pub version: u64,
    pub owner_org_id: Uuid,
    pub requester_id: Uuid,
    pub current_reviewer_id: Option<Uuid>,
}

/// One accepted transition. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowApprovalHistory {
    pub id: Uuid,
    pub target: WorkflowTarget,
    /// 1-based position in the target's history.
    pub sequence: u64,
    pub action: WorkflowAction,
    pub reviewer_id: Uuid,
    /// Permission under which the reviewer acted.
    pub reviewer_role: String,
    pub comments: Option<String>,
    pub from_stage: Option<WorkflowStage>,
    pub to_stage: Option<WorkflowStage>,
    pub from_status: WorkflowStatus,
    pub to_status: WorkflowStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApprovalHistory {
    pub sequence: u64,
    pub action: WorkflowAction,
    pub reviewer_id: Uuid,
    pub reviewer_role: String,
    pub comments: Option<String>,
    pub from: WorkflowState,
    pub to: WorkflowState,
}

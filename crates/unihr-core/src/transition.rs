//! Legal-transition table for the approval workflow.
//!
//! | Stage           | Action       | Precondition          | New stage       | New status |
//! |-----------------|--------------|-----------------------|-----------------|------------|
//! | Faculty         | submit       | Draft, or returned    | AcademicOffice  | Submitted  |
//! | AcademicOffice/Board | start_review | Submitted        | unchanged       | Reviewing  |
//! | AcademicOffice  | approve      | Submitted/Reviewing   | AcademicBoard   | unchanged  |
//! | AcademicBoard   | approve      | Submitted/Reviewing   | unchanged       | Approved   |
//! | any             | reject       | Submitted/Reviewing   | Faculty         | Rejected   |
//! | AcademicOffice  | return       | Submitted/Reviewing   | Faculty         | unchanged  |
//! | AcademicBoard   | return       | Submitted/Reviewing   | AcademicOffice  | unchanged  |
//! | any             | publish      | Approved              | unchanged       | Published  |
//!
//! Org structure requests use the stageless restriction
//! `Draft -> Submitted -> (Reviewing) -> Approved | Rejected`.

use crate::error::{UniHrError, UniHrResult};
use crate::models::workflow::{
    WorkflowAction, WorkflowApprovalHistory, WorkflowKind, WorkflowStage, WorkflowState,
    WorkflowSubject,
};
use crate::models::workflow::WorkflowStage::{AcademicBoard, AcademicOffice, Faculty};
use crate::models::workflow::WorkflowStatus::{
    Approved, Draft, Published, Rejected, Reviewing, Submitted,
};

/// Initial state of a new workflow instance.
pub fn initial_state(kind: WorkflowKind) -> WorkflowState {
    match kind {
        WorkflowKind::Publication => WorkflowState::staged(Faculty, Draft),
        WorkflowKind::OrgStructure => WorkflowState::unstaged(Draft),
    }
}

/// Look up the state reached by `action`, or `None` if the action is not
/// legal in `current`.
pub fn next_state(
    kind: WorkflowKind,
    current: WorkflowState,
    action: WorkflowAction,
) -> Option<WorkflowState> {
    match kind {
        WorkflowKind::Publication => publication(current, action),
        WorkflowKind::OrgStructure => org_structure(current, action),
    }
}

fn publication(current: WorkflowState, action: WorkflowAction) -> Option<WorkflowState> {
    let stage = current.stage?;
    let status = current.status;
    let staged = WorkflowState::staged;

    match (action, stage, status) {
        (WorkflowAction::Submit, Faculty, Draft) => Some(staged(AcademicOffice, Submitted)),
        // A returned item goes back to the academic office.
        (WorkflowAction::Submit, Faculty, Submitted | Reviewing) => {
            Some(staged(AcademicOffice, Submitted))
        }
        (WorkflowAction::StartReview, AcademicOffice | AcademicBoard, Submitted) => {
            Some(staged(stage, Reviewing))
        }
        (WorkflowAction::Approve, AcademicOffice, Submitted | Reviewing) => {
            Some(staged(AcademicBoard, status))
        }
        (WorkflowAction::Approve, AcademicBoard, Submitted | Reviewing) => {
            Some(staged(AcademicBoard, Approved))
        }
        (WorkflowAction::Reject, _, Submitted | Reviewing) => Some(staged(Faculty, Rejected)),
        (WorkflowAction::Return, AcademicOffice, Submitted | Reviewing) => {
            Some(staged(Faculty, status))
        }
        (WorkflowAction::Return, AcademicBoard, Submitted | Reviewing) => {
            Some(staged(AcademicOffice, status))
        }
        (WorkflowAction::Publish, _, Approved) => Some(staged(stage, Published)),
        _ => None,
    }
}

fn org_structure(current: WorkflowState, action: WorkflowAction) -> Option<WorkflowState> {
    if current.stage.is_some() {
        return None;
    }
    let unstaged = WorkflowState::unstaged;

    match (action, current.status) {
        (WorkflowAction::Submit, Draft) => Some(unstaged(Submitted)),
        (WorkflowAction::StartReview, Submitted) => Some(unstaged(Reviewing)),
        (WorkflowAction::Approve, Submitted | Reviewing) => Some(unstaged(Approved)),
        (WorkflowAction::Reject, Submitted | Reviewing) => Some(unstaged(Rejected)),
        _ => None,
    }
}

/// Permission an actor must hold to perform `action` on a `subject`
/// instance currently at `stage`.
pub fn required_permission(
    subject: WorkflowSubject,
    stage: Option<WorkflowStage>,
    action: WorkflowAction,
) -> String {
    let prefix = subject.permission_prefix();

    if subject.kind() == WorkflowKind::OrgStructure {
        return match action {
            WorkflowAction::Submit => format!("{prefix}.submit"),
            _ => format!("{prefix}.approve"),
        };
    }

    match action {
        WorkflowAction::Submit => format!("{prefix}.submit"),
        WorkflowAction::Publish => format!("{prefix}.publish"),
        WorkflowAction::StartReview
        | WorkflowAction::Approve
        | WorkflowAction::Reject
        | WorkflowAction::Return => match stage {
            Some(AcademicOffice) => format!("{prefix}.review.academic_office"),
            Some(AcademicBoard) => format!("{prefix}.review.academic_board"),
            Some(Faculty) | None => format!("{prefix}.review.faculty"),
        },
    }
}

/// Verify the audit chain of one workflow instance.
///
/// Records must be numbered `1..=n`, each record must start where the
/// previous one ended, and the last record must end in `current` (or the
/// chain must be empty and `current` the initial state).
pub fn verify_chain(
    kind: WorkflowKind,
    history: &[WorkflowApprovalHistory],
    current: WorkflowState,
) -> UniHrResult<()> {
    let mut expected_from = initial_state(kind);

    for (index, record) in history.iter().enumerate() {
        let expected_sequence = index as u64 + 1;
        if record.sequence != expected_sequence {
            return Err(UniHrError::StructuralIntegrity(format!(
                "history record {} has sequence {} (expected {expected_sequence})",
                record.id, record.sequence
            )));
        }
        let from = WorkflowState {
            stage: record.from_stage,
            status: record.from_status,
        };
        if from != expected_from {
            return Err(UniHrError::StructuralIntegrity(format!(
                "history record {} starts at {from} but previous state was {expected_from}",
                record.id
            )));
        }
        expected_from = WorkflowState {
            stage: record.to_stage,
            status: record.to_status,
        };
    }

    if expected_from != current {
        return Err(UniHrError::StructuralIntegrity(format!(
            "entity is at {current} but its history ends at {expected_from}"
        )));
    }

    Ok(())
}

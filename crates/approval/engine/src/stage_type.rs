//! Stage type registry
//!
//! The four stage types are fixed. Each maps to a descriptor of its
//! capabilities and to exactly one state manager implementation.

use crate::state_manager::{
    ApprovalsStateManager, FinishedStateManager, FormSubmissionStateManager, StateManager,
    WaitingStateManager,
};
use approval_types::{ApprovalResult, StageType, WorkflowStage, WorkflowVersion};

/// Static capabilities of a stage type
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageTypeDescriptor {
    pub stage_type: StageType,
    /// Noun phrase used in messages, e.g. "an approval stage"
    pub display_name: &'static str,
    /// Whether a new application may be created on this stage
    pub can_start_application: bool,
    pub has_approval_levels: bool,
    /// Whether an application on this stage is done
    pub is_terminal: bool,
}

static REGISTRY: [StageTypeDescriptor; 4] = [
    StageTypeDescriptor {
        stage_type: StageType::FormSubmission,
        display_name: "a form submission stage",
        can_start_application: true,
        has_approval_levels: false,
        is_terminal: false,
    },
    StageTypeDescriptor {
        stage_type: StageType::Approvals,
        display_name: "an approval stage",
        can_start_application: false,
        has_approval_levels: true,
        is_terminal: false,
    },
    StageTypeDescriptor {
        stage_type: StageType::Waiting,
        display_name: "a waiting stage",
        can_start_application: false,
        has_approval_levels: false,
        is_terminal: false,
    },
    StageTypeDescriptor {
        stage_type: StageType::Finished,
        display_name: "a finished stage",
        can_start_application: false,
        has_approval_levels: false,
        is_terminal: true,
    },
];

/// Every registered stage type
pub fn registry() -> &'static [StageTypeDescriptor] {
    &REGISTRY
}

pub fn descriptor(stage_type: StageType) -> &'static StageTypeDescriptor {
    match stage_type {
        StageType::FormSubmission => &REGISTRY[0],
        StageType::Approvals => &REGISTRY[1],
        StageType::Waiting => &REGISTRY[2],
        StageType::Finished => &REGISTRY[3],
    }
}

/// The state manager responsible for `stage`
pub fn state_manager<'w>(
    version: &'w WorkflowVersion,
    stage: &'w WorkflowStage,
) -> ApprovalResult<Box<dyn StateManager + 'w>> {
    Ok(match stage.stage_type {
        StageType::FormSubmission => Box::new(FormSubmissionStateManager::new(version, stage)?),
        StageType::Approvals => Box::new(ApprovalsStateManager::new(version, stage)?),
        StageType::Waiting => Box::new(WaitingStateManager::new(version, stage)?),
        StageType::Finished => Box::new(FinishedStateManager::new(version, stage)?),
    })
}

//! Application state: a position within a workflow version

use crate::{
    ApprovalError, ApprovalLevel, ApprovalLevelId, ApprovalResult, StageId, StageType,
    WorkflowStage, WorkflowVersion,
};
use serde::{Deserialize, Serialize};

/// Where an application currently sits.
///
/// Building a state never touches the workflow definition. Only the
/// resolving accessors (`stage`, `approval_level`, `is_stage_type`) look
/// their references up, and they fail if the reference is unknown.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationState {
    stage_id: StageId,
    is_draft: bool,
    approval_level_id: Option<ApprovalLevelId>,
}

impl ApplicationState {
    pub fn new(stage_id: StageId, is_draft: bool, approval_level_id: Option<ApprovalLevelId>) -> Self {
        Self {
            stage_id,
            is_draft,
            approval_level_id,
        }
    }

    /// Non-draft state on a stage with no approval level
    pub fn on_stage(stage_id: StageId) -> Self {
        Self::new(stage_id, false, None)
    }

    pub fn stage_id(&self) -> &StageId {
        &self.stage_id
    }

    pub fn is_draft(&self) -> bool {
        self.is_draft
    }

    pub fn approval_level_id(&self) -> Option<&ApprovalLevelId> {
        self.approval_level_id.as_ref()
    }

    pub fn stage<'v>(&self, version: &'v WorkflowVersion) -> ApprovalResult<&'v WorkflowStage> {
        version.stage(&self.stage_id)
    }

    /// Resolve the approval level, if the state carries one
    pub fn approval_level<'v>(
        &self,
        version: &'v WorkflowVersion,
    ) -> ApprovalResult<Option<&'v ApprovalLevel>> {
        match &self.approval_level_id {
            None => Ok(None),
            Some(id) => version
                .stage(&self.stage_id)?
                .approval_level(id)
                .map(Some)
                .ok_or_else(|| ApprovalError::ApprovalLevelNotFound(id.clone())),
        }
    }

    pub fn is_stage_type(
        &self,
        version: &WorkflowVersion,
        stage_type: StageType,
    ) -> ApprovalResult<bool> {
        Ok(self.stage(version)?.stage_type == stage_type)
    }

    /// True when all three fields match
    pub fn is_same_as(&self, other: &ApplicationState) -> bool {
        self.stage_id == other.stage_id
            && self.is_draft == other.is_draft
            && self.approval_level_id == other.approval_level_id
    }

    pub fn phase(&self, version: &WorkflowVersion) -> ApprovalResult<ApplicationPhase> {
        Ok(match self.stage(version)?.stage_type {
            StageType::FormSubmission => ApplicationPhase::BeforeSubmission,
            StageType::Approvals => ApplicationPhase::InApprovals,
            StageType::Waiting => ApplicationPhase::Waiting,
            StageType::Finished => ApplicationPhase::Finished,
        })
    }
}

impl std::fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stage={}", self.stage_id)?;
        if self.is_draft {
            write!(f, " draft")?;
        }
        if let Some(level) = &self.approval_level_id {
            write!(f, " level={}", level)?;
        }
        Ok(())
    }
}

/// Logical phase derived from a state and the type of its stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationPhase {
    BeforeSubmission,
    InApprovals,
    Waiting,
    Finished,
}

//! Approval level ladder: ordered levels inside an approvals stage

use approval_types::{
    ApprovalError, ApprovalLevel, ApprovalLevelId, ApprovalResult, StageType, WorkflowStage,
};

/// Read-only view of the levels of one approvals stage, ordered by priority
#[derive(Clone, Copy, Debug)]
pub struct ApprovalLevelLadder<'w> {
    stage: &'w WorkflowStage,
}

impl<'w> ApprovalLevelLadder<'w> {
    pub fn for_stage(stage: &'w WorkflowStage) -> ApprovalResult<Self> {
        if stage.stage_type != StageType::Approvals {
            return Err(ApprovalError::coding(format!(
                "Stage '{}' is not an approvals stage",
                stage.name
            )));
        }
        Ok(Self { stage })
    }

    pub fn stage(&self) -> &'w WorkflowStage {
        self.stage
    }

    pub fn levels(&self) -> &'w [ApprovalLevel] {
        &self.stage.approval_levels
    }

    pub fn len(&self) -> usize {
        self.stage.approval_levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stage.approval_levels.is_empty()
    }

    /// The level entered first
    pub fn first(&self) -> ApprovalResult<&'w ApprovalLevel> {
        self.stage.approval_levels.first().ok_or_else(|| self.no_levels())
    }

    pub fn last(&self) -> ApprovalResult<&'w ApprovalLevel> {
        self.stage.approval_levels.last().ok_or_else(|| self.no_levels())
    }

    fn no_levels(&self) -> ApprovalError {
        ApprovalError::model(format!(
            "Approvals stage '{}' has no approval levels",
            self.stage.name
        ))
    }

    fn position(&self, id: &ApprovalLevelId) -> ApprovalResult<usize> {
        self.stage
            .approval_levels
            .iter()
            .position(|l| &l.id == id)
            .ok_or_else(|| ApprovalError::ApprovalLevelNotFound(id.clone()))
    }

    /// The level with the next-higher priority, or `None` after the last
    pub fn next(&self, id: &ApprovalLevelId) -> ApprovalResult<Option<&'w ApprovalLevel>> {
        let pos = self.position(id)?;
        let next = self.stage.approval_levels.get(pos + 1);
        tracing::trace!(
            stage_id = %self.stage.id,
            level_id = %id,
            has_next = next.is_some(),
            "Next approval level lookup"
        );
        Ok(next)
    }

    /// The level with the next-lower priority, or `None` before the first
    pub fn previous(&self, id: &ApprovalLevelId) -> ApprovalResult<Option<&'w ApprovalLevel>> {
        let pos = self.position(id)?;
        let previous = pos
            .checked_sub(1)
            .and_then(|p| self.stage.approval_levels.get(p));
        tracing::trace!(
            stage_id = %self.stage.id,
            level_id = %id,
            has_previous = previous.is_some(),
            "Previous approval level lookup"
        );
        Ok(previous)
    }

    pub fn is_last(&self, id: &ApprovalLevelId) -> ApprovalResult<bool> {
        Ok(self.next(id)?.is_none())
    }
}

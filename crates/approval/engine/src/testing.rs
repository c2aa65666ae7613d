//! Workflow fixtures shared by unit and scenario tests

use approval_types::{
    Application, ApplicationState, ApprovalLevelId, ApprovalResult, StageId, StageType, UserId,
    WorkflowVersion,
};

/// The canonical `[form_submission, approvals(levels…), finished]` workflow
#[derive(Clone, Debug)]
pub struct WorkflowFixture {
    pub version: WorkflowVersion,
    pub form: StageId,
    pub approvals: StageId,
    /// Approval levels of the approvals stage, in priority order
    pub levels: Vec<ApprovalLevelId>,
    pub finished: StageId,
}

/// Build an active workflow version from `(name, type, approval levels)`
/// triples. The level count is ignored for non-approvals stages.
pub fn build_workflow(name: &str, stages: &[(&str, StageType, usize)]) -> ApprovalResult<WorkflowVersion> {
    let mut version = WorkflowVersion::new(name);
    for (stage_name, stage_type, levels) in stages {
        let stage_id = version.add_stage(*stage_name, *stage_type)?;
        if *stage_type == StageType::Approvals {
            for n in 2..=*levels {
                version.add_approval_level(&stage_id, format!("Level {}", n))?;
            }
        }
    }
    version.activate()?;
    Ok(version)
}

pub fn workflow_with_levels(levels: usize) -> ApprovalResult<WorkflowFixture> {
    let version = build_workflow(
        "Leave request",
        &[
            ("Request", StageType::FormSubmission, 0),
            ("Review", StageType::Approvals, levels),
            ("Done", StageType::Finished, 0),
        ],
    )?;
    let ids: Vec<StageId> = version.stages.iter().map(|s| s.id.clone()).collect();
    let levels = version.stages[1]
        .approval_levels
        .iter()
        .map(|l| l.id.clone())
        .collect();
    Ok(WorkflowFixture {
        form: ids[0].clone(),
        approvals: ids[1].clone(),
        finished: ids[2].clone(),
        levels,
        version,
    })
}

pub fn two_level_workflow() -> ApprovalResult<WorkflowFixture> {
    workflow_with_levels(2)
}

/// A draft application sitting on the fixture's form stage, not yet stored
pub fn draft_application(fixture: &WorkflowFixture) -> Application {
    Application::new(
        fixture.version.id.clone(),
        UserId::new("applicant"),
        UserId::new("applicant"),
        ApplicationState::new(fixture.form.clone(), true, None),
    )
}

//! Overall progress derived from state and the action log

use approval_types::{
    ActionCode, Application, ApplicationAction, ApprovalResult, OverallProgress, StageType,
    WorkflowVersion,
};

/// The latest decision still in force, by storage sequence
pub fn last_effective_action(actions: &[ApplicationAction]) -> Option<&ApplicationAction> {
    actions
        .iter()
        .filter(|a| !a.superseded)
        .max_by_key(|a| a.sequence)
}

/// Summarise where an application stands.
///
/// A standing reject or withdrawal decides first, then the draft flag,
/// then whether the application sits on a finished stage.
pub fn overall_progress(
    version: &WorkflowVersion,
    application: &Application,
    actions: &[ApplicationAction],
) -> ApprovalResult<OverallProgress> {
    let progress = match last_effective_action(actions).map(|a| a.code) {
        Some(ActionCode::Reject) => OverallProgress::Rejected,
        Some(code) if code.is_withdrawal() => OverallProgress::Withdrawn,
        _ if application.is_draft() => OverallProgress::Draft,
        _ if application
            .current_state
            .is_stage_type(version, StageType::Finished)? =>
        {
            OverallProgress::Finished
        }
        _ => OverallProgress::InProgress,
    };
    Ok(progress)
}

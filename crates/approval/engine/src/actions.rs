//! The six actions a user can perform on an application
//!
//! An action checks its precondition against the application's current
//! state, writes its audit records into the journal, then drives the
//! state change. Everything lands in storage together when the journal
//! commits.

use crate::action_log;
use crate::activity_log;
use crate::config::ReturnStageRule;
use crate::journal::TransitionJournal;
use crate::stage_type::state_manager;
use approval_types::{
    ActionCode, ActivityType, ApplicationState, ApprovalError, ApprovalResult, StageType, UserId,
    WorkflowStage,
};

/// A user decision that moves an application through its workflow
pub trait Action: Sync {
    fn code(&self) -> ActionCode;

    /// Fails with a coding error when the application's state does not
    /// allow this action
    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()>;

    /// Record and transition. Only called once preconditions hold.
    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()>;

    fn is_available(&self, journal: &TransitionJournal<'_>) -> bool {
        self.check_preconditions(journal).is_ok()
    }

    fn execute(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        self.check_preconditions(journal)?;
        tracing::debug!(
            application_id = %journal.application().id,
            action = %self.code(),
            user_id = %user_id,
            "Executing action"
        );
        self.perform(journal, user_id)
    }
}

pub struct Approve;
pub struct WithdrawInApprovals;
pub struct WithdrawBeforeSubmission;
pub struct Submit;
pub struct Reject;
pub struct ResetApprovals;

/// The implementation behind an action code
pub fn action(code: ActionCode) -> &'static dyn Action {
    match code {
        ActionCode::Approve => &Approve,
        ActionCode::WithdrawInApprovals => &WithdrawInApprovals,
        ActionCode::WithdrawBeforeSubmission => &WithdrawBeforeSubmission,
        ActionCode::Submit => &Submit,
        ActionCode::Reject => &Reject,
        ActionCode::ResetApprovals => &ResetApprovals,
    }
}

/// Look an action up by its enum name, e.g. `"APPROVE"`
pub fn action_by_enum(name: &str) -> ApprovalResult<&'static dyn Action> {
    ActionCode::from_enum(name)
        .map(action)
        .ok_or_else(|| ApprovalError::coding(format!("Unknown action '{}'", name)))
}

// ── Preconditions ────────────────────────────────────────────────────

fn is_before_submission(journal: &TransitionJournal<'_>) -> ApprovalResult<bool> {
    journal
        .current_state()
        .is_stage_type(journal.version(), StageType::FormSubmission)
}

fn is_in_approvals(journal: &TransitionJournal<'_>) -> ApprovalResult<bool> {
    let state = journal.current_state();
    Ok(!state.is_draft() && state.is_stage_type(journal.version(), StageType::Approvals)?)
}

fn require(condition: bool, message: &str) -> ApprovalResult<()> {
    if condition {
        Ok(())
    } else {
        Err(ApprovalError::coding(message))
    }
}

// ── Shared steps ─────────────────────────────────────────────────────

/// The stage that reject and withdraw-in-approvals send an application to
fn return_stage<'w>(journal: &TransitionJournal<'w>) -> ApprovalResult<&'w WorkflowStage> {
    let version = journal.version();
    let stage = match journal.config().return_stage {
        ReturnStageRule::FirstStage => version.first_stage(),
        ReturnStageRule::FirstFormSubmission => {
            version.stages_of_type(StageType::FormSubmission).next()
        }
    };
    stage.ok_or_else(|| ApprovalError::coding("Workflow version has no stage to return to"))
}

fn return_state(journal: &TransitionJournal<'_>) -> ApprovalResult<ApplicationState> {
    let stage = return_stage(journal)?;
    state_manager(journal.version(), stage)?.initial_state()
}

fn next_state(journal: &TransitionJournal<'_>) -> ApprovalResult<ApplicationState> {
    let current = journal.current_state();
    let stage = current.stage(journal.version())?;
    state_manager(journal.version(), stage)?.next_state(current)
}

// ── Actions ──────────────────────────────────────────────────────────

impl Action for Submit {
    fn code(&self) -> ActionCode {
        ActionCode::Submit
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_before_submission(journal)?,
            "Cannot submit application because the state is not before submission",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let next = next_state(journal)?;

        action_log::create(journal, user_id, ActionCode::Submit)?;
        if !journal.application().is_submitted() {
            journal.application_mut().mark_submitted(user_id)?;
        }
        activity_log::create_empty(journal, Some(user_id), ActivityType::StageSubmitted)?;

        // A resubmission starts a fresh decision round
        let submitted_stage = journal.current_state().stage_id().clone();
        action_log::supersede_actions_ahead_of(journal, &submitted_stage)?;
        journal.change_state(next, Some(user_id))
    }
}

impl Action for Approve {
    fn code(&self) -> ActionCode {
        ActionCode::Approve
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_in_approvals(journal)?,
            "Cannot approve application because the state is not in approvals",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let next = next_state(journal)?;

        action_log::create(journal, user_id, ActionCode::Approve)?;
        activity_log::create_empty(journal, Some(user_id), ActivityType::LevelApproved)?;
        if next.stage_id() != journal.current_state().stage_id() {
            activity_log::create_empty(journal, Some(user_id), ActivityType::StageAllApproved)?;
        }
        journal.change_state(next, Some(user_id))
    }
}

impl Action for Reject {
    fn code(&self) -> ActionCode {
        ActionCode::Reject
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_in_approvals(journal)?,
            "Cannot reject application because the state is not in approvals",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let destination = return_state(journal)?;

        if journal.config().supersede_on_reject {
            let stage_id = journal.current_state().stage_id().clone();
            action_log::supersede_actions_for_stage(journal, &stage_id)?;
        }
        action_log::create(journal, user_id, ActionCode::Reject)?;
        activity_log::create_empty(journal, Some(user_id), ActivityType::LevelRejected)?;
        journal.change_state(destination, Some(user_id))
    }
}

impl Action for WithdrawBeforeSubmission {
    fn code(&self) -> ActionCode {
        ActionCode::WithdrawBeforeSubmission
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_before_submission(journal)?,
            "Cannot withdraw application because the state is not before submission",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let stage = journal.current_state().stage(journal.version())?;
        let destination = state_manager(journal.version(), stage)?.initial_state()?;

        action_log::create(journal, user_id, ActionCode::WithdrawBeforeSubmission)?;
        activity_log::create_empty(journal, Some(user_id), ActivityType::Withdrawn)?;
        journal.change_state(destination, Some(user_id))
    }
}

impl Action for WithdrawInApprovals {
    fn code(&self) -> ActionCode {
        ActionCode::WithdrawInApprovals
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_in_approvals(journal)?,
            "Cannot withdraw application because the state is not in approvals",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let destination = return_state(journal)?;

        activity_log::create_empty(journal, Some(user_id), ActivityType::Withdrawn)?;
        action_log::create(journal, user_id, ActionCode::WithdrawInApprovals)?;
        journal.change_state(destination, Some(user_id))
    }
}

impl Action for ResetApprovals {
    fn code(&self) -> ActionCode {
        ActionCode::ResetApprovals
    }

    fn check_preconditions(&self, journal: &TransitionJournal<'_>) -> ApprovalResult<()> {
        require(
            is_in_approvals(journal)?,
            "Cannot reset approvals when not in approvals",
        )
    }

    fn perform(&self, journal: &mut TransitionJournal<'_>, user_id: &UserId) -> ApprovalResult<()> {
        let stage = journal.current_state().stage(journal.version())?;
        let stage_id = stage.id.clone();
        let first_level = state_manager(journal.version(), stage)?.initial_state()?;

        action_log::supersede_actions_for_stage(journal, &stage_id)?;
        action_log::create(journal, user_id, ActionCode::ResetApprovals)?;
        activity_log::create_empty(journal, Some(user_id), ActivityType::ApprovalsReset)?;
        journal.change_state(first_level, Some(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::{draft_application, two_level_workflow, workflow_with_levels, WorkflowFixture};
    use approval_types::Application;

    fn at(fixture: &WorkflowFixture, state: ApplicationState) -> Application {
        let mut app = draft_application(fixture);
        app.current_state = state;
        app
    }

    fn at_level(fixture: &WorkflowFixture, level: usize) -> Application {
        at(
            fixture,
            ApplicationState::new(
                fixture.approvals.clone(),
                false,
                Some(fixture.levels[level].clone()),
            ),
        )
    }

    fn activities(journal: &TransitionJournal<'_>) -> Vec<ActivityType> {
        journal.activities().iter().map(|a| a.activity_type).collect()
    }

    fn boss() -> UserId {
        UserId::new("boss")
    }

    #[test]
    fn test_lookup_by_code_and_enum() {
        for code in ActionCode::ALL {
            assert_eq!(action(code).code(), code);
            assert_eq!(action_by_enum(code.enum_name()).unwrap().code(), code);
        }
        assert!(action_by_enum("PROMOTE").is_err_and(|e| e.is_coding_error()));
    }

    #[test]
    fn test_submit_from_draft() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));
        let applicant = UserId::new("applicant");

        action(ActionCode::Submit).execute(&mut journal, &applicant).unwrap();

        let app = journal.application();
        assert!(app.is_submitted());
        assert_eq!(app.submitter_id, Some(applicant));
        assert_eq!(app.current_state.approval_level_id(), Some(&fixture.levels[0]));
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::StageSubmitted,
                ActivityType::StageEnded,
                ActivityType::StageStarted,
                ActivityType::LevelStarted,
            ]
        );
        assert_eq!(journal.actions().len(), 1);
        assert_eq!(journal.supersessions().len(), 1);
    }

    #[test]
    fn test_submit_keeps_first_submission() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut app = at(&fixture, ApplicationState::on_stage(fixture.form.clone()));
        app.mark_submitted(&UserId::new("first")).unwrap();
        let submitted = app.submitted;
        let mut journal = TransitionJournal::new(&fixture.version, &config, app);

        action(ActionCode::Submit)
            .execute(&mut journal, &UserId::new("second"))
            .unwrap();
        assert_eq!(journal.application().submitted, submitted);
        assert_eq!(journal.application().submitter_id, Some(UserId::new("first")));
    }

    #[test]
    fn test_approve_walks_levels() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();

        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        action(ActionCode::Approve).execute(&mut journal, &boss()).unwrap();
        assert_eq!(
            journal.current_state().approval_level_id(),
            Some(&fixture.levels[1])
        );
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::LevelApproved,
                ActivityType::LevelEnded,
                ActivityType::LevelStarted,
            ]
        );

        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 1));
        action(ActionCode::Approve).execute(&mut journal, &boss()).unwrap();
        assert_eq!(journal.current_state().stage_id(), &fixture.finished);
        assert!(journal.application().is_completed());
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::LevelApproved,
                ActivityType::StageAllApproved,
                ActivityType::LevelEnded,
                ActivityType::StageEnded,
                ActivityType::Finished,
            ]
        );
        assert_eq!(
            journal.activities()[1].approval_level_id,
            Some(fixture.levels[1].clone())
        );
    }

    fn refusal(code: ActionCode, journal: &TransitionJournal<'_>) -> ApprovalError {
        action(code).check_preconditions(journal).unwrap_err()
    }

    #[test]
    fn test_preconditions() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));

        let cases = [
            (
                ActionCode::Approve,
                "Cannot approve application because the state is not in approvals",
            ),
            (
                ActionCode::Reject,
                "Cannot reject application because the state is not in approvals",
            ),
            (
                ActionCode::WithdrawInApprovals,
                "Cannot withdraw application because the state is not in approvals",
            ),
            (
                ActionCode::ResetApprovals,
                "Cannot reset approvals when not in approvals",
            ),
        ];
        for (code, message) in cases {
            assert_eq!(refusal(code, &journal), ApprovalError::coding(message));
        }
        assert!(action(ActionCode::Submit).is_available(&journal));
        assert!(action(ActionCode::WithdrawBeforeSubmission).is_available(&journal));

        let journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        assert_eq!(
            refusal(ActionCode::Submit, &journal),
            ApprovalError::coding(
                "Cannot submit application because the state is not before submission"
            )
        );
        assert_eq!(
            refusal(ActionCode::WithdrawBeforeSubmission, &journal),
            ApprovalError::coding(
                "Cannot withdraw application because the state is not before submission"
            )
        );
    }

    #[test]
    fn test_reject_returns_to_first_stage() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 1));

        action(ActionCode::Reject).execute(&mut journal, &boss()).unwrap();
        let state = journal.current_state();
        assert_eq!(state.stage_id(), &fixture.form);
        assert!(!state.is_draft());
        assert!(state.approval_level_id().is_none());
        assert_eq!(journal.actions()[0].code, ActionCode::Reject);
        assert_eq!(
            journal.actions()[0].approval_level_id,
            Some(fixture.levels[1].clone())
        );
        assert!(journal.supersessions().is_empty());
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::LevelRejected,
                ActivityType::LevelEnded,
                ActivityType::StageEnded,
                ActivityType::StageStarted,
            ]
        );
    }

    #[test]
    fn test_reject_can_supersede() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig {
            supersede_on_reject: true,
            ..EngineConfig::default()
        };
        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        action(ActionCode::Reject).execute(&mut journal, &boss()).unwrap();
        assert_eq!(journal.supersessions()[0].approval_level_ids, fixture.levels);
    }

    #[test]
    fn test_withdrawals() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();

        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        action(ActionCode::WithdrawInApprovals)
            .execute(&mut journal, &UserId::new("applicant"))
            .unwrap();
        assert_eq!(journal.current_state().stage_id(), &fixture.form);
        assert_eq!(activities(&journal)[0], ActivityType::Withdrawn);
        assert_eq!(
            journal.activities()[0].approval_level_id,
            Some(fixture.levels[0].clone())
        );

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));
        action(ActionCode::WithdrawBeforeSubmission)
            .execute(&mut journal, &UserId::new("applicant"))
            .unwrap();
        let state = journal.current_state();
        assert_eq!(state.stage_id(), &fixture.form);
        assert!(!state.is_draft());
        assert!(journal.actions()[0].approval_level_id.is_none());
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::Withdrawn,
                ActivityType::StageEnded,
                ActivityType::StageStarted,
            ]
        );
    }

    #[test]
    fn test_reset_returns_to_first_level() {
        let fixture = workflow_with_levels(3).unwrap();
        let config = EngineConfig::default();
        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 2));

        action(ActionCode::ResetApprovals).execute(&mut journal, &boss()).unwrap();
        assert_eq!(
            journal.current_state().approval_level_id(),
            Some(&fixture.levels[0])
        );
        assert_eq!(journal.supersessions()[0].approval_level_ids, fixture.levels);
        assert_eq!(
            journal.actions()[0].approval_level_id,
            Some(fixture.levels[2].clone())
        );
        assert_eq!(
            activities(&journal),
            vec![
                ActivityType::ApprovalsReset,
                ActivityType::LevelEnded,
                ActivityType::LevelStarted,
            ]
        );
    }

    #[test]
    fn test_reset_at_first_level_keeps_state() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        action(ActionCode::ResetApprovals).execute(&mut journal, &boss()).unwrap();
        assert_eq!(activities(&journal), vec![ActivityType::ApprovalsReset]);
    }

    #[test]
    fn test_return_to_first_form_submission() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig {
            return_stage: ReturnStageRule::FirstFormSubmission,
            ..EngineConfig::default()
        };
        let journal = TransitionJournal::new(&fixture.version, &config, at_level(&fixture, 0));
        assert_eq!(return_stage(&journal).unwrap().id, fixture.form);
    }
}

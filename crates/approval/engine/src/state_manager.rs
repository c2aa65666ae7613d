//! Stage state managers
//!
//! Each stage type has one state manager. A manager computes the states an
//! application can move to from its stage, and runs the lifecycle hooks
//! that fire when an application starts on, enters or leaves the stage.
//!
//! Managers are built from a stage whose type must match; anything else is
//! a caller bug and fails with a coding error.

use crate::activity_log;
use crate::journal::TransitionJournal;
use crate::level_ladder::ApprovalLevelLadder;
use crate::stage_type::{descriptor, state_manager};
use approval_types::{
    ActivityType, ApplicationState, ApprovalError, ApprovalLevel, ApprovalLevelId, ApprovalResult,
    StageType, UserId, WorkflowStage, WorkflowVersion,
};

/// State transition contract shared by every stage type
pub trait StateManager {
    /// The stage this manager was built for
    fn stage(&self) -> &WorkflowStage;

    fn stage_type(&self) -> StageType {
        self.stage().stage_type
    }

    /// State an application has when it arrives on this stage
    fn initial_state(&self) -> ApprovalResult<ApplicationState>;

    /// State a brand new application has when it starts on this stage
    fn creation_state(&self) -> ApprovalResult<ApplicationState>;

    fn next_state(&self, current: &ApplicationState) -> ApprovalResult<ApplicationState>;

    fn previous_state(&self, current: &ApplicationState) -> ApprovalResult<ApplicationState>;

    /// Runs once, right after an application is created on this stage
    fn on_application_start(
        &self,
        journal: &mut TransitionJournal<'_>,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()>;

    /// Runs after the application's state has been set to a state on this
    /// stage. `previous` is the state it came from.
    fn on_state_entry(
        &self,
        journal: &mut TransitionJournal<'_>,
        previous: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()>;

    /// Runs while the application still sits on this stage, before it moves
    /// to `next`.
    fn on_state_exit(
        &self,
        journal: &mut TransitionJournal<'_>,
        next: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()>;
}

fn ensure_type(stage: &WorkflowStage, expected: StageType) -> ApprovalResult<()> {
    if stage.stage_type == expected {
        Ok(())
    } else {
        Err(ApprovalError::coding(format!(
            "Application stage is not of type {}",
            expected
        )))
    }
}

fn cannot_start(stage_type: StageType) -> ApprovalError {
    ApprovalError::model(format!(
        "An application can not start in {}",
        descriptor(stage_type).display_name
    ))
}

fn next_stage_initial_state(
    version: &WorkflowVersion,
    stage: &WorkflowStage,
) -> ApprovalResult<ApplicationState> {
    match version.next_stage(&stage.id)? {
        Some(next) => state_manager(version, next)?.initial_state(),
        None => Err(ApprovalError::coding("No next stage")),
    }
}

fn previous_stage_initial_state(
    version: &WorkflowVersion,
    stage: &WorkflowStage,
) -> ApprovalResult<ApplicationState> {
    match version.previous_stage(&stage.id)? {
        Some(previous) => state_manager(version, previous)?.initial_state(),
        None => Err(ApprovalError::model("No previous stage")),
    }
}

// ── Form submission ──────────────────────────────────────────────────

/// Applications are created and edited here; the only stage with drafts
pub struct FormSubmissionStateManager<'w> {
    version: &'w WorkflowVersion,
    stage: &'w WorkflowStage,
}

impl<'w> FormSubmissionStateManager<'w> {
    pub fn new(version: &'w WorkflowVersion, stage: &'w WorkflowStage) -> ApprovalResult<Self> {
        ensure_type(stage, StageType::FormSubmission)?;
        Ok(Self { version, stage })
    }
}

impl StateManager for FormSubmissionStateManager<'_> {
    fn stage(&self) -> &WorkflowStage {
        self.stage
    }

    fn initial_state(&self) -> ApprovalResult<ApplicationState> {
        Ok(ApplicationState::on_stage(self.stage.id.clone()))
    }

    fn creation_state(&self) -> ApprovalResult<ApplicationState> {
        Ok(ApplicationState::new(self.stage.id.clone(), true, None))
    }

    fn next_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        next_stage_initial_state(self.version, self.stage)
    }

    fn previous_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        previous_stage_initial_state(self.version, self.stage)
    }

    fn on_application_start(
        &self,
        journal: &mut TransitionJournal<'_>,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::StageStarted)
    }

    fn on_state_entry(
        &self,
        journal: &mut TransitionJournal<'_>,
        _previous: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::StageStarted)
    }

    fn on_state_exit(
        &self,
        journal: &mut TransitionJournal<'_>,
        _next: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::StageEnded)
    }
}

// ── Approvals ────────────────────────────────────────────────────────

/// Walks an application up the approval level ladder of its stage
pub struct ApprovalsStateManager<'w> {
    version: &'w WorkflowVersion,
    stage: &'w WorkflowStage,
    ladder: ApprovalLevelLadder<'w>,
}

impl<'w> ApprovalsStateManager<'w> {
    pub fn new(version: &'w WorkflowVersion, stage: &'w WorkflowStage) -> ApprovalResult<Self> {
        ensure_type(stage, StageType::Approvals)?;
        let ladder = ApprovalLevelLadder::for_stage(stage)?;
        Ok(Self {
            version,
            stage,
            ladder,
        })
    }

    pub fn ladder(&self) -> &ApprovalLevelLadder<'w> {
        &self.ladder
    }

    fn current_level<'s>(
        &self,
        current: &'s ApplicationState,
    ) -> ApprovalResult<&'s ApprovalLevelId> {
        current.approval_level_id().ok_or_else(|| {
            ApprovalError::coding("Application state in an approvals stage has no approval level")
        })
    }

    fn state_at(&self, level: &ApprovalLevel) -> ApplicationState {
        ApplicationState::new(self.stage.id.clone(), false, Some(level.id.clone()))
    }
}

impl StateManager for ApprovalsStateManager<'_> {
    fn stage(&self) -> &WorkflowStage {
        self.stage
    }

    fn initial_state(&self) -> ApprovalResult<ApplicationState> {
        Ok(self.state_at(self.ladder.first()?))
    }

    fn creation_state(&self) -> ApprovalResult<ApplicationState> {
        Err(cannot_start(StageType::Approvals))
    }

    fn next_state(&self, current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        match self.ladder.next(self.current_level(current)?)? {
            Some(level) => Ok(self.state_at(level)),
            None => next_stage_initial_state(self.version, self.stage),
        }
    }

    fn previous_state(&self, current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        match self.ladder.previous(self.current_level(current)?)? {
            Some(level) => Ok(self.state_at(level)),
            None => previous_stage_initial_state(self.version, self.stage),
        }
    }

    fn on_application_start(
        &self,
        _journal: &mut TransitionJournal<'_>,
        _user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        Err(cannot_start(StageType::Approvals))
    }

    fn on_state_entry(
        &self,
        journal: &mut TransitionJournal<'_>,
        previous: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        if previous.stage_id() != &self.stage.id {
            activity_log::create_empty(journal, user_id, ActivityType::StageStarted)?;
        }
        activity_log::create_empty(journal, user_id, ActivityType::LevelStarted)
    }

    fn on_state_exit(
        &self,
        journal: &mut TransitionJournal<'_>,
        next: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::LevelEnded)?;
        if next.stage_id() != &self.stage.id {
            activity_log::create_empty(journal, user_id, ActivityType::StageEnded)?;
        }
        Ok(())
    }
}

// ── Waiting ──────────────────────────────────────────────────────────

/// Holds an application until an external trigger moves it on
pub struct WaitingStateManager<'w> {
    version: &'w WorkflowVersion,
    stage: &'w WorkflowStage,
}

impl<'w> WaitingStateManager<'w> {
    pub fn new(version: &'w WorkflowVersion, stage: &'w WorkflowStage) -> ApprovalResult<Self> {
        ensure_type(stage, StageType::Waiting)?;
        Ok(Self { version, stage })
    }
}

impl StateManager for WaitingStateManager<'_> {
    fn stage(&self) -> &WorkflowStage {
        self.stage
    }

    fn initial_state(&self) -> ApprovalResult<ApplicationState> {
        Ok(ApplicationState::on_stage(self.stage.id.clone()))
    }

    fn creation_state(&self) -> ApprovalResult<ApplicationState> {
        Err(cannot_start(StageType::Waiting))
    }

    fn next_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        next_stage_initial_state(self.version, self.stage)
    }

    fn previous_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        previous_stage_initial_state(self.version, self.stage)
    }

    fn on_application_start(
        &self,
        _journal: &mut TransitionJournal<'_>,
        _user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        Err(cannot_start(StageType::Waiting))
    }

    fn on_state_entry(
        &self,
        journal: &mut TransitionJournal<'_>,
        _previous: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::StageStarted)
    }

    fn on_state_exit(
        &self,
        journal: &mut TransitionJournal<'_>,
        _next: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        activity_log::create_empty(journal, user_id, ActivityType::StageEnded)
    }
}

// ── Finished ─────────────────────────────────────────────────────────

/// Terminal stage: nothing leaves it
pub struct FinishedStateManager<'w> {
    stage: &'w WorkflowStage,
}

impl<'w> FinishedStateManager<'w> {
    pub fn new(_version: &'w WorkflowVersion, stage: &'w WorkflowStage) -> ApprovalResult<Self> {
        ensure_type(stage, StageType::Finished)?;
        Ok(Self { stage })
    }
}

impl StateManager for FinishedStateManager<'_> {
    fn stage(&self) -> &WorkflowStage {
        self.stage
    }

    fn initial_state(&self) -> ApprovalResult<ApplicationState> {
        Ok(ApplicationState::on_stage(self.stage.id.clone()))
    }

    fn creation_state(&self) -> ApprovalResult<ApplicationState> {
        Err(cannot_start(StageType::Finished))
    }

    fn next_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        Err(ApprovalError::coding("Finished stages do not have next states"))
    }

    fn previous_state(&self, _current: &ApplicationState) -> ApprovalResult<ApplicationState> {
        Err(ApprovalError::coding(
            "Finished stages do not have previous stages",
        ))
    }

    fn on_application_start(
        &self,
        _journal: &mut TransitionJournal<'_>,
        _user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        Err(cannot_start(StageType::Finished))
    }

    fn on_state_entry(
        &self,
        journal: &mut TransitionJournal<'_>,
        _previous: &ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        journal.application_mut().mark_completed();
        activity_log::create_empty(journal, user_id, ActivityType::Finished)
    }

    fn on_state_exit(
        &self,
        _journal: &mut TransitionJournal<'_>,
        _next: &ApplicationState,
        _user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        Err(ApprovalError::coding(
            "Exiting a finished state not implemented",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::{build_workflow, draft_application, two_level_workflow, WorkflowFixture};
    use approval_types::Application;

    fn manager<'w>(fixture: &'w WorkflowFixture, stage: &approval_types::StageId) -> Box<dyn StateManager + 'w> {
        let stage = fixture.version.stage(stage).unwrap();
        state_manager(&fixture.version, stage).unwrap()
    }

    fn recorded(journal: &TransitionJournal<'_>) -> Vec<ActivityType> {
        journal.activities().iter().map(|a| a.activity_type).collect()
    }

    fn app_at(fixture: &WorkflowFixture, state: ApplicationState) -> Application {
        let mut app = draft_application(fixture);
        app.current_state = state;
        app
    }

    #[test]
    fn test_wrong_type_is_coding_error() {
        let fixture = two_level_workflow().unwrap();
        let form = fixture.version.stage(&fixture.form).unwrap();
        let err = ApprovalsStateManager::new(&fixture.version, form).err().unwrap();
        assert!(err.is_coding_error());
        assert!(err.to_string().contains("Application stage is not of type approvals"));

        let approvals = fixture.version.stage(&fixture.approvals).unwrap();
        assert!(FinishedStateManager::new(&fixture.version, approvals).is_err());
        assert!(WaitingStateManager::new(&fixture.version, approvals).is_err());
        assert!(FormSubmissionStateManager::new(&fixture.version, approvals).is_err());
    }

    // ── form submission ──

    #[test]
    fn test_form_submission_states() {
        let fixture = two_level_workflow().unwrap();
        let form = manager(&fixture, &fixture.form);

        let creation = form.creation_state().unwrap();
        assert!(creation.is_draft());
        assert_eq!(creation.stage_id(), &fixture.form);
        assert!(creation.approval_level_id().is_none());

        let initial = form.initial_state().unwrap();
        assert!(!initial.is_draft());
        assert!(initial.approval_level_id().is_none());

        let next = form.next_state(&creation).unwrap();
        assert_eq!(next.stage_id(), &fixture.approvals);
        assert_eq!(next.approval_level_id(), Some(&fixture.levels[0]));

        let err = form.previous_state(&creation).unwrap_err();
        assert_eq!(err, ApprovalError::model("No previous stage"));
    }

    #[test]
    fn test_form_submission_hooks() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let form = manager(&fixture, &fixture.form);
        let app = draft_application(&fixture);
        let previous = app.current_state.clone();
        let mut journal = TransitionJournal::new(&fixture.version, &config, app);

        form.on_application_start(&mut journal, None).unwrap();
        form.on_state_entry(&mut journal, &previous, None).unwrap();
        form.on_state_exit(&mut journal, &previous, None).unwrap();
        assert_eq!(
            recorded(&journal),
            vec![
                ActivityType::StageStarted,
                ActivityType::StageStarted,
                ActivityType::StageEnded
            ]
        );
    }

    // ── approvals ──

    #[test]
    fn test_approvals_states() {
        let fixture = two_level_workflow().unwrap();
        let approvals = manager(&fixture, &fixture.approvals);

        let first = approvals.initial_state().unwrap();
        assert_eq!(first.approval_level_id(), Some(&fixture.levels[0]));
        assert!(!first.is_draft());

        let second = approvals.next_state(&first).unwrap();
        assert_eq!(second.stage_id(), &fixture.approvals);
        assert_eq!(second.approval_level_id(), Some(&fixture.levels[1]));

        let after_last = approvals.next_state(&second).unwrap();
        assert_eq!(after_last.stage_id(), &fixture.finished);
        assert!(after_last.approval_level_id().is_none());

        assert!(approvals.previous_state(&second).unwrap().is_same_as(&first));
        let before_first = approvals.previous_state(&first).unwrap();
        assert_eq!(before_first.stage_id(), &fixture.form);
        assert!(!before_first.is_draft());
    }

    #[test]
    fn test_approvals_cannot_start_applications() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let approvals = manager(&fixture, &fixture.approvals);

        let err = approvals.creation_state().unwrap_err();
        assert!(err.is_model_error());
        assert!(err
            .to_string()
            .contains("An application can not start in an approval stage"));

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));
        assert!(approvals.on_application_start(&mut journal, None).is_err());
    }

    #[test]
    fn test_approvals_entry_activities() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let approvals = manager(&fixture, &fixture.approvals);
        let start = ApplicationState::on_stage(fixture.form.clone());
        let first = approvals.initial_state().unwrap();
        let second = approvals.next_state(&first).unwrap();

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, app_at(&fixture, first.clone()));
        approvals.on_state_entry(&mut journal, &start, None).unwrap();
        assert_eq!(
            recorded(&journal),
            vec![ActivityType::StageStarted, ActivityType::LevelStarted]
        );

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, app_at(&fixture, second));
        approvals.on_state_entry(&mut journal, &first, None).unwrap();
        assert_eq!(recorded(&journal), vec![ActivityType::LevelStarted]);
        assert_eq!(
            journal.activities()[0].approval_level_id,
            Some(fixture.levels[1].clone())
        );
    }

    #[test]
    fn test_approvals_exit_activities() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let approvals = manager(&fixture, &fixture.approvals);
        let first = approvals.initial_state().unwrap();
        let second = approvals.next_state(&first).unwrap();
        let last = ApplicationState::on_stage(fixture.finished.clone());

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, app_at(&fixture, second.clone()));
        approvals.on_state_exit(&mut journal, &last, None).unwrap();
        assert_eq!(
            recorded(&journal),
            vec![ActivityType::LevelEnded, ActivityType::StageEnded]
        );

        let mut journal =
            TransitionJournal::new(&fixture.version, &config, app_at(&fixture, first));
        approvals.on_state_exit(&mut journal, &second, None).unwrap();
        assert_eq!(recorded(&journal), vec![ActivityType::LevelEnded]);
    }

    // ── waiting ──

    #[test]
    fn test_waiting_stage() {
        let version = build_workflow(
            "with waiting",
            &[
                ("Request", StageType::FormSubmission, 0),
                ("Hold", StageType::Waiting, 0),
                ("Done", StageType::Finished, 0),
            ],
        )
        .unwrap();
        let config = EngineConfig::default();
        let form = &version.stages[0];
        let waiting_stage = &version.stages[1];
        let finished = &version.stages[2];
        let waiting = state_manager(&version, waiting_stage).unwrap();

        let here = waiting.initial_state().unwrap();
        assert_eq!(waiting.next_state(&here).unwrap().stage_id(), &finished.id);
        let back = waiting.previous_state(&here).unwrap();
        assert_eq!(back.stage_id(), &form.id);
        assert!(!back.is_draft());

        let err = waiting.creation_state().unwrap_err();
        assert!(err.to_string().contains("can not start in a waiting stage"));

        let app = Application::new(
            version.id.clone(),
            UserId::new("a"),
            UserId::new("a"),
            here.clone(),
        );
        let mut journal = TransitionJournal::new(&version, &config, app);
        let err = waiting.on_application_start(&mut journal, None).unwrap_err();
        assert!(err.to_string().contains("can not start in a waiting stage"));

        waiting.on_state_entry(&mut journal, &back, None).unwrap();
        waiting.on_state_exit(&mut journal, &here, None).unwrap();
        assert_eq!(
            recorded(&journal),
            vec![ActivityType::StageStarted, ActivityType::StageEnded]
        );
    }

    // ── finished ──

    #[test]
    fn test_finished_has_no_transitions() {
        let fixture = two_level_workflow().unwrap();
        let finished = manager(&fixture, &fixture.finished);
        let state = finished.initial_state().unwrap();

        let err = finished.next_state(&state).unwrap_err();
        assert_eq!(
            err,
            ApprovalError::coding("Finished stages do not have next states")
        );
        let err = finished.previous_state(&state).unwrap_err();
        assert!(err.is_coding_error());
        assert!(err.to_string().contains("Finished stages do not have previous stages"));
        let err = finished.creation_state().unwrap_err();
        assert!(err.to_string().contains("can not start in a finished stage"));
    }

    #[test]
    fn test_finished_entry_completes_application() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let finished = manager(&fixture, &fixture.finished);
        let state = finished.initial_state().unwrap();
        let mut journal =
            TransitionJournal::new(&fixture.version, &config, app_at(&fixture, state.clone()));

        finished
            .on_state_entry(&mut journal, &ApplicationState::on_stage(fixture.approvals.clone()), None)
            .unwrap();
        assert!(journal.application().is_completed());
        assert_eq!(recorded(&journal), vec![ActivityType::Finished]);

        let err = finished.on_state_exit(&mut journal, &state, None).unwrap_err();
        assert!(err.to_string().contains("Exiting a finished state not implemented"));
    }
}

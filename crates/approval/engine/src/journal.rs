//! Transition journal: the working copy of one engine operation
//!
//! A journal holds the application being changed together with every audit
//! record the operation produces. Nothing reaches storage until the journal
//! is turned into a single [`TransitionCommit`], so an error anywhere in an
//! action leaves no trace.

use crate::config::EngineConfig;
use crate::stage_type;
use approval_store::{Supersession, TransitionCommit};
use approval_types::{
    Application, ApplicationState, ApprovalResult, NewApplicationAction, NewApplicationActivity,
    UserId, WorkflowVersion,
};

pub struct TransitionJournal<'w> {
    version: &'w WorkflowVersion,
    config: &'w EngineConfig,
    application: Application,
    expected_revision: Option<u64>,
    supersessions: Vec<Supersession>,
    actions: Vec<NewApplicationAction>,
    activities: Vec<NewApplicationActivity>,
}

impl<'w> TransitionJournal<'w> {
    /// Journal for an application that already exists in storage
    pub fn new(version: &'w WorkflowVersion, config: &'w EngineConfig, application: Application) -> Self {
        let expected_revision = Some(application.revision);
        Self {
            version,
            config,
            application,
            expected_revision,
            supersessions: Vec::new(),
            actions: Vec::new(),
            activities: Vec::new(),
        }
    }

    /// Journal for an application that has not been stored yet
    pub fn for_new_application(
        version: &'w WorkflowVersion,
        config: &'w EngineConfig,
        application: Application,
    ) -> Self {
        let mut journal = Self::new(version, config, application);
        journal.expected_revision = None;
        journal
    }

    pub fn version(&self) -> &'w WorkflowVersion {
        self.version
    }

    pub fn config(&self) -> &'w EngineConfig {
        self.config
    }

    pub fn application(&self) -> &Application {
        &self.application
    }

    pub fn application_mut(&mut self) -> &mut Application {
        &mut self.application
    }

    pub fn current_state(&self) -> &ApplicationState {
        &self.application.current_state
    }

    pub fn actions(&self) -> &[NewApplicationAction] {
        &self.actions
    }

    pub fn activities(&self) -> &[NewApplicationActivity] {
        &self.activities
    }

    pub fn supersessions(&self) -> &[Supersession] {
        &self.supersessions
    }

    pub(crate) fn push_action(&mut self, action: NewApplicationAction) {
        self.actions.push(action);
    }

    pub(crate) fn push_activity(&mut self, activity: NewApplicationActivity) {
        self.activities.push(activity);
    }

    pub(crate) fn push_supersession(&mut self, supersession: Supersession) {
        self.supersessions.push(supersession);
    }

    /// Move the application to `new_state`, running the exit hook of the
    /// old stage and the entry hook of the new one. Does nothing when the
    /// state is unchanged.
    pub fn change_state(
        &mut self,
        new_state: ApplicationState,
        user_id: Option<&UserId>,
    ) -> ApprovalResult<()> {
        let previous = self.application.current_state.clone();
        if previous.is_same_as(&new_state) {
            return Ok(());
        }
        let version = self.version;

        let old_stage = previous.stage(version)?;
        let new_stage = new_state.stage(version)?;
        tracing::debug!(
            application_id = %self.application.id,
            from = %previous,
            to = %new_state,
            "Changing application state"
        );

        stage_type::state_manager(version, old_stage)?.on_state_exit(self, &new_state, user_id)?;
        self.application.set_current_state(new_state);
        stage_type::state_manager(version, new_stage)?.on_state_entry(self, &previous, user_id)?;
        Ok(())
    }

    pub fn into_commit(self) -> TransitionCommit {
        TransitionCommit {
            application: self.application,
            expected_revision: self.expected_revision,
            supersessions: self.supersessions,
            actions: self.actions,
            activities: self.activities,
        }
    }
}

//! Approval engine: the entry point for every workflow operation

use crate::action_log;
use crate::actions::{action, action_by_enum};
use crate::activity_log;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::journal::TransitionJournal;
use crate::progress;
use crate::stage_type::state_manager;
use approval_store::{ApprovalStorage, QueryWindow, StorageError};
use approval_types::{
    ActionCode, ActivityType, Application, ApplicationAction, ApplicationActivity, ApplicationId,
    ApplicationPhase, ApprovalError, ApprovalResult, OverallProgress, StageId, StageType, UserId,
    WorkflowVersion, WorkflowVersionId,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// Drives applications through their workflow versions.
///
/// Each mutating call loads the application, runs one operation against a
/// [`TransitionJournal`] and commits the result in one storage write. A
/// concurrent writer that committed first makes the call fail with a
/// conflict.
pub struct ApprovalEngine {
    storage: Arc<dyn ApprovalStorage>,
    config: EngineConfig,
}

impl ApprovalEngine {
    pub fn new(storage: Arc<dyn ApprovalStorage>) -> Self {
        Self::with_config(storage, EngineConfig::default())
    }

    pub fn with_config(storage: Arc<dyn ApprovalStorage>, config: EngineConfig) -> Self {
        Self { storage, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<dyn ApprovalStorage> {
        &self.storage
    }

    // ============ Workflow Versions ============

    /// Store a workflow version as it is, whatever its status
    pub fn save_workflow_version(&self, version: WorkflowVersion) -> EngineResult<()> {
        tracing::info!(
            version_id = %version.id,
            status = %version.status,
            stages = version.stages.len(),
            "Saving workflow version"
        );
        self.storage.save_workflow_version(version)?;
        Ok(())
    }

    /// Validate and activate a stored draft version
    pub fn activate_workflow_version(&self, id: &WorkflowVersionId) -> EngineResult<WorkflowVersion> {
        let mut version = self.workflow_version(id)?;
        version.activate()?;
        self.storage.save_workflow_version(version.clone())?;
        tracing::info!(version_id = %id, "Workflow version activated");
        Ok(version)
    }

    pub fn workflow_version(&self, id: &WorkflowVersionId) -> EngineResult<WorkflowVersion> {
        self.storage
            .get_workflow_version(id)?
            .ok_or_else(|| ApprovalError::WorkflowVersionNotFound(id.clone()).into())
    }

    pub fn workflow_versions(&self, window: QueryWindow) -> EngineResult<Vec<WorkflowVersion>> {
        Ok(self.storage.list_workflow_versions(window)?)
    }

    // ============ Application Lifecycle ============

    /// Create a draft application on the first stage of an active version
    pub fn create_application(
        &self,
        version_id: &WorkflowVersionId,
        creator_id: &UserId,
        owner_id: &UserId,
    ) -> EngineResult<Application> {
        self.start_application(version_id, creator_id, owner_id, None, json!([]))
    }

    /// Start a new application from an existing one, carrying over its
    /// owner and form data
    pub fn clone_application(
        &self,
        source_id: &ApplicationId,
        cloner_id: &UserId,
    ) -> EngineResult<Application> {
        let source = self.application(source_id)?;
        self.start_application(
            &source.workflow_version_id,
            cloner_id,
            &source.owner_id,
            source.form_data.clone(),
            json!({ "source": source.id.to_string() }),
        )
    }

    fn start_application(
        &self,
        version_id: &WorkflowVersionId,
        creator_id: &UserId,
        owner_id: &UserId,
        form_data: Option<Value>,
        creation_info: Value,
    ) -> EngineResult<Application> {
        let version = self.workflow_version(version_id)?;
        if !version.is_active() {
            return Err(ApprovalError::model("Workflow version is not active").into());
        }
        let first = version
            .first_stage()
            .ok_or_else(|| ApprovalError::model("Workflow version has no stages"))?;
        let manager = state_manager(&version, first)?;

        let mut application = Application::new(
            version.id.clone(),
            creator_id.clone(),
            owner_id.clone(),
            manager.creation_state()?,
        );
        application.form_data = form_data;

        let mut journal = TransitionJournal::for_new_application(&version, &self.config, application);
        activity_log::create(&mut journal, Some(creator_id), ActivityType::Creation, creation_info)?;
        manager.on_application_start(&mut journal, Some(creator_id))?;
        self.commit(journal)
    }

    /// Delete an application that is still a draft, with its audit trail
    pub fn delete_application(&self, id: &ApplicationId) -> EngineResult<()> {
        let application = self.application(id)?;
        if !application.is_draft() {
            return Err(ApprovalError::model("Unable to delete application not in draft state").into());
        }
        self.storage.delete_application(id)?;
        tracing::info!(application_id = %id, "Application deleted");
        Ok(())
    }

    /// Replace the application's latest form submission
    pub fn save_form_data(&self, id: &ApplicationId, form_data: Value) -> EngineResult<Application> {
        self.transition(id, |journal| {
            journal.application_mut().form_data = Some(form_data);
            Ok(())
        })
    }

    // ============ Actions ============

    pub fn execute(
        &self,
        id: &ApplicationId,
        code: ActionCode,
        user_id: &UserId,
    ) -> EngineResult<Application> {
        self.transition(id, |journal| action(code).execute(journal, user_id))
    }

    /// Execute an action named by its enum name, e.g. `"REJECT"`
    pub fn execute_enum(
        &self,
        id: &ApplicationId,
        name: &str,
        user_id: &UserId,
    ) -> EngineResult<Application> {
        let code = action_by_enum(name)?.code();
        self.execute(id, code, user_id)
    }

    /// Actions whose preconditions currently hold
    pub fn available_actions(&self, id: &ApplicationId) -> EngineResult<Vec<ActionCode>> {
        let application = self.application(id)?;
        let version = self.workflow_version(&application.workflow_version_id)?;
        let journal = TransitionJournal::new(&version, &self.config, application);
        Ok(ActionCode::ALL
            .into_iter()
            .filter(|code| action(*code).is_available(&journal))
            .collect())
    }

    /// Move an application on from a waiting stage
    pub fn proceed(&self, id: &ApplicationId, user_id: &UserId) -> EngineResult<Application> {
        self.transition(id, |journal| {
            let version = journal.version();
            let current = journal.current_state().clone();
            if !current.is_stage_type(version, StageType::Waiting)? {
                return Err(ApprovalError::coding(
                    "Cannot proceed application because the state is not waiting",
                ));
            }
            let next = state_manager(version, current.stage(version)?)?.next_state(&current)?;
            journal.change_state(next, Some(user_id))
        })
    }

    // ============ Audit Trail ============

    pub fn record_activity(
        &self,
        id: &ApplicationId,
        user_id: Option<&UserId>,
        activity_type: ActivityType,
        activity_info: Value,
    ) -> EngineResult<Application> {
        self.transition(id, |journal| {
            activity_log::create(journal, user_id, activity_type, activity_info)
        })
    }

    /// Record an activity from its stored code and raw JSON info
    pub fn record_activity_raw(
        &self,
        id: &ApplicationId,
        user_id: Option<&UserId>,
        activity_code: i32,
        activity_info: &str,
    ) -> EngineResult<Application> {
        self.transition(id, |journal| {
            activity_log::create_raw(journal, user_id, activity_code, activity_info)
        })
    }

    /// Supersede every earlier action recorded against a level of
    /// `stage_id`, returning the number of actions changed
    pub fn supersede_actions_for_stage(
        &self,
        id: &ApplicationId,
        stage_id: &StageId,
    ) -> EngineResult<usize> {
        let application = self.application(id)?;
        let version = self.workflow_version(&application.workflow_version_id)?;
        let mut journal = TransitionJournal::new(&version, &self.config, application);
        action_log::supersede_actions_for_stage(&mut journal, stage_id)?;
        let receipt = self.storage.commit(journal.into_commit())?;
        Ok(receipt.superseded)
    }

    pub fn actions(&self, id: &ApplicationId) -> EngineResult<Vec<ApplicationAction>> {
        Ok(self.storage.list_actions(id)?)
    }

    pub fn activities(&self, id: &ApplicationId) -> EngineResult<Vec<ApplicationActivity>> {
        Ok(self.storage.list_activities(id)?)
    }

    /// Latest action still in force
    pub fn last_action(&self, id: &ApplicationId) -> EngineResult<Option<ApplicationAction>> {
        let actions = self.actions(id)?;
        Ok(progress::last_effective_action(&actions).cloned())
    }

    // ============ Queries ============

    pub fn application(&self, id: &ApplicationId) -> EngineResult<Application> {
        self.storage
            .get_application(id)?
            .ok_or_else(|| ApprovalError::ApplicationNotFound(id.clone()).into())
    }

    pub fn applications(&self, window: QueryWindow) -> EngineResult<Vec<Application>> {
        Ok(self.storage.list_applications(window)?)
    }

    pub fn phase(&self, id: &ApplicationId) -> EngineResult<ApplicationPhase> {
        let application = self.application(id)?;
        let version = self.workflow_version(&application.workflow_version_id)?;
        Ok(application.current_state.phase(&version)?)
    }

    pub fn overall_progress(&self, id: &ApplicationId) -> EngineResult<OverallProgress> {
        let application = self.application(id)?;
        let version = self.workflow_version(&application.workflow_version_id)?;
        let actions = self.actions(id)?;
        Ok(progress::overall_progress(&version, &application, &actions)?)
    }

    // ============ Internals ============

    fn transition<F>(&self, id: &ApplicationId, operation: F) -> EngineResult<Application>
    where
        F: FnOnce(&mut TransitionJournal<'_>) -> ApprovalResult<()>,
    {
        let application = self.application(id)?;
        let version = self.workflow_version(&application.workflow_version_id)?;
        let mut journal = TransitionJournal::new(&version, &self.config, application);
        operation(&mut journal)?;
        self.commit(journal)
    }

    fn commit(&self, journal: TransitionJournal<'_>) -> EngineResult<Application> {
        let commit = journal.into_commit();
        let application_id = commit.application.id.clone();
        match self.storage.commit(commit) {
            Ok(receipt) => {
                tracing::info!(
                    application_id = %application_id,
                    state = %receipt.application.current_state,
                    revision = receipt.application.revision,
                    actions = receipt.actions.len(),
                    activities = receipt.activities.len(),
                    superseded = receipt.superseded,
                    "Application transition committed"
                );
                Ok(receipt.application)
            }
            Err(StorageError::Conflict(reason)) => {
                tracing::warn!(
                    application_id = %application_id,
                    reason = %reason,
                    "Application changed concurrently; transition discarded"
                );
                Err(EngineError::Storage(StorageError::Conflict(reason)))
            }
            Err(err) => Err(err.into()),
        }
    }
}

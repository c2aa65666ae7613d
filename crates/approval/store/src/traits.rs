use crate::model::{CommitReceipt, TransitionCommit};
use crate::StorageResult;
use approval_types::{
    Application, ApplicationAction, ApplicationActivity, ApplicationId, ApprovalLevelId,
    WorkflowVersion, WorkflowVersionId,
};

/// Generic query window for paged reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryWindow {
    pub limit: usize,
    pub offset: usize,
}

/// Storage interface for workflow definitions.
pub trait WorkflowStore: Send + Sync {
    /// Insert or replace a workflow version.
    fn save_workflow_version(&self, version: WorkflowVersion) -> StorageResult<()>;

    fn get_workflow_version(&self, id: &WorkflowVersionId) -> StorageResult<Option<WorkflowVersion>>;

    fn list_workflow_versions(&self, window: QueryWindow) -> StorageResult<Vec<WorkflowVersion>>;
}

/// Storage interface for application rows.
pub trait ApplicationStore: Send + Sync {
    fn get_application(&self, id: &ApplicationId) -> StorageResult<Option<Application>>;

    /// List applications newest-first.
    fn list_applications(&self, window: QueryWindow) -> StorageResult<Vec<Application>>;

    /// Remove an application together with its actions and activities.
    fn delete_application(&self, id: &ApplicationId) -> StorageResult<()>;
}

/// Storage interface for the supersedable action log.
pub trait ActionStore: Send + Sync {
    /// Actions of one application, oldest first.
    fn list_actions(&self, application_id: &ApplicationId) -> StorageResult<Vec<ApplicationAction>>;

    /// Mark every non-superseded action of the application recorded against
    /// one of `approval_level_ids` as superseded, in one update. Returns the
    /// number of rows changed; re-running changes nothing.
    fn supersede_actions_for_levels(
        &self,
        application_id: &ApplicationId,
        approval_level_ids: &[ApprovalLevelId],
    ) -> StorageResult<usize>;
}

/// Storage interface for the append-only activity log.
pub trait ActivityStore: Send + Sync {
    /// Activities of one application, oldest first.
    fn list_activities(
        &self,
        application_id: &ApplicationId,
    ) -> StorageResult<Vec<ApplicationActivity>>;
}

/// Storage interface for atomic transition writes.
pub trait TransitionStore: Send + Sync {
    /// Apply every write of a transition, or none of them.
    ///
    /// Fails with `Conflict` when the stored revision differs from
    /// `expected_revision`, or when inserting an id that already exists.
    fn commit(&self, commit: TransitionCommit) -> StorageResult<CommitReceipt>;
}

/// Bundle trait for full approval storage backends.
pub trait ApprovalStorage:
    WorkflowStore + ApplicationStore + ActionStore + ActivityStore + TransitionStore + Send + Sync
{
}

impl<T> ApprovalStorage for T where
    T: WorkflowStore
        + ApplicationStore
        + ActionStore
        + ActivityStore
        + TransitionStore
        + Send
        + Sync
{
}

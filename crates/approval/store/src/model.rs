use approval_types::{
    Application, ApplicationAction, ApplicationActivity, ApplicationId, ApprovalLevelId,
    NewApplicationAction, NewApplicationActivity,
};
use serde::{Deserialize, Serialize};

/// Set-based supersession request: every non-superseded action of the
/// application recorded against one of the listed approval levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Supersession {
    pub application_id: ApplicationId,
    pub approval_level_ids: Vec<ApprovalLevelId>,
}

/// All writes produced by one engine operation.
///
/// Storage applies supersessions before appending the new actions, so a
/// commit never supersedes the actions it records itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionCommit {
    pub application: Application,
    /// Revision the application was loaded at. `None` inserts a new row.
    pub expected_revision: Option<u64>,
    #[serde(default)]
    pub supersessions: Vec<Supersession>,
    #[serde(default)]
    pub actions: Vec<NewApplicationAction>,
    #[serde(default)]
    pub activities: Vec<NewApplicationActivity>,
}

impl TransitionCommit {
    pub fn is_insert(&self) -> bool {
        self.expected_revision.is_none()
    }
}

/// What storage made of a commit
#[derive(Debug, Clone)]
pub struct CommitReceipt {
    /// The stored row, carrying its new revision
    pub application: Application,
    pub actions: Vec<ApplicationAction>,
    pub activities: Vec<ApplicationActivity>,
    /// Number of actions newly marked superseded
    pub superseded: usize,
}

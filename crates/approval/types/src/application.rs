//! Applications: workflow instances routed through stages and levels

use crate::{ApplicationState, ApprovalError, ApprovalResult, WorkflowVersionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for an application
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApplicationId(pub String);

impl ApplicationId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identity of a user acting on an application. No authorization is
/// attached; callers check permissions before acting.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Application ──────────────────────────────────────────────────────

/// A workflow instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub workflow_version_id: WorkflowVersionId,
    /// Who created the application
    pub creator_id: UserId,
    /// Who the application is for
    pub owner_id: UserId,
    /// Overwritten on every transition; history lives in the audit logs
    pub current_state: ApplicationState,
    /// Set once, on the first successful submission
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitter_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<DateTime<Utc>>,
    /// Latest form submission, snapshotted onto each action
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_data: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency token, bumped by storage on every commit
    #[serde(default)]
    pub revision: u64,
}

impl Application {
    pub fn new(
        workflow_version_id: WorkflowVersionId,
        creator_id: UserId,
        owner_id: UserId,
        current_state: ApplicationState,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: ApplicationId::generate(),
            workflow_version_id,
            creator_id,
            owner_id,
            current_state,
            submitted: None,
            submitter_id: None,
            completed: None,
            form_data: None,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted.is_some()
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    pub fn is_draft(&self) -> bool {
        self.current_state.is_draft()
    }

    /// Record the first submission
    pub fn mark_submitted(&mut self, submitter: &UserId) -> ApprovalResult<()> {
        if self.is_submitted() {
            return Err(ApprovalError::coding(
                "Cannot submit application that has already been marked submitted",
            ));
        }
        let now = Utc::now();
        self.submitted = Some(now);
        self.submitter_id = Some(submitter.clone());
        self.updated_at = now;
        Ok(())
    }

    pub fn mark_completed(&mut self) {
        let now = Utc::now();
        self.completed = Some(now);
        self.updated_at = now;
    }

    /// Overwrite the state without running any stage hooks
    pub fn set_current_state(&mut self, state: ApplicationState) {
        self.current_state = state;
        self.updated_at = Utc::now();
    }
}

// ── Progress ─────────────────────────────────────────────────────────

/// Overall progress of an application, as shown to its owner
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallProgress {
    Draft,
    InProgress,
    Finished,
    Rejected,
    Withdrawn,
}

impl OverallProgress {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InProgress => "IN_PROGRESS",
            Self::Finished => "FINISHED",
            Self::Rejected => "REJECTED",
            Self::Withdrawn => "WITHDRAWN",
        }
    }
}

impl std::fmt::Display for OverallProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StageId;

    fn application() -> Application {
        Application::new(
            WorkflowVersionId::new("wv-1"),
            UserId::new("alice"),
            UserId::new("alice"),
            ApplicationState::new(StageId::new("s-1"), true, None),
        )
    }

    #[test]
    fn test_ids_accept_non_ascii() {
        let id = ApplicationId::new("aéééé");
        assert_eq!(id.to_string(), "aéééé");
        assert_eq!(UserId::new("jürgen").to_string(), "jürgen");
    }

    #[test]
    fn test_new_application() {
        let app = application();
        assert!(app.is_draft());
        assert!(!app.is_submitted());
        assert!(!app.is_completed());
        assert_eq!(app.revision, 0);
    }

    #[test]
    fn test_mark_submitted_once() {
        let mut app = application();
        app.mark_submitted(&UserId::new("alice")).unwrap();
        let first = app.submitted;

        let err = app.mark_submitted(&UserId::new("bob")).unwrap_err();
        assert!(err.is_coding_error());
        assert!(err.to_string().contains("already been marked submitted"));
        assert_eq!(app.submitted, first);
        assert_eq!(app.submitter_id, Some(UserId::new("alice")));
    }

    #[test]
    fn test_mark_completed() {
        let mut app = application();
        app.mark_completed();
        assert!(app.is_completed());
    }

    #[test]
    fn test_progress_serialization() {
        let json = serde_json::to_string(&OverallProgress::InProgress).unwrap();
        assert_eq!(json, "\"IN_PROGRESS\"");
        assert_eq!(OverallProgress::Withdrawn.to_string(), "WITHDRAWN");
    }
}

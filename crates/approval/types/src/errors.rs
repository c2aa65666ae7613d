//! Error types for the approval domain

use crate::{ApplicationId, ApprovalLevelId, StageId, WorkflowVersionId};

/// Errors raised by approval domain operations.
///
/// `Coding` errors mean the caller invoked something in a state where it is
/// not allowed; they are never recovered from. `Model` errors are domain
/// validation failures that can be reported back to a user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    #[error("Coding error detected: {0}")]
    Coding(String),

    #[error("{0}")]
    Model(String),

    #[error("Workflow stage not found: {0}")]
    StageNotFound(StageId),

    #[error("Approval level not found: {0}")]
    ApprovalLevelNotFound(ApprovalLevelId),

    #[error("Workflow version not found: {0}")]
    WorkflowVersionNotFound(WorkflowVersionId),

    #[error("Application not found: {0}")]
    ApplicationNotFound(ApplicationId),

    #[error("Invalid activity type: Activity type {0} is not defined")]
    InvalidActivityType(i32),

    #[error("Invalid activity info: {0}")]
    InvalidActivityInfo(String),
}

impl ApprovalError {
    pub fn coding(message: impl Into<String>) -> Self {
        Self::Coding(message.into())
    }

    pub fn model(message: impl Into<String>) -> Self {
        Self::Model(message.into())
    }

    pub fn is_coding_error(&self) -> bool {
        matches!(self, Self::Coding(_))
    }

    /// Domain validation failures, including malformed activity records.
    pub fn is_model_error(&self) -> bool {
        matches!(
            self,
            Self::Model(_) | Self::InvalidActivityType(_) | Self::InvalidActivityInfo(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::StageNotFound(_)
                | Self::ApprovalLevelNotFound(_)
                | Self::WorkflowVersionNotFound(_)
                | Self::ApplicationNotFound(_)
        )
    }
}

/// Result type alias for approval domain operations
pub type ApprovalResult<T> = Result<T, ApprovalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_disjoint() {
        let coding = ApprovalError::coding("Finished stages do not have next states");
        let model = ApprovalError::model("No previous stage");
        let missing = ApprovalError::StageNotFound(StageId::new("s-1"));

        assert!(coding.is_coding_error() && !coding.is_model_error() && !coding.is_not_found());
        assert!(model.is_model_error() && !model.is_coding_error());
        assert!(missing.is_not_found() && !missing.is_model_error());
    }

    #[test]
    fn test_activity_type_message() {
        let err = ApprovalError::InvalidActivityType(-1);
        assert!(err.to_string().contains("Activity type -1 is not defined"));
        assert!(err.is_model_error());
    }
}

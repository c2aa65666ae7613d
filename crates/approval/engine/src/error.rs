//! Error types for the approval engine

use approval_store::StorageError;
use approval_types::ApprovalError;

/// Errors surfaced by [`crate::ApprovalEngine`] operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Invalid engine configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// A caller invoked an operation in a state that does not allow it
    pub fn is_coding_error(&self) -> bool {
        matches!(self, Self::Approval(e) if e.is_coding_error())
    }

    pub fn is_model_error(&self) -> bool {
        matches!(self, Self::Approval(e) if e.is_model_error())
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Approval(e) => e.is_not_found(),
            Self::Storage(StorageError::NotFound(_)) => true,
            _ => false,
        }
    }

    /// Another writer committed first; reload and retry if appropriate
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Storage(StorageError::Conflict(_)))
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

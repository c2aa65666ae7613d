//! Application actions: auditable user decisions

use crate::{ApplicationId, ApprovalLevelId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The decision an action records.
///
/// Codes are persisted and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionCode {
    Approve,
    WithdrawInApprovals,
    WithdrawBeforeSubmission,
    Submit,
    Reject,
    ResetApprovals,
}

impl ActionCode {
    pub const ALL: [ActionCode; 6] = [
        ActionCode::Approve,
        ActionCode::WithdrawInApprovals,
        ActionCode::WithdrawBeforeSubmission,
        ActionCode::Submit,
        ActionCode::Reject,
        ActionCode::ResetApprovals,
    ];

    pub fn code(&self) -> i32 {
        match self {
            Self::Approve => 1,
            Self::WithdrawInApprovals => 2,
            Self::WithdrawBeforeSubmission => 3,
            Self::Submit => 4,
            Self::Reject => 5,
            Self::ResetApprovals => 6,
        }
    }

    pub fn enum_name(&self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::WithdrawInApprovals => "WITHDRAW_IN_APPROVALS",
            Self::WithdrawBeforeSubmission => "WITHDRAW_BEFORE_SUBMISSION",
            Self::Submit => "SUBMIT",
            Self::Reject => "REJECT",
            Self::ResetApprovals => "RESET_APPROVALS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Approve => "Approve",
            Self::WithdrawInApprovals => "Withdraw",
            Self::WithdrawBeforeSubmission => "Withdraw",
            Self::Submit => "Submit",
            Self::Reject => "Reject",
            Self::ResetApprovals => "Reset approvals",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.code() == code)
    }

    pub fn from_enum(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.enum_name() == name)
    }

    pub fn is_withdrawal(&self) -> bool {
        matches!(self, Self::WithdrawInApprovals | Self::WithdrawBeforeSubmission)
    }
}

impl std::fmt::Display for ActionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.enum_name())
    }
}

/// Action append payload. Sequencing is assigned by storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewApplicationAction {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub code: ActionCode,
    /// The application's approval level when the action was taken
    pub approval_level_id: Option<ApprovalLevelId>,
    /// Snapshot of the last form submission
    pub form_data: Option<Value>,
    pub created: DateTime<Utc>,
}

/// Persistent action record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationAction {
    pub sequence: u64,
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub code: ActionCode,
    pub approval_level_id: Option<ApprovalLevelId>,
    pub form_data: Option<Value>,
    pub created: DateTime<Utc>,
    /// No longer authoritative after a corrective transition
    #[serde(default)]
    pub superseded: bool,
}

impl ApplicationAction {
    pub fn from_append(sequence: u64, action: NewApplicationAction) -> Self {
        Self {
            sequence,
            application_id: action.application_id,
            user_id: action.user_id,
            code: action.code,
            approval_level_id: action.approval_level_id,
            form_data: action.form_data,
            created: action.created,
            superseded: false,
        }
    }
}

//! Application activities: the lifecycle event trail
//!
//! Activities are append-only. State manager hooks and actions emit them;
//! nothing in the normal flow updates or removes one.

use crate::{ApplicationId, ApprovalError, ApprovalLevelId, ApprovalResult, StageId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The kind of lifecycle event an activity records.
///
/// Codes are persisted and must never be renumbered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    StageStarted,
    StageEnded,
    LevelStarted,
    LevelEnded,
    StageSubmitted,
    StageAllApproved,
    LevelApproved,
    LevelRejected,
    Finished,
    Creation,
    CommentCreated,
    CommentReplied,
    CommentUpdated,
    CommentDeleted,
    Uploaded,
    Edited,
    NotificationSent,
    Withdrawn,
    ApprovalsReset,
}

impl ActivityType {
    pub const ALL: [ActivityType; 19] = [
        ActivityType::StageStarted,
        ActivityType::StageEnded,
        ActivityType::LevelStarted,
        ActivityType::LevelEnded,
        ActivityType::StageSubmitted,
        ActivityType::StageAllApproved,
        ActivityType::LevelApproved,
        ActivityType::LevelRejected,
        ActivityType::Finished,
        ActivityType::Creation,
        ActivityType::CommentCreated,
        ActivityType::CommentReplied,
        ActivityType::CommentUpdated,
        ActivityType::CommentDeleted,
        ActivityType::Uploaded,
        ActivityType::Edited,
        ActivityType::NotificationSent,
        ActivityType::Withdrawn,
        ActivityType::ApprovalsReset,
    ];

    pub fn code(&self) -> i32 {
        match self {
            Self::StageStarted => 1,
            Self::StageEnded => 2,
            Self::LevelStarted => 3,
            Self::LevelEnded => 4,
            Self::StageSubmitted => 5,
            Self::StageAllApproved => 6,
            Self::LevelApproved => 7,
            Self::LevelRejected => 8,
            Self::Finished => 9,
            Self::Creation => 10,
            Self::CommentCreated => 11,
            Self::CommentReplied => 12,
            Self::CommentUpdated => 13,
            Self::CommentDeleted => 14,
            Self::Uploaded => 15,
            Self::Edited => 16,
            Self::NotificationSent => 17,
            Self::Withdrawn => 18,
            Self::ApprovalsReset => 19,
        }
    }

    pub fn enum_name(&self) -> &'static str {
        match self {
            Self::StageStarted => "STAGE_STARTED",
            Self::StageEnded => "STAGE_ENDED",
            Self::LevelStarted => "LEVEL_STARTED",
            Self::LevelEnded => "LEVEL_ENDED",
            Self::StageSubmitted => "STAGE_SUBMITTED",
            Self::StageAllApproved => "STAGE_ALL_APPROVED",
            Self::LevelApproved => "LEVEL_APPROVED",
            Self::LevelRejected => "LEVEL_REJECTED",
            Self::Finished => "FINISHED",
            Self::Creation => "CREATION",
            Self::CommentCreated => "COMMENT_CREATED",
            Self::CommentReplied => "COMMENT_REPLIED",
            Self::CommentUpdated => "COMMENT_UPDATED",
            Self::CommentDeleted => "COMMENT_DELETED",
            Self::Uploaded => "UPLOADED",
            Self::Edited => "EDITED",
            Self::NotificationSent => "NOTIFICATION_SENT",
            Self::Withdrawn => "WITHDRAWN",
            Self::ApprovalsReset => "APPROVALS_RESET",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StageStarted => "Stage started",
            Self::StageEnded => "Stage ended",
            Self::LevelStarted => "Level started",
            Self::LevelEnded => "Level ended",
            Self::StageSubmitted => "Submitted",
            Self::StageAllApproved => "All approvals complete",
            Self::LevelApproved => "Approved",
            Self::LevelRejected => "Rejected",
            Self::Finished => "Finished",
            Self::Creation => "Created",
            Self::CommentCreated => "Comment added",
            Self::CommentReplied => "Comment replied",
            Self::CommentUpdated => "Comment updated",
            Self::CommentDeleted => "Comment deleted",
            Self::Uploaded => "File uploaded",
            Self::Edited => "Edited",
            Self::NotificationSent => "Notification sent",
            Self::Withdrawn => "Withdrawn",
            Self::ApprovalsReset => "Approvals reset",
        }
    }

    /// Look up a registered activity kind
    pub fn from_code(code: i32) -> ApprovalResult<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or(ApprovalError::InvalidActivityType(code))
    }

    /// Check the extra context carried with an activity of this kind.
    ///
    /// The info must be a JSON list or map; an empty list is accepted by
    /// every kind except `notification_sent`.
    pub fn is_valid_info(&self, info: &Value) -> bool {
        let fields = match info {
            Value::Array(items) if items.is_empty() => None,
            Value::Array(_) => return !self.requires_fields(),
            Value::Object(map) => Some(map),
            _ => return false,
        };

        match self {
            Self::Creation => fields
                .and_then(|m| m.get("source"))
                .map_or(true, |source| source.as_str().is_some_and(|s| !s.is_empty())),
            Self::NotificationSent => fields.is_some_and(|m| {
                ["resolver_class_name", "recipient_class_name"]
                    .iter()
                    .all(|key| m.get(*key).and_then(Value::as_str).is_some_and(|s| !s.is_empty()))
            }),
            _ => true,
        }
    }

    fn requires_fields(&self) -> bool {
        matches!(self, Self::NotificationSent)
    }

    pub fn validate_info(&self, info: &Value) -> ApprovalResult<()> {
        if self.is_valid_info(info) {
            Ok(())
        } else {
            Err(ApprovalError::InvalidActivityInfo(format!(
                "{} does not accept {}",
                self, info
            )))
        }
    }
}

impl std::fmt::Display for ActivityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.enum_name().to_ascii_lowercase())
    }
}

/// Decode raw activity info, which must be a JSON list or map
pub fn parse_activity_info(raw: &str) -> ApprovalResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|e| ApprovalError::InvalidActivityInfo(e.to_string()))?;
    match value {
        Value::Array(_) | Value::Object(_) => Ok(value),
        other => Err(ApprovalError::InvalidActivityInfo(format!(
            "expected a list, got {}",
            other
        ))),
    }
}

/// Activity append payload. Sequencing is assigned by storage.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewApplicationActivity {
    pub application_id: ApplicationId,
    pub user_id: Option<UserId>,
    pub activity_type: ActivityType,
    pub stage_id: StageId,
    pub approval_level_id: Option<ApprovalLevelId>,
    pub activity_info: Value,
    pub timestamp: DateTime<Utc>,
}

/// Persistent activity record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApplicationActivity {
    pub sequence: u64,
    pub application_id: ApplicationId,
    /// `None` for events raised by the system rather than a user
    pub user_id: Option<UserId>,
    pub activity_type: ActivityType,
    pub stage_id: StageId,
    pub approval_level_id: Option<ApprovalLevelId>,
    pub activity_info: Value,
    pub timestamp: DateTime<Utc>,
}

impl ApplicationActivity {
    pub fn from_append(sequence: u64, activity: NewApplicationActivity) -> Self {
        Self {
            sequence,
            application_id: activity.application_id,
            user_id: activity.user_id,
            activity_type: activity.activity_type,
            stage_id: activity.stage_id,
            approval_level_id: activity.approval_level_id,
            activity_info: activity.activity_info,
            timestamp: activity.timestamp,
        }
    }
}

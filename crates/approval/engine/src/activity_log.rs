//! Activity log: append-only lifecycle events
//!
//! Every activity captures the stage and approval level of the
//! application's state at the moment it is recorded. The level is dropped
//! once the application sits on a finished stage.

use crate::journal::TransitionJournal;
use approval_types::{
    parse_activity_info, ActivityType, ApprovalResult, NewApplicationActivity, StageType, UserId,
};
use chrono::Utc;
use serde_json::Value;

/// Record an activity of `activity_type` against the journal's application
pub fn create(
    journal: &mut TransitionJournal<'_>,
    user_id: Option<&UserId>,
    activity_type: ActivityType,
    activity_info: Value,
) -> ApprovalResult<()> {
    activity_type.validate_info(&activity_info)?;

    let state = journal.current_state();
    let stage = state.stage(journal.version())?;
    let approval_level_id = if stage.stage_type == StageType::Finished {
        None
    } else {
        state.approval_level(journal.version())?.map(|l| l.id.clone())
    };

    let activity = NewApplicationActivity {
        application_id: journal.application().id.clone(),
        user_id: user_id.cloned(),
        activity_type,
        stage_id: stage.id.clone(),
        approval_level_id,
        activity_info,
        timestamp: Utc::now(),
    };
    tracing::debug!(
        application_id = %activity.application_id,
        activity = %activity_type,
        stage_id = %activity.stage_id,
        "Recording activity"
    );
    journal.push_activity(activity);
    Ok(())
}

/// Record an activity with no extra context
pub fn create_empty(
    journal: &mut TransitionJournal<'_>,
    user_id: Option<&UserId>,
    activity_type: ActivityType,
) -> ApprovalResult<()> {
    create(journal, user_id, activity_type, Value::Array(Vec::new()))
}

/// Record an activity from its persisted code and raw JSON info
pub fn create_raw(
    journal: &mut TransitionJournal<'_>,
    user_id: Option<&UserId>,
    activity_code: i32,
    activity_info: &str,
) -> ApprovalResult<()> {
    let activity_type = ActivityType::from_code(activity_code)?;
    let info = parse_activity_info(activity_info)?;
    create(journal, user_id, activity_type, info)
}

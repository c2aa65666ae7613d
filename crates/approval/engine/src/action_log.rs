//! Application action log: supersedable decision records

use crate::journal::TransitionJournal;
use approval_store::Supersession;
use approval_types::{
    ActionCode, ApprovalError, ApprovalResult, NewApplicationAction, StageId, StageType, UserId,
};
use chrono::Utc;

/// Record a decision at the application's current approval level
pub fn create(
    journal: &mut TransitionJournal<'_>,
    user_id: &UserId,
    code: ActionCode,
) -> ApprovalResult<()> {
    let application = journal.application();
    let approval_level_id = application
        .current_state
        .approval_level(journal.version())?
        .map(|l| l.id.clone());

    let action = NewApplicationAction {
        application_id: application.id.clone(),
        user_id: user_id.clone(),
        code,
        approval_level_id,
        form_data: application.form_data.clone(),
        created: Utc::now(),
    };
    tracing::debug!(
        application_id = %action.application_id,
        action = %code,
        user_id = %user_id,
        "Recording action"
    );
    journal.push_action(action);
    Ok(())
}

/// Supersede every earlier action of the application recorded against a
/// level of `stage_id`. Applied as one set-based update when the journal
/// commits, before the journal's own actions are appended.
pub fn supersede_actions_for_stage(
    journal: &mut TransitionJournal<'_>,
    stage_id: &StageId,
) -> ApprovalResult<()> {
    let stage = journal.version().stage(stage_id)?;
    if stage.stage_type != StageType::Approvals {
        return Err(ApprovalError::coding(format!(
            "Cannot supersede actions of stage '{}' which is not an approvals stage",
            stage.name
        )));
    }
    let approval_level_ids = stage.approval_levels.iter().map(|l| l.id.clone()).collect();
    let supersession = Supersession {
        application_id: journal.application().id.clone(),
        approval_level_ids,
    };
    journal.push_supersession(supersession);
    Ok(())
}

/// Supersede the actions of every approvals stage that follows
/// `stage_id`, up to the next form submission or finished stage. Those
/// are the stages a submission from `stage_id` will route through.
pub fn supersede_actions_ahead_of(
    journal: &mut TransitionJournal<'_>,
    stage_id: &StageId,
) -> ApprovalResult<()> {
    let version = journal.version();
    let start = version.stage(stage_id)?.ordinal;
    let ahead: Vec<StageId> = version
        .stages
        .iter()
        .filter(|s| s.ordinal > start)
        .take_while(|s| !matches!(s.stage_type, StageType::FormSubmission | StageType::Finished))
        .filter(|s| s.stage_type == StageType::Approvals)
        .map(|s| s.id.clone())
        .collect();
    for id in &ahead {
        supersede_actions_for_stage(journal, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::testing::{build_workflow, draft_application, two_level_workflow};
    use approval_types::{Application, ApplicationState, ApprovalLevelId};
    use serde_json::json;

    #[test]
    fn test_action_carries_current_level_and_form_data() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut app = draft_application(&fixture);
        app.form_data = Some(json!({"days": 3}));
        app.current_state =
            ApplicationState::new(fixture.approvals.clone(), false, Some(fixture.levels[0].clone()));
        let mut journal = TransitionJournal::new(&fixture.version, &config, app);

        create(&mut journal, &UserId::new("boss"), ActionCode::Approve).unwrap();
        let action = &journal.actions()[0];
        assert_eq!(action.code, ActionCode::Approve);
        assert_eq!(action.approval_level_id, Some(fixture.levels[0].clone()));
        assert_eq!(action.form_data, Some(json!({"days": 3})));
    }

    #[test]
    fn test_action_on_form_stage_has_no_level() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));
        create(&mut journal, &UserId::new("alice"), ActionCode::Submit).unwrap();
        assert!(journal.actions()[0].approval_level_id.is_none());
    }

    #[test]
    fn test_supersession_targets_stage_levels() {
        let fixture = two_level_workflow().unwrap();
        let config = EngineConfig::default();
        let mut journal =
            TransitionJournal::new(&fixture.version, &config, draft_application(&fixture));

        supersede_actions_for_stage(&mut journal, &fixture.approvals).unwrap();
        assert_eq!(journal.supersessions()[0].approval_level_ids, fixture.levels);

        let err = supersede_actions_for_stage(&mut journal, &fixture.form).unwrap_err();
        assert!(err.is_coding_error());
    }

    #[test]
    fn test_supersede_ahead_covers_consecutive_approvals_stages() {
        let version = build_workflow(
            "Two rounds",
            &[
                ("Form", StageType::FormSubmission, 0),
                ("First review", StageType::Approvals, 1),
                ("Hold", StageType::Waiting, 0),
                ("Second review", StageType::Approvals, 2),
                ("Done", StageType::Finished, 0),
            ],
        )
        .unwrap();
        let config = EngineConfig::default();
        let app = Application::new(
            version.id.clone(),
            UserId::new("a"),
            UserId::new("a"),
            ApplicationState::new(version.stages[0].id.clone(), true, None),
        );
        let mut journal = TransitionJournal::new(&version, &config, app);

        supersede_actions_ahead_of(&mut journal, &version.stages[0].id).unwrap();
        let targeted: Vec<Vec<ApprovalLevelId>> = journal
            .supersessions()
            .iter()
            .map(|s| s.approval_level_ids.clone())
            .collect();
        let expected: Vec<Vec<ApprovalLevelId>> = [1, 3]
            .iter()
            .map(|i| version.stages[*i].approval_levels.iter().map(|l| l.id.clone()).collect())
            .collect();
        assert_eq!(targeted, expected);
    }
}

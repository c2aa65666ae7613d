//! In-memory reference implementation of the approval storage traits.
//!
//! This adapter is deterministic and test-friendly. Production deployments
//! should put a transactional backend behind the same traits.

use crate::model::{CommitReceipt, TransitionCommit};
use crate::traits::{
    ActionStore, ActivityStore, ApplicationStore, QueryWindow, TransitionStore, WorkflowStore,
};
use crate::{StorageError, StorageResult};
use approval_types::{
    Application, ApplicationAction, ApplicationActivity, ApplicationId, ApprovalLevelId,
    WorkflowVersion, WorkflowVersionId,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory approval storage adapter.
///
/// Locks are always taken in the order applications, actions, activities.
#[derive(Default)]
pub struct InMemoryApprovalStorage {
    versions: RwLock<HashMap<WorkflowVersionId, WorkflowVersion>>,
    applications: RwLock<HashMap<ApplicationId, Application>>,
    actions: RwLock<Vec<ApplicationAction>>,
    activities: RwLock<Vec<ApplicationActivity>>,
}

/// Serializable copy of the whole store, used for fixtures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSnapshot {
    pub versions: Vec<WorkflowVersion>,
    pub applications: Vec<Application>,
    pub actions: Vec<ApplicationAction>,
    pub activities: Vec<ApplicationActivity>,
}

impl InMemoryApprovalStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StorageResult<StorageSnapshot> {
        let mut versions: Vec<WorkflowVersion> = read(&self.versions, "versions")?
            .values()
            .cloned()
            .collect();
        versions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let mut applications: Vec<Application> = read(&self.applications, "applications")?
            .values()
            .cloned()
            .collect();
        applications.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(StorageSnapshot {
            versions,
            applications,
            actions: read(&self.actions, "actions")?.clone(),
            activities: read(&self.activities, "activities")?.clone(),
        })
    }

    pub fn from_snapshot(snapshot: StorageSnapshot) -> Self {
        Self {
            versions: RwLock::new(
                snapshot
                    .versions
                    .into_iter()
                    .map(|v| (v.id.clone(), v))
                    .collect(),
            ),
            applications: RwLock::new(
                snapshot
                    .applications
                    .into_iter()
                    .map(|a| (a.id.clone(), a))
                    .collect(),
            ),
            actions: RwLock::new(snapshot.actions),
            activities: RwLock::new(snapshot.activities),
        }
    }

    pub fn to_json(&self) -> StorageResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot()?)?)
    }

    pub fn from_json(json: &str) -> StorageResult<Self> {
        let snapshot: StorageSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

fn read<'a, T>(lock: &'a RwLock<T>, name: &str) -> StorageResult<RwLockReadGuard<'a, T>> {
    lock.read()
        .map_err(|_| StorageError::Backend(format!("{} lock poisoned", name)))
}

fn write<'a, T>(lock: &'a RwLock<T>, name: &str) -> StorageResult<RwLockWriteGuard<'a, T>> {
    lock.write()
        .map_err(|_| StorageError::Backend(format!("{} lock poisoned", name)))
}

fn supersede_in(
    actions: &mut [ApplicationAction],
    application_id: &ApplicationId,
    approval_level_ids: &[ApprovalLevelId],
) -> usize {
    let levels: HashSet<&ApprovalLevelId> = approval_level_ids.iter().collect();
    let mut changed = 0;
    for action in actions.iter_mut().filter(|a| {
        !a.superseded
            && &a.application_id == application_id
            && a.approval_level_id.as_ref().is_some_and(|l| levels.contains(l))
    }) {
        action.superseded = true;
        changed += 1;
    }
    changed
}

impl WorkflowStore for InMemoryApprovalStorage {
    fn save_workflow_version(&self, version: WorkflowVersion) -> StorageResult<()> {
        let mut guard = write(&self.versions, "versions")?;
        guard.insert(version.id.clone(), version);
        Ok(())
    }

    fn get_workflow_version(&self, id: &WorkflowVersionId) -> StorageResult<Option<WorkflowVersion>> {
        let guard = read(&self.versions, "versions")?;
        Ok(guard.get(id).cloned())
    }

    fn list_workflow_versions(&self, window: QueryWindow) -> StorageResult<Vec<WorkflowVersion>> {
        let guard = read(&self.versions, "versions")?;
        let mut values: Vec<WorkflowVersion> = guard.values().cloned().collect();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_window(values, window))
    }
}

impl ApplicationStore for InMemoryApprovalStorage {
    fn get_application(&self, id: &ApplicationId) -> StorageResult<Option<Application>> {
        let guard = read(&self.applications, "applications")?;
        Ok(guard.get(id).cloned())
    }

    fn list_applications(&self, window: QueryWindow) -> StorageResult<Vec<Application>> {
        let guard = read(&self.applications, "applications")?;
        let mut values: Vec<Application> = guard.values().cloned().collect();
        values.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_window(values, window))
    }

    fn delete_application(&self, id: &ApplicationId) -> StorageResult<()> {
        let mut applications = write(&self.applications, "applications")?;
        let mut actions = write(&self.actions, "actions")?;
        let mut activities = write(&self.activities, "activities")?;

        if applications.remove(id).is_none() {
            return Err(StorageError::NotFound(format!("application {}", id)));
        }
        actions.retain(|a| &a.application_id != id);
        activities.retain(|a| &a.application_id != id);
        Ok(())
    }
}

impl ActionStore for InMemoryApprovalStorage {
    fn list_actions(&self, application_id: &ApplicationId) -> StorageResult<Vec<ApplicationAction>> {
        let guard = read(&self.actions, "actions")?;
        Ok(guard
            .iter()
            .filter(|a| &a.application_id == application_id)
            .cloned()
            .collect())
    }

    fn supersede_actions_for_levels(
        &self,
        application_id: &ApplicationId,
        approval_level_ids: &[ApprovalLevelId],
    ) -> StorageResult<usize> {
        let mut guard = write(&self.actions, "actions")?;
        Ok(supersede_in(&mut guard, application_id, approval_level_ids))
    }
}

impl ActivityStore for InMemoryApprovalStorage {
    fn list_activities(
        &self,
        application_id: &ApplicationId,
    ) -> StorageResult<Vec<ApplicationActivity>> {
        let guard = read(&self.activities, "activities")?;
        Ok(guard
            .iter()
            .filter(|a| &a.application_id == application_id)
            .cloned()
            .collect())
    }
}

impl TransitionStore for InMemoryApprovalStorage {
    fn commit(&self, commit: TransitionCommit) -> StorageResult<CommitReceipt> {
        let TransitionCommit {
            mut application,
            expected_revision,
            supersessions,
            actions: new_actions,
            activities: new_activities,
        } = commit;
        let id = application.id.clone();

        let foreign = supersessions.iter().any(|s| s.application_id != id)
            || new_actions.iter().any(|a| a.application_id != id)
            || new_activities.iter().any(|a| a.application_id != id);
        if foreign {
            return Err(StorageError::InvalidInput(format!(
                "commit for application {} carries records of another application",
                id
            )));
        }

        let mut applications = write(&self.applications, "applications")?;
        let mut actions = write(&self.actions, "actions")?;
        let mut activities = write(&self.activities, "activities")?;

        let stored_revision = applications.get(&id).map(|a| a.revision);
        match (expected_revision, stored_revision) {
            (None, None) => application.revision = 1,
            (None, Some(_)) => {
                return Err(StorageError::Conflict(format!(
                    "application {} already exists",
                    id
                )))
            }
            (Some(_), None) => {
                return Err(StorageError::NotFound(format!("application {}", id)));
            }
            (Some(expected), Some(stored)) if expected != stored => {
                return Err(StorageError::Conflict(format!(
                    "application {} is at revision {}, expected {}",
                    id, stored, expected
                )));
            }
            (Some(expected), Some(_)) => application.revision = expected + 1,
        }

        // Validation is complete; nothing below can fail.
        let superseded: usize = supersessions
            .iter()
            .map(|s| supersede_in(&mut actions, &s.application_id, &s.approval_level_ids))
            .sum();

        let mut next_action = actions.last().map_or(0, |a| a.sequence) + 1;
        let mut recorded_actions = Vec::with_capacity(new_actions.len());
        for action in new_actions {
            let record = ApplicationAction::from_append(next_action, action);
            next_action += 1;
            actions.push(record.clone());
            recorded_actions.push(record);
        }

        let mut next_activity = activities.last().map_or(0, |a| a.sequence) + 1;
        let mut recorded_activities = Vec::with_capacity(new_activities.len());
        for activity in new_activities {
            let record = ApplicationActivity::from_append(next_activity, activity);
            next_activity += 1;
            activities.push(record.clone());
            recorded_activities.push(record);
        }

        applications.insert(id, application.clone());

        Ok(CommitReceipt {
            application,
            actions: recorded_actions,
            activities: recorded_activities,
            superseded,
        })
    }
}

fn apply_window<T>(items: Vec<T>, window: QueryWindow) -> Vec<T> {
    let iter = items.into_iter().skip(window.offset);
    if window.limit == 0 {
        iter.collect()
    } else {
        iter.take(window.limit).collect()
    }
}

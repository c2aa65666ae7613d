//! Workflow versions: the stages and approval levels an application moves through
//!
//! A WorkflowVersion is an ordered list of typed stages. Approvals stages
//! carry a ladder of approval levels ordered by priority.
//!
//! Versions are edited while in draft. Once activated the structure is
//! frozen; to change it, create a new version.

use crate::{ApprovalError, ApprovalResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ── Identifiers ──────────────────────────────────────────────────────

/// Unique identifier for a workflow version
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowVersionId(pub String);

impl WorkflowVersionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for WorkflowVersionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a workflow stage
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StageId(pub String);

impl StageId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for StageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an approval level
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApprovalLevelId(pub String);

impl ApprovalLevelId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for ApprovalLevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ── Stage Types ──────────────────────────────────────────────────────

/// The fixed set of stage types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageType {
    FormSubmission,
    Approvals,
    Waiting,
    Finished,
}

impl StageType {
    pub const ALL: [StageType; 4] = [
        StageType::FormSubmission,
        StageType::Approvals,
        StageType::Waiting,
        StageType::Finished,
    ];

    /// Stable integer code, as persisted on a stage row.
    pub fn code(&self) -> i32 {
        match self {
            Self::FormSubmission => 1,
            Self::Approvals => 2,
            Self::Waiting => 3,
            Self::Finished => 4,
        }
    }

    /// Stable enum name, as exchanged with API layers.
    pub fn enum_name(&self) -> &'static str {
        match self {
            Self::FormSubmission => "FORM_SUBMISSION",
            Self::Approvals => "APPROVALS",
            Self::Waiting => "WAITING",
            Self::Finished => "FINISHED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::FormSubmission => "Form submission",
            Self::Approvals => "Approvals",
            Self::Waiting => "Waiting",
            Self::Finished => "Finished",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FormSubmission => "form_submission",
            Self::Approvals => "approvals",
            Self::Waiting => "waiting",
            Self::Finished => "finished",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.code() == code)
    }

    pub fn from_enum(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.enum_name() == name)
    }
}

impl std::fmt::Display for StageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Stages and Levels ────────────────────────────────────────────────

/// An ordered decision step inside an approvals stage
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    pub id: ApprovalLevelId,
    pub name: String,
    /// 1-based position within the stage; level 1 is entered first
    pub priority: u32,
}

/// A typed step of a workflow version
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowStage {
    pub id: StageId,
    pub name: String,
    /// 1-based position within the version
    pub ordinal: u32,
    pub stage_type: StageType,
    /// Ordered by priority. Empty for every type except approvals.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub approval_levels: Vec<ApprovalLevel>,
}

impl WorkflowStage {
    pub fn is_type(&self, stage_type: StageType) -> bool {
        self.stage_type == stage_type
    }

    pub fn approval_level(&self, id: &ApprovalLevelId) -> Option<&ApprovalLevel> {
        self.approval_levels.iter().find(|l| &l.id == id)
    }

    fn renumber_levels(&mut self) {
        for (idx, level) in self.approval_levels.iter_mut().enumerate() {
            level.priority = idx as u32 + 1;
        }
    }
}

/// Lifecycle status of a workflow version
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionStatus {
    Draft,
    Active,
    Archived,
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Draft => write!(f, "draft"),
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

pub const DEFAULT_APPROVAL_LEVEL_NAME: &str = "Level 1";

// ── Workflow Version ─────────────────────────────────────────────────

/// A versioned definition of stages and approval levels
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkflowVersion {
    pub id: WorkflowVersionId,
    pub name: String,
    pub status: VersionStatus,
    /// Ordered by ordinal
    pub stages: Vec<WorkflowStage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowVersion {
    /// Create an empty draft version
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowVersionId::generate(),
            name: name.into(),
            status: VersionStatus::Draft,
            stages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }

    pub fn is_active(&self) -> bool {
        self.status == VersionStatus::Active
    }

    fn ensure_draft(&self, message: &str) -> ApprovalResult<()> {
        if self.is_draft() {
            Ok(())
        } else {
            Err(ApprovalError::model(message))
        }
    }

    fn stage_position(&self, id: &StageId) -> Option<usize> {
        self.stages.iter().position(|s| &s.id == id)
    }

    fn renumber_stages(&mut self) {
        for (idx, stage) in self.stages.iter_mut().enumerate() {
            stage.ordinal = idx as u32 + 1;
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    // ── Stage editing ────────────────────────────────────────────────

    /// Add a stage.
    ///
    /// Finished stages are appended; every other type is inserted before
    /// the first finished stage. Approvals stages start with a single
    /// default level.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        stage_type: StageType,
    ) -> ApprovalResult<StageId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApprovalError::coding("name cannot be empty"));
        }
        self.ensure_draft("Can only add stage to a draft workflow version")?;

        let approval_levels = if stage_type == StageType::Approvals {
            vec![ApprovalLevel {
                id: ApprovalLevelId::generate(),
                name: DEFAULT_APPROVAL_LEVEL_NAME.to_string(),
                priority: 1,
            }]
        } else {
            Vec::new()
        };
        let stage = WorkflowStage {
            id: StageId::generate(),
            name,
            ordinal: 0,
            stage_type,
            approval_levels,
        };
        let id = stage.id.clone();

        let insert_at = if stage_type == StageType::Finished {
            self.stages.len()
        } else {
            self.stages
                .iter()
                .position(|s| s.stage_type == StageType::Finished)
                .unwrap_or(self.stages.len())
        };
        self.stages.insert(insert_at, stage);
        self.renumber_stages();
        self.touch();
        Ok(id)
    }

    pub fn delete_stage(&mut self, id: &StageId) -> ApprovalResult<()> {
        self.ensure_draft("Can only delete stage from a draft workflow version")?;
        let pos = self
            .stage_position(id)
            .ok_or_else(|| ApprovalError::coding("Cannot delete a foreign stage"))?;
        self.stages.remove(pos);
        self.renumber_stages();
        self.touch();
        Ok(())
    }

    pub fn rename_stage(&mut self, id: &StageId, name: impl Into<String>) -> ApprovalResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApprovalError::coding("name cannot be empty"));
        }
        self.ensure_draft("Can only edit stage of a draft workflow version")?;
        let stage = self.stage_mut(id)?;
        stage.name = name;
        self.touch();
        Ok(())
    }

    // ── Approval level editing ───────────────────────────────────────

    pub fn add_approval_level(
        &mut self,
        stage_id: &StageId,
        name: impl Into<String>,
    ) -> ApprovalResult<ApprovalLevelId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApprovalError::coding("name cannot be empty"));
        }
        self.ensure_draft("Can only add approval level to a draft workflow version")?;
        let stage = self.approvals_stage_mut(stage_id)?;
        let id = ApprovalLevelId::generate();
        stage.approval_levels.push(ApprovalLevel {
            id: id.clone(),
            name,
            priority: 0,
        });
        stage.renumber_levels();
        self.touch();
        Ok(id)
    }

    pub fn delete_approval_level(&mut self, level_id: &ApprovalLevelId) -> ApprovalResult<()> {
        self.ensure_draft("Can only delete approval level from a draft workflow version")?;
        let stage_id = self.stage_of_approval_level(level_id)?.id.clone();
        let stage = self.stage_mut(&stage_id)?;
        if stage.approval_levels.len() == 1 {
            return Err(ApprovalError::model("Cannot delete the last approval level"));
        }
        stage.approval_levels.retain(|l| &l.id != level_id);
        stage.renumber_levels();
        self.touch();
        Ok(())
    }

    pub fn rename_approval_level(
        &mut self,
        level_id: &ApprovalLevelId,
        name: impl Into<String>,
    ) -> ApprovalResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ApprovalError::coding("name cannot be empty"));
        }
        self.ensure_draft("Can only edit approval level of a draft workflow version")?;
        let level = self
            .stages
            .iter_mut()
            .flat_map(|s| s.approval_levels.iter_mut())
            .find(|l| &l.id == level_id)
            .ok_or_else(|| ApprovalError::ApprovalLevelNotFound(level_id.clone()))?;
        level.name = name;
        self.touch();
        Ok(())
    }

    /// Reorder the levels of an approvals stage. `order` must name every
    /// level of the stage exactly once; priorities are renumbered 1..N.
    pub fn reorder_approval_levels(
        &mut self,
        stage_id: &StageId,
        order: &[ApprovalLevelId],
    ) -> ApprovalResult<()> {
        self.ensure_draft("Can only reorder approval levels of a draft workflow version")?;
        let stage = self.approvals_stage_mut(stage_id)?;

        let existing: HashSet<&ApprovalLevelId> =
            stage.approval_levels.iter().map(|l| &l.id).collect();
        let requested: HashSet<&ApprovalLevelId> = order.iter().collect();
        if order.len() != existing.len() || requested != existing {
            return Err(ApprovalError::coding(
                "Approval level order must include every level exactly once",
            ));
        }

        let mut reordered = Vec::with_capacity(order.len());
        for id in order {
            if let Some(level) = stage.approval_levels.iter().find(|l| &l.id == id) {
                reordered.push(level.clone());
            }
        }
        stage.approval_levels = reordered;
        stage.renumber_levels();
        self.touch();
        Ok(())
    }

    fn stage_mut(&mut self, id: &StageId) -> ApprovalResult<&mut WorkflowStage> {
        self.stages
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| ApprovalError::StageNotFound(id.clone()))
    }

    fn approvals_stage_mut(&mut self, id: &StageId) -> ApprovalResult<&mut WorkflowStage> {
        let stage = self.stage_mut(id)?;
        if stage.stage_type != StageType::Approvals {
            return Err(ApprovalError::coding(
                "Approval levels can only be added to an approvals stage",
            ));
        }
        Ok(stage)
    }

    // ── Query methods ────────────────────────────────────────────────

    pub fn stage(&self, id: &StageId) -> ApprovalResult<&WorkflowStage> {
        self.find_stage(id)
            .ok_or_else(|| ApprovalError::StageNotFound(id.clone()))
    }

    pub fn find_stage(&self, id: &StageId) -> Option<&WorkflowStage> {
        self.stages.iter().find(|s| &s.id == id)
    }

    pub fn first_stage(&self) -> Option<&WorkflowStage> {
        self.stages.first()
    }

    /// The stage after `id`, or `None` if `id` is the last stage
    pub fn next_stage(&self, id: &StageId) -> ApprovalResult<Option<&WorkflowStage>> {
        let pos = self
            .stage_position(id)
            .ok_or_else(|| ApprovalError::StageNotFound(id.clone()))?;
        Ok(self.stages.get(pos + 1))
    }

    /// The stage before `id`, or `None` if `id` is the first stage
    pub fn previous_stage(&self, id: &StageId) -> ApprovalResult<Option<&WorkflowStage>> {
        let pos = self
            .stage_position(id)
            .ok_or_else(|| ApprovalError::StageNotFound(id.clone()))?;
        Ok(pos.checked_sub(1).and_then(|p| self.stages.get(p)))
    }

    pub fn stages_of_type(&self, stage_type: StageType) -> impl Iterator<Item = &WorkflowStage> {
        self.stages.iter().filter(move |s| s.stage_type == stage_type)
    }

    pub fn approval_level(&self, id: &ApprovalLevelId) -> ApprovalResult<&ApprovalLevel> {
        self.stages
            .iter()
            .find_map(|s| s.approval_level(id))
            .ok_or_else(|| ApprovalError::ApprovalLevelNotFound(id.clone()))
    }

    pub fn stage_of_approval_level(&self, id: &ApprovalLevelId) -> ApprovalResult<&WorkflowStage> {
        self.stages
            .iter()
            .find(|s| s.approval_level(id).is_some())
            .ok_or_else(|| ApprovalError::ApprovalLevelNotFound(id.clone()))
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Check the structure is routable
    pub fn validate(&self) -> ApprovalResult<()> {
        let first = self
            .first_stage()
            .ok_or_else(|| ApprovalError::model("Workflow version has no stages"))?;
        if first.stage_type != StageType::FormSubmission {
            return Err(ApprovalError::model(
                "The first stage of a workflow version must be a form submission stage",
            ));
        }

        let first_finished = self
            .stages
            .iter()
            .position(|s| s.stage_type == StageType::Finished)
            .ok_or_else(|| ApprovalError::model("Workflow version has no finished stage"))?;
        if self.stages[first_finished..]
            .iter()
            .any(|s| s.stage_type != StageType::Finished)
        {
            return Err(ApprovalError::model(
                "Only finished stages may follow a finished stage",
            ));
        }

        if let Some(stage) = self
            .stages_of_type(StageType::Approvals)
            .find(|s| s.approval_levels.is_empty())
        {
            return Err(ApprovalError::model(format!(
                "Approvals stage '{}' has no approval levels",
                stage.name
            )));
        }
        Ok(())
    }

    pub fn activate(&mut self) -> ApprovalResult<()> {
        self.ensure_draft("Only a draft workflow version can be activated")?;
        self.validate()?;
        self.status = VersionStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn archive(&mut self) -> ApprovalResult<()> {
        if self.status != VersionStatus::Active {
            return Err(ApprovalError::model(
                "Only an active workflow version can be archived",
            ));
        }
        self.status = VersionStatus::Archived;
        self.touch();
        Ok(())
    }
}

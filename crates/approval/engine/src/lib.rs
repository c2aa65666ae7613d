//! Approval Workflow Engine
//!
//! Moves applications through the stages of a workflow version and keeps
//! their audit trail.
//!
//! # Architecture
//!
//! ```text
//! ApprovalEngine ──▶ Action (submit, approve, reject, …)
//!       │                 │
//!       │                 ▼
//!       │          TransitionJournal ──▶ StateManager (one per stage type)
//!       │                 │                    │
//!       │                 │                    ▼
//!       │                 │           ApprovalLevelLadder
//!       ▼                 ▼
//!  ApprovalStorage ◀── TransitionCommit (application + actions + activities)
//! ```
//!
//! Every state change runs the exit hook of the stage being left and the
//! entry hook of the stage being entered. Hooks and actions only write
//! into the journal; storage sees the whole transition in one commit.
//!
//! # Example
//!
//! ```
//! use approval_engine::ApprovalEngine;
//! use approval_store::InMemoryApprovalStorage;
//! use approval_types::{ActionCode, OverallProgress, StageType, UserId, WorkflowVersion};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut version = WorkflowVersion::new("Expense claim");
//! version.add_stage("Claim", StageType::FormSubmission)?;
//! version.add_stage("Manager review", StageType::Approvals)?;
//! version.add_stage("Paid", StageType::Finished)?;
//! version.activate()?;
//! let version_id = version.id.clone();
//!
//! let engine = ApprovalEngine::new(Arc::new(InMemoryApprovalStorage::new()));
//! engine.save_workflow_version(version)?;
//!
//! let alice = UserId::new("alice");
//! let app = engine.create_application(&version_id, &alice, &alice)?;
//! engine.execute(&app.id, ActionCode::Submit, &alice)?;
//! engine.execute(&app.id, ActionCode::Approve, &UserId::new("manager"))?;
//! assert_eq!(engine.overall_progress(&app.id)?, OverallProgress::Finished);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]

pub mod action_log;
pub mod actions;
pub mod activity_log;
pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod level_ladder;
pub mod progress;
pub mod stage_type;
pub mod state_manager;
pub mod telemetry;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use actions::{action, action_by_enum, Action};
pub use config::{EngineConfig, ReturnStageRule};
pub use engine::ApprovalEngine;
pub use error::{EngineError, EngineResult};
pub use journal::TransitionJournal;
pub use level_ladder::ApprovalLevelLadder;
pub use stage_type::{descriptor, registry, state_manager, StageTypeDescriptor};
pub use state_manager::StateManager;
pub use telemetry::init_tracing;

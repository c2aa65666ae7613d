//! Approval Workflow Domain Types
//!
//! An **application** is routed through the ordered stages of a
//! **workflow version**. Its position is captured by an
//! [`ApplicationState`]: the stage it sits on, whether it is still a draft,
//! and (inside an approvals stage) the approval level awaiting a decision.
//!
//! # Key Concepts
//!
//! - **WorkflowVersion**: the stages and approval levels an application
//!   moves through. Editable while in draft, frozen once active.
//! - **StageType**: one of form submission, approvals, waiting or finished.
//!   The type decides how an application enters, leaves and advances
//!   through the stage.
//! - **ApplicationState**: value object, compared structurally.
//! - **ApplicationAction**: a decision (submit, approve, reject, withdraw,
//!   reset) made by a user. Actions can later be superseded.
//! - **ApplicationActivity**: a lifecycle event such as a stage or level
//!   starting or ending.
//!
//! This crate holds data only. Transition rules live in `approval-engine`
//! and persistence in `approval-store`.

#![deny(unsafe_code)]

mod action;
mod activity;
mod application;
mod errors;
mod state;
mod workflow;

pub use action::*;
pub use activity::*;
pub use application::*;
pub use errors::*;
pub use state::*;
pub use workflow::*;

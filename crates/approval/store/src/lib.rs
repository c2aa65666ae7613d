//! Storage abstractions for approval workflows.
//!
//! This crate defines the persistence contract the approval engine relies
//! on:
//! - workflow versions (stages and approval levels)
//! - application rows carrying the current state
//! - the supersedable action log
//! - the append-only activity log
//!
//! Every engine operation writes through a single [`TransitionCommit`], so
//! the application row, its new audit records and any supersession land
//! together or not at all. Application rows carry a revision that the
//! commit checks, which gives callers optimistic concurrency without
//! holding locks across a request.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
mod model;
mod traits;

pub use error::{StorageError, StorageResult};
pub use memory::{InMemoryApprovalStorage, StorageSnapshot};
pub use model::{CommitReceipt, Supersession, TransitionCommit};
pub use traits::{
    ActionStore, ActivityStore, ApplicationStore, ApprovalStorage, QueryWindow, TransitionStore,
    WorkflowStore,
};

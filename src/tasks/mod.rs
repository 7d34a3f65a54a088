//! # Task descriptors and the readiness protocol.
//!
//! This module provides the scheduling records:
//! - [`Task`] - prioritized unit dispatched to workers
//! - [`DeferredTask`] - dispatch-thread-only unit that may register more work
//! - [`Job`] - a task picked for execution
//! - [`Readiness`], [`TaskReady`] - elapsed-time-indexed readiness predicate
//! - [`TaskId`], [`TaskPriority`], [`TaskTraceInfo`] - descriptor metadata

mod id;
mod priority;
mod readiness;
mod task;
mod trace;

pub(crate) use id::TaskIdGen;

pub use id::TaskId;
pub use priority::TaskPriority;
pub use readiness::{Readiness, TaskReady};
pub use task::{DeferredFn, DeferredTask, Job, Task, TaskFn};
pub use trace::TaskTraceInfo;

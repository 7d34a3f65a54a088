//! # Combinators: continuation-style construction of scheduled work.
//!
//! Every combinator builds a descriptor, registers it and returns the output
//! [`Future`] right away; the caller never blocks.
//!
//! | combinator      | readiness                    | registry           | runs on         |
//! |-----------------|------------------------------|--------------------|-----------------|
//! | [`schedule`]    | immediately                  | `entries`          | workers         |
//! | [`delay`]       | `elapsed >= delay`           | `entries`          | workers         |
//! | [`await_all`]   | every input done             | `entries`          | workers         |
//! | [`await_any`]   | at least one input done      | `entries`          | workers         |
//! | [`deferred`]    | every input done             | `deferred_entries` | dispatch thread |
//!
//! Worker-side combinators are generic over [`Submit`], so they accept
//! `&mut TaskScheduler` as well as a [`SchedulerHandle`](crate::SchedulerHandle)
//! moved into a running closure. [`deferred`] needs `&mut TaskScheduler`.
//!
//! A closure that observes a cancel request before it starts completes its
//! promise as `Canceled` and does not run. Preempt and suspend requests are
//! resolved by the scheduler before the closure is entered: the task is held
//! in its registry (or handed back by its [`Job`](crate::Job)) until the request
//! is lifted, so a closure never returns without settling its promise.
//!
//! ## Example
//! ```
//! use taskweave::{Future, TaskPriority, TaskScheduler, TaskTraceInfo, sched};
//!
//! let mut scheduler = TaskScheduler::default();
//! let a = sched::schedule(&mut scheduler, || 3, TaskPriority::Normal, TaskTraceInfo::new("a")).unwrap();
//! let b = sched::schedule(&mut scheduler, || 4, TaskPriority::Normal, TaskTraceInfo::new("b")).unwrap();
//! let sum = sched::await_all(
//!     &mut scheduler,
//!     |a: Future<i32>, b: Future<i32>| a.copy().unwrap() + b.copy().unwrap(),
//!     TaskPriority::Normal,
//!     TaskTraceInfo::new("sum"),
//!     (a, b),
//! )
//! .unwrap();
//!
//! scheduler.run_until_idle(8);
//! assert_eq!(sum.copy(), Ok(7));
//! ```

mod awaiting;
mod deferred;
mod inputs;
mod timed;

pub use awaiting::{await_all, await_any};
pub use deferred::deferred;
pub use inputs::{AwaitInputs, Continuation, DeferredContinuation};
pub use timed::{delay, schedule};

use std::time::Instant;

use crate::core::Submit;
use crate::error::SchedulerError;
use crate::future::{CancelState, Future, Promise, make_promise};
use crate::tasks::{Readiness, Task, TaskFn, TaskId, TaskPriority, TaskTraceInfo};

/// Wraps `body` with promise bookkeeping and registers it as a task.
///
/// Nothing is registered if any reservation fails.
fn register<S, B, R>(
    scheduler: &mut S,
    id: TaskId,
    registered_at: Instant,
    readiness: Readiness,
    body: B,
    priority: TaskPriority,
    trace: TaskTraceInfo,
) -> Result<Future<R>, SchedulerError>
where
    S: Submit + ?Sized,
    B: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    let promise = make_promise::<R>(scheduler.allocator())?;
    let future = promise.get_future();
    let erased = promise.erase();
    let f = TaskFn::new(scheduler.allocator(), move || complete_with(&promise, body))?;

    scheduler.submit(Task::new(
        f,
        readiness,
        registered_at,
        erased,
        id,
        priority,
        trace,
    ))?;
    Ok(future)
}

/// Runs `body` and completes `promise`, unless cancellation was requested first.
///
/// Holds were already applied by `Job::run`; only cancellation is left to check.
fn complete_with<R, B: FnOnce() -> R>(promise: &Promise<R>, body: B) {
    if promise.fetch_cancel_request() == CancelState::Canceled {
        promise.notify_canceled();
        return;
    }
    promise.notify_executing();
    promise.notify_completed(body());
}

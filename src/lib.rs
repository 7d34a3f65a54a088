//! # taskweave
//!
//! **Taskweave** is a cooperative priority task scheduler built on shared
//! futures and single-writer promises.
//!
//! A task is a closure registered with a priority, the futures it depends on
//! and a readiness predicate. The scheduler polls pending tasks on every tick
//! and dispatches the ready ones, highest priority first, FIFO within a
//! priority. Nothing ever blocks: waiting is a descriptor sitting in a registry.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   sched::schedule / delay / await_all / await_any      sched::deferred
//!                 │        (Submit)                             │
//!      ┌──────────┴──────────┐                                  │
//!      ▼                     ▼                                  ▼
//! &mut TaskScheduler   SchedulerHandle ──► inbox        &mut TaskScheduler
//!      │                                    │                   │
//!      ▼                                    ▼                   ▼
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │ TaskScheduler                                                        │
//! │  entries: Vec<Task>          deferred_entries: Vec<DeferredTask>     │
//! │  TaskIdGen   Allocator (byte budget)   Bus (broadcast events)        │
//! └───────────────────────────────┬──────────────────────────────────────┘
//!                                 │ tick(budget)
//!          ┌──────────────────────┼──────────────────────────┐
//!          ▼                      ▼                          ▼
//!  deferred closures run   canceled tasks finalized   ready tasks → Job
//!  on the dispatch thread                              (priority desc, id asc)
//!                                                            │
//!                         run_ready() inline  ◄──────────────┤
//!                         Dispatcher: blocking pool ◄────────┘
//! ```
//!
//! ### Future / Promise
//! ```text
//! make_promise::<T>(&allocator) ──► Promise<T> ──get_future()──► Future<T> ──share()──► Future<T>
//!                                      │                             │
//!                                   erase()                       erase()
//!                                      ▼                             ▼
//!                                 PromiseAny                     FutureAny   (is_done, no T)
//!
//! Scheduled ─► Submitted ─► Executing ─► Completed      (notify_completed: exactly once)
//!     └────────────┴────────────┴──────► Canceled       (request_cancel, then finalized)
//!
//! request_suspend / request_preempt ─► Suspended | Preempted (held, not dispatched)
//!                                       ─► Resuming once lifted
//! ```
//!
//! ## Features
//! | Area              | Description                                                     | Key types / functions                         |
//! |-------------------|-----------------------------------------------------------------|-----------------------------------------------|
//! | **Futures**       | Write-once shared result slots with status and cancellation.    | [`Future`], [`Promise`], [`make_promise`]     |
//! | **Combinators**   | Continuation-style registration of dependent work.              | [`sched::await_all`], [`sched::deferred`]     |
//! | **Scheduling**    | Registries, readiness polling, priority dispatch.               | [`TaskScheduler`], [`Readiness`], [`Tick`]    |
//! | **Dispatch**      | Tokio-driven tick loop with a worker cap and graceful shutdown. | [`Dispatcher`]                                |
//! | **Allocation**    | Byte budget shared by all per-task state.                       | [`Allocator`]                                 |
//! | **Subscriber API**| Observe lifecycle events (logging, metrics, custom).            | [`Subscribe`], [`Event`]                      |
//! | **Errors**        | Typed construction, result access and runtime errors.           | [`SchedulerError`], [`FutureError`]           |
//! | **Configuration** | Centralize runtime settings.                                    | [`Config`]                                    |
//!
//! ## Optional features
//! - `logging`: exports the built-in [`LogWriter`] subscriber (renders events via `tracing`).
//!
//! ## Example
//! ```rust
//! use taskweave::{Future, TaskPriority, TaskScheduler, TaskTraceInfo, sched};
//!
//! let mut scheduler = TaskScheduler::default();
//!
//! let width = sched::schedule(&mut scheduler, || 6, TaskPriority::Normal, TaskTraceInfo::new("width"))?;
//! let height = sched::schedule(&mut scheduler, || 7, TaskPriority::Normal, TaskTraceInfo::new("height"))?;
//! let area = sched::await_all(
//!     &mut scheduler,
//!     |w: Future<u32>, h: Future<u32>| Ok::<_, taskweave::FutureError>(w.copy()? * h.copy()?),
//!     TaskPriority::High,
//!     TaskTraceInfo::new("area"),
//!     (width, height),
//! )?;
//!
//! scheduler.run_until_idle(8);
//! assert_eq!(area.copy()?, Ok(42));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod allocator;
mod config;
mod core;
mod error;
mod events;
mod future;
pub mod sched;
mod subscribers;
mod tasks;

// ---- Public re-exports ----

pub use allocator::{Allocator, Lease};
pub use config::Config;
pub use core::{Dispatcher, DispatcherBuilder, SchedulerHandle, Submit, TaskScheduler, Tick};
pub use error::{FutureError, RuntimeError, SchedulerError};
pub use events::{Bus, Event, EventKind};
pub use future::{
    CancelState, Future, FutureAny, FutureStatus, PreemptState, Promise, PromiseAny,
    SuspendState, make_promise,
};
pub use subscribers::{Subscribe, SubscriberSet};
pub use tasks::{
    DeferredFn, DeferredTask, Job, Readiness, Task, TaskFn, TaskId, TaskPriority, TaskReady,
    TaskTraceInfo,
};

// Optional: expose a built-in `tracing` subscriber.
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;

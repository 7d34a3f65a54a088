//! # Runtime events emitted by the scheduler and the dispatcher.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registration events**: a combinator appended a descriptor
//! - **Dispatch events**: the dispatch loop picked, ran, or finalized a task
//! - **Shutdown events**: dispatcher stop sequence
//! - **Subscriber events**: delivery problems of the fan-out itself
//!
//! The [`Event`] struct carries additional metadata such as timestamps, task id
//! and name, priority, final status and durations.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskweave::{Event, EventKind, TaskPriority};
//!
//! let ev = Event::new(EventKind::TaskDispatched)
//!     .with_task("resize-images")
//!     .with_priority(TaskPriority::High)
//!     .with_waited(Duration::from_millis(12));
//!
//! assert_eq!(ev.kind, EventKind::TaskDispatched);
//! assert_eq!(ev.task.as_deref(), Some("resize-images"));
//! assert_eq!(ev.waited_ms, Some(12));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::future::FutureStatus;
use crate::tasks::{TaskId, TaskPriority};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registration events ===
    /// A task was appended to the registry (or the inbox, from a handle).
    ///
    /// Sets:
    /// - `task_id`, `task`: id and trace name
    /// - `priority`: task priority
    TaskRegistered,

    /// A deferred task was appended to the deferred registry.
    ///
    /// Sets:
    /// - `task`: `"deferred"`
    DeferredRegistered,

    // === Dispatch events ===
    /// A deferred task ran on the dispatch thread.
    ///
    /// Sets:
    /// - `waited_ms`: time between registration and execution
    DeferredExecuted,

    /// A ready task was removed from the registry and handed to execution.
    ///
    /// Sets:
    /// - `task_id`, `task`, `priority`
    /// - `waited_ms`: time between registration and dispatch
    TaskDispatched,

    /// A dispatched closure returned.
    ///
    /// Sets:
    /// - `task_id`, `task`
    /// - `status`: status of the task's promise after the closure
    /// - `duration_ms`: closure run time
    TaskFinished,

    /// A registered task was finalized as `Canceled` without running.
    ///
    /// Sets:
    /// - `task_id`, `task`, `priority`
    TaskCanceled,

    /// A dispatched task met a preempt or suspend request before its closure
    /// started and went back to the registry.
    ///
    /// Sets:
    /// - `task_id`, `task`, `priority`
    /// - `status`: `Preempted` or `Suspended`
    TaskHeld,

    /// A dispatched closure panicked on a worker. Followed by process-fatal unwinding.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: panic message
    TaskPanicked,

    // === Shutdown events ===
    /// Shutdown requested (token cancelled or OS signal observed).
    ShutdownRequested,

    /// All running closures returned within the configured grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some closures were still running.
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `task`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Id of the task, if applicable.
    pub task_id: Option<TaskId>,
    /// Name of the task (or subscriber), if applicable.
    pub task: Option<Arc<str>>,
    /// Priority of the task, if applicable.
    pub priority: Option<TaskPriority>,
    /// Status of the task's promise, if applicable.
    pub status: Option<FutureStatus>,
    /// Time spent registered before dispatch/execution, in milliseconds (compact).
    pub waited_ms: Option<u32>,
    /// Closure run time in milliseconds (compact).
    pub duration_ms: Option<u32>,
    /// Human-readable reason (panic details, overflow details, etc.).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task_id: None,
            task: None,
            priority: None,
            status: None,
            waited_ms: None,
            duration_ms: None,
            reason: None,
        }
    }

    /// Attaches a task id.
    #[inline]
    pub fn with_task_id(mut self, id: TaskId) -> Self {
        self.task_id = Some(id);
        self
    }

    /// Attaches a task name.
    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    /// Attaches a priority.
    #[inline]
    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Attaches a promise status.
    #[inline]
    pub fn with_status(mut self, status: FutureStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches the registration-to-dispatch wait (stored as milliseconds).
    #[inline]
    pub fn with_waited(mut self, d: Duration) -> Self {
        self.waited_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a run duration (stored as milliseconds).
    #[inline]
    pub fn with_duration(mut self, d: Duration) -> Self {
        self.duration_ms = Some(compact_ms(d));
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_task(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_task(subscriber)
            .with_reason(info)
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

fn compact_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

//! # Scheduling records: [`Task`], [`DeferredTask`] and the dispatched [`Job`].
//!
//! A [`Task`] pairs a niladic closure with a readiness predicate, a registration
//! timestamp, the erased promise of its output, an id, a priority and trace info.
//! It is owned by the scheduler's registry until the dispatch loop turns it into
//! a [`Job`], which runs the closure exactly once.
//!
//! A [`DeferredTask`] carries no priority and its closure receives
//! `&mut TaskScheduler`: it only ever runs inside `TaskScheduler::tick`, on the
//! dispatch thread, where it may register further work.
//!
//! ```text
//! Task ──(predicate Ready, picked by priority/FIFO)──► Job ──► run() ──► promise terminal
//!                                                       └─(preempt/suspend requested)──► inbox
//! DeferredTask ──(predicate Ready)──► run(&mut TaskScheduler) on the dispatch thread
//! ```

use std::fmt;
use std::mem;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::allocator::{Allocator, Lease};
use crate::core::TaskScheduler;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::future::PromiseAny;

use super::{TaskId, TaskPriority, TaskReady, TaskTraceInfo, readiness::Readiness};

/// Boxed niladic task closure, charged to an allocator.
pub struct TaskFn {
    f: Box<dyn FnOnce() + Send>,
    _lease: Lease,
}

impl TaskFn {
    /// Boxes `f`, reserving its size from `allocator`.
    pub fn new<F>(allocator: &Allocator, f: F) -> Result<Self, SchedulerError>
    where
        F: FnOnce() + Send + 'static,
    {
        let lease = allocator.reserve(mem::size_of::<F>())?;
        Ok(Self {
            f: Box::new(f),
            _lease: lease,
        })
    }

    fn call(self) {
        (self.f)()
    }
}

/// Boxed deferred closure; runs with exclusive access to the scheduler.
pub struct DeferredFn {
    f: Box<dyn FnOnce(&mut TaskScheduler) + Send>,
    _lease: Lease,
}

impl DeferredFn {
    /// Boxes `f`, reserving its size from `allocator`.
    pub fn new<F>(allocator: &Allocator, f: F) -> Result<Self, SchedulerError>
    where
        F: FnOnce(&mut TaskScheduler) + Send + 'static,
    {
        let lease = allocator.reserve(mem::size_of::<F>())?;
        Ok(Self {
            f: Box::new(f),
            _lease: lease,
        })
    }
}

/// Prioritized, worker-dispatchable unit gated by a readiness predicate.
pub struct Task {
    f: TaskFn,
    readiness: Readiness,
    registered_at: Instant,
    promise: PromiseAny,
    id: TaskId,
    priority: TaskPriority,
    trace: TaskTraceInfo,
}

impl Task {
    /// Assembles a descriptor. Combinators are the usual callers.
    pub fn new(
        f: TaskFn,
        readiness: Readiness,
        registered_at: Instant,
        promise: PromiseAny,
        id: TaskId,
        priority: TaskPriority,
        trace: TaskTraceInfo,
    ) -> Self {
        Self {
            f,
            readiness,
            registered_at,
            promise,
            id,
            priority,
            trace,
        }
    }

    /// Returns the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task priority.
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the diagnostic metadata.
    pub fn trace(&self) -> &TaskTraceInfo {
        &self.trace
    }

    /// Returns the erased promise of the task's output.
    pub fn promise(&self) -> &PromiseAny {
        &self.promise
    }

    /// Returns the registration timestamp.
    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Polls the readiness predicate with the time elapsed since registration.
    pub(crate) fn poll_ready(&mut self, now: Instant) -> TaskReady {
        self.readiness
            .poll(now.saturating_duration_since(self.registered_at))
    }

    /// Turns the descriptor into a runnable job, dropping its predicate.
    ///
    /// `requeue` is where the job hands itself back if it is held before starting.
    pub(crate) fn into_job(self, bus: Bus, requeue: mpsc::UnboundedSender<Task>, now: Instant) -> Job {
        Job {
            f: self.f,
            promise: self.promise,
            id: self.id,
            priority: self.priority,
            trace: self.trace,
            registered_at: self.registered_at,
            waited: now.saturating_duration_since(self.registered_at),
            bus,
            requeue,
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("trace", &self.trace)
            .field("status", &self.promise.fetch_status())
            .finish_non_exhaustive()
    }
}

/// Dispatch-thread-only unit permitted to register further tasks.
pub struct DeferredTask {
    f: DeferredFn,
    registered_at: Instant,
    readiness: Readiness,
    promise: PromiseAny,
}

impl DeferredTask {
    /// Assembles a deferred descriptor.
    pub fn new(
        f: DeferredFn,
        registered_at: Instant,
        readiness: Readiness,
        promise: PromiseAny,
    ) -> Self {
        Self {
            f,
            registered_at,
            readiness,
            promise,
        }
    }

    /// Returns the registration timestamp.
    pub fn registered_at(&self) -> Instant {
        self.registered_at
    }

    /// Returns the erased promise of the deferred output.
    pub fn promise(&self) -> &PromiseAny {
        &self.promise
    }

    pub(crate) fn poll_ready(&mut self, now: Instant) -> TaskReady {
        self.readiness
            .poll(now.saturating_duration_since(self.registered_at))
    }

    pub(crate) fn run(self, scheduler: &mut TaskScheduler) {
        (self.f.f)(scheduler)
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("registered_at", &self.registered_at)
            .field("status", &self.promise.fetch_status())
            .finish_non_exhaustive()
    }
}

/// A task picked by the dispatch loop, ready to run on any thread.
///
/// Running it consumes it, so the closure runs at most once.
pub struct Job {
    f: TaskFn,
    promise: PromiseAny,
    id: TaskId,
    priority: TaskPriority,
    trace: TaskTraceInfo,
    registered_at: Instant,
    waited: Duration,
    bus: Bus,
    requeue: mpsc::UnboundedSender<Task>,
}

impl Job {
    /// Returns the task id.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the task priority.
    pub fn priority(&self) -> TaskPriority {
        self.priority
    }

    /// Returns the diagnostic metadata.
    pub fn trace(&self) -> &TaskTraceInfo {
        &self.trace
    }

    /// Time between registration and dispatch.
    pub fn waited(&self) -> Duration {
        self.waited
    }

    /// Returns the erased promise; executors preempt through it.
    pub fn promise(&self) -> &PromiseAny {
        &self.promise
    }

    /// Runs the closure, then publishes `TaskFinished` with the final status.
    ///
    /// If a preempt or suspend request arrived after dispatch, the closure does
    /// not start: the task goes back to the scheduler's inbox, marked
    /// `Preempted`/`Suspended`, and `TaskHeld` is published instead. A pending
    /// cancel request is left to the closure, which finalizes the promise.
    ///
    /// A panic inside the closure propagates to the caller.
    pub fn run(self) {
        if self.promise.hold() {
            self.hand_back();
            return;
        }
        let Job {
            f,
            promise,
            id,
            trace,
            bus,
            ..
        } = self;
        let started = Instant::now();
        f.call();
        bus.publish(
            Event::new(EventKind::TaskFinished)
                .with_task_id(id)
                .with_task(trace.shared_name())
                .with_status(promise.fetch_status())
                .with_duration(started.elapsed()),
        );
    }

    fn hand_back(self) {
        let held = Event::new(EventKind::TaskHeld)
            .with_task_id(self.id)
            .with_task(self.trace.shared_name())
            .with_priority(self.priority)
            .with_status(self.promise.fetch_status());
        let task = Task::new(
            self.f,
            Readiness::immediate(),
            self.registered_at,
            self.promise,
            self.id,
            self.priority,
            self.trace,
        );
        match self.requeue.send(task) {
            Ok(()) => self.bus.publish(held),
            Err(_) => tracing::warn!(
                task_id = %self.id,
                "scheduler gone, held task dropped"
            ),
        }
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("trace", &self.trace)
            .field("waited", &self.waited)
            .finish_non_exhaustive()
    }
}

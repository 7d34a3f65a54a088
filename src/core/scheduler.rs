//! # TaskScheduler: registries, id generator, allocator and the dispatch tick.
//!
//! The scheduler owns two ordered registries (`entries` for tasks and
//! `deferred_entries` for deferred tasks), an inbox fed by [`SchedulerHandle`]s,
//! the shared id generator, the allocator and the event bus.
//!
//! ## Tick
//! ```text
//! tick(budget)
//!   ├─► drain inbox ─────────────────► entries
//!   ├─► deferred_entries (registration order)
//!   │     ├─ cancel requested ─► promise Canceled, remove, TaskCanceled
//!   │     ├─ preempt/suspend  ─► keep, not polled
//!   │     ├─ Ready   ─► run(&mut self) on this thread, remove, DeferredExecuted
//!   │     └─ Waiting ─► keep
//!   ├─► entries with a cancel request ─► promise Canceled, remove, TaskCanceled
//!   └─► entries polled with elapsed-since-registration
//!         ├─ preempt/suspend ─► keep, not polled
//!         ├─ Ready   ─► order by (priority desc, id asc), take ≤ budget
//!         │             ─► remove, promise Submitted, TaskDispatched ─► Job
//!         └─ Waiting ─► keep
//! ```
//!
//! ## Rules
//! - Only `&mut TaskScheduler` mutates the registries; the tick is the sole remover.
//! - Deferred closures run inside the tick and nowhere else. Deferred tasks they
//!   register are polled starting with the next tick; plain tasks they register
//!   compete in the same tick.
//! - Within equal priority dispatch is FIFO by registration (TaskId order);
//!   across priorities it is strictly priority-first.
//! - There is no blocking wait: a task whose predicate says `Waiting` simply stays.
//! - A preempt or suspend request holds a task in its registry until the
//!   request is lifted; a cancel request overrides both.

use std::cmp::Reverse;
use std::mem;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::allocator::Allocator;
use crate::config::Config;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::future::CancelState;
use crate::tasks::{DeferredTask, Job, Task, TaskId, TaskIdGen, TaskReady};

use super::handle::{SchedulerHandle, Submit};

/// Result of one dispatch tick.
#[derive(Debug, Default)]
pub struct Tick {
    deferred: usize,
    canceled: usize,
    jobs: Vec<Job>,
}

impl Tick {
    /// Number of deferred tasks executed during the tick.
    pub fn deferred_executed(&self) -> usize {
        self.deferred
    }

    /// Number of registered tasks (deferred ones included) finalized as canceled.
    pub fn canceled(&self) -> usize {
        self.canceled
    }

    /// Jobs picked for execution, in dispatch order.
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    /// Consumes the tick, returning the jobs in dispatch order.
    pub fn into_jobs(self) -> Vec<Job> {
        self.jobs
    }

    /// True if the tick did nothing at all.
    pub fn is_empty(&self) -> bool {
        self.deferred == 0 && self.canceled == 0 && self.jobs.is_empty()
    }
}

/// Cooperative priority scheduler.
///
/// ## Example
/// ```
/// use taskweave::{Config, TaskPriority, TaskScheduler, TaskTraceInfo, sched};
///
/// let mut scheduler = TaskScheduler::new(&Config::default());
/// let answer = sched::schedule(
///     &mut scheduler,
///     || 6 * 7,
///     TaskPriority::Normal,
///     TaskTraceInfo::new("answer"),
/// )
/// .unwrap();
///
/// assert!(!answer.is_done());
/// scheduler.run_ready();
/// assert_eq!(answer.copy(), Ok(42));
/// ```
pub struct TaskScheduler {
    entries: Vec<Task>,
    deferred_entries: Vec<DeferredTask>,
    ids: TaskIdGen,
    allocator: Allocator,
    inbox: mpsc::UnboundedReceiver<Task>,
    inbox_tx: mpsc::UnboundedSender<Task>,
    bus: Bus,
}

impl TaskScheduler {
    /// Creates a scheduler whose allocator budget and bus capacity come from `cfg`.
    pub fn new(cfg: &Config) -> Self {
        Self::with_allocator(cfg, Allocator::from_budget(cfg.memory_budget()))
    }

    /// Creates a scheduler drawing all per-task state from `allocator`.
    pub fn with_allocator(cfg: &Config, allocator: Allocator) -> Self {
        let (inbox_tx, inbox) = mpsc::unbounded_channel();
        Self {
            entries: Vec::new(),
            deferred_entries: Vec::new(),
            ids: TaskIdGen::default(),
            allocator,
            inbox,
            inbox_tx,
            bus: Bus::new(cfg.bus_capacity_clamped()),
        }
    }

    /// Returns a thread-safe handle that registers tasks through the inbox.
    pub fn handle(&self) -> SchedulerHandle {
        SchedulerHandle::new(
            self.inbox_tx.clone(),
            self.ids.clone(),
            self.allocator.clone(),
            self.bus.clone(),
        )
    }

    /// Returns the event bus.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of tasks registered or queued in the inbox.
    pub fn pending(&self) -> usize {
        self.entries.len() + self.inbox.len()
    }

    /// Number of registered deferred tasks.
    pub fn deferred_pending(&self) -> usize {
        self.deferred_entries.len()
    }

    /// True if nothing is registered or queued.
    pub fn is_idle(&self) -> bool {
        self.entries.is_empty() && self.deferred_entries.is_empty() && self.inbox.is_empty()
    }

    /// Runs one dispatch tick and returns up to `budget` jobs (`None` = all ready).
    ///
    /// The returned jobs are removed from the registry; running them is the
    /// caller's job (inline, or on workers).
    pub fn tick(&mut self, budget: Option<usize>) -> Tick {
        self.drain_inbox();
        let (deferred, deferred_canceled) = self.run_deferred();
        let canceled = deferred_canceled + self.finalize_canceled();
        let jobs = self.take_ready(Instant::now(), budget);
        Tick {
            deferred,
            canceled,
            jobs,
        }
    }

    /// Runs one tick and executes every picked job inline on the calling thread.
    ///
    /// Returns the number of jobs executed.
    pub fn run_ready(&mut self) -> usize {
        let jobs = self.tick(None).into_jobs();
        let count = jobs.len();
        for job in jobs {
            job.run();
        }
        count
    }

    /// Repeats [`run_ready`](Self::run_ready) until idle or `max_ticks` ticks were spent.
    ///
    /// Returns the number of ticks performed. Tasks gated on futures nobody
    /// completes keep the scheduler busy until the bound is reached.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_idle() {
            self.run_ready();
            ticks += 1;
        }
        ticks
    }

    pub(crate) fn push_deferred(&mut self, task: DeferredTask) {
        self.deferred_entries.push(task);
        self.bus
            .publish(Event::new(EventKind::DeferredRegistered).with_task("deferred"));
    }

    fn drain_inbox(&mut self) {
        while let Ok(task) = self.inbox.try_recv() {
            self.entries.push(task);
        }
    }

    /// Returns the number of deferred tasks executed and canceled.
    fn run_deferred(&mut self) -> (usize, usize) {
        let pending = mem::take(&mut self.deferred_entries);
        let mut kept = Vec::with_capacity(pending.len());
        let mut executed = 0;
        let mut canceled = 0;

        for mut task in pending {
            if task.promise().fetch_cancel_request() == CancelState::Canceled {
                task.promise().notify_canceled();
                canceled += 1;
                self.bus
                    .publish(Event::new(EventKind::TaskCanceled).with_task("deferred"));
                continue;
            }
            if task.promise().hold() {
                kept.push(task);
                continue;
            }
            let now = Instant::now();
            match task.poll_ready(now) {
                TaskReady::Ready => {
                    let waited = now.saturating_duration_since(task.registered_at());
                    task.run(self);
                    executed += 1;
                    self.bus.publish(
                        Event::new(EventKind::DeferredExecuted)
                            .with_task("deferred")
                            .with_waited(waited),
                    );
                }
                TaskReady::Waiting => kept.push(task),
            }
        }

        // Anything registered by the closures above lands after the survivors.
        kept.append(&mut self.deferred_entries);
        self.deferred_entries = kept;
        (executed, canceled)
    }

    fn finalize_canceled(&mut self) -> usize {
        let bus = &self.bus;
        let before = self.entries.len();
        self.entries.retain(|task| {
            if task.promise().fetch_cancel_request() == CancelState::Executing {
                return true;
            }
            task.promise().notify_canceled();
            bus.publish(
                Event::new(EventKind::TaskCanceled)
                    .with_task_id(task.id())
                    .with_task(task.trace().shared_name())
                    .with_priority(task.priority()),
            );
            false
        });
        before - self.entries.len()
    }

    fn take_ready(&mut self, now: Instant, budget: Option<usize>) -> Vec<Job> {
        let mut ready: Vec<usize> = self
            .entries
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, task)| {
                (!task.promise().hold() && task.poll_ready(now) == TaskReady::Ready).then_some(idx)
            })
            .collect();

        if ready.is_empty() || budget == Some(0) {
            return Vec::new();
        }

        let entries = &self.entries;
        ready.sort_by_key(|&idx| dispatch_key(&entries[idx]));
        if let Some(limit) = budget {
            ready.truncate(limit);
        }

        let mut slots: Vec<Option<Task>> = mem::take(&mut self.entries)
            .into_iter()
            .map(Some)
            .collect();
        let picked: Vec<Task> = ready.iter().filter_map(|&idx| slots[idx].take()).collect();
        self.entries = slots.into_iter().flatten().collect();

        picked
            .into_iter()
            .map(|task| {
                task.promise().notify_submitted();
                self.bus.publish(
                    Event::new(EventKind::TaskDispatched)
                        .with_task_id(task.id())
                        .with_task(task.trace().shared_name())
                        .with_priority(task.priority())
                        .with_waited(now.saturating_duration_since(task.registered_at())),
                );
                task.into_job(self.bus.clone(), self.inbox_tx.clone(), now)
            })
            .collect()
    }
}

/// Sort key among ready tasks: higher priority first, then registration order.
fn dispatch_key(task: &Task) -> (Reverse<crate::tasks::TaskPriority>, TaskId) {
    (Reverse(task.priority()), task.id())
}

impl Default for TaskScheduler {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl Submit for TaskScheduler {
    fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    fn next_task_id(&self) -> TaskId {
        self.ids.next()
    }

    fn submit(&mut self, task: Task) -> Result<(), SchedulerError> {
        self.bus.publish(
            Event::new(EventKind::TaskRegistered)
                .with_task_id(task.id())
                .with_task(task.trace().shared_name())
                .with_priority(task.priority()),
        );
        self.entries.push(task);
        Ok(())
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("entries", &self.entries.len())
            .field("deferred_entries", &self.deferred_entries.len())
            .field("inbox", &self.inbox.len())
            .field("allocator", &self.allocator)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sched;
    use crate::tasks::{TaskPriority, TaskTraceInfo};

    #[test]
    fn lifecycle_events_follow_dispatch() {
        let mut scheduler = TaskScheduler::default();
        let mut rx = scheduler.bus().subscribe();

        let out = sched::schedule(
            &mut scheduler,
            || 1u8,
            TaskPriority::Normal,
            TaskTraceInfo::new("single"),
        )
        .unwrap();
        scheduler.run_ready();
        assert_eq!(out.copy(), Ok(1));

        let kinds: Vec<EventKind> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                EventKind::TaskRegistered,
                EventKind::TaskDispatched,
                EventKind::TaskFinished
            ]
        );
    }

    #[test]
    fn empty_scheduler_ticks_to_nothing() {
        let mut scheduler = TaskScheduler::default();
        assert!(scheduler.is_idle());
        assert!(scheduler.tick(None).is_empty());
        assert_eq!(scheduler.run_until_idle(10), 0);
    }

    #[test]
    fn zero_budget_still_runs_deferred() {
        let mut scheduler = TaskScheduler::default();
        let gate = sched::schedule(&mut scheduler, || (), TaskPriority::Normal, TaskTraceInfo::new("gate"))
            .unwrap();
        gate.request_cancel();

        let tick = scheduler.tick(Some(0));
        assert_eq!(tick.canceled(), 1);
        assert!(tick.jobs().is_empty());

        let planned = sched::deferred(
            &mut scheduler,
            |_s: &mut TaskScheduler, gate: crate::Future<()>| gate.is_done(),
            (gate,),
        )
        .unwrap();
        assert_eq!(scheduler.tick(Some(0)).deferred_executed(), 1);
        assert_eq!(planned.copy(), Ok(true));
    }

    #[test]
    fn handle_shares_the_id_sequence() {
        let mut scheduler = TaskScheduler::default();
        let mut handle = scheduler.handle();

        let a = scheduler.next_task_id();
        let b = handle.next_task_id();
        assert!(b > a);

        sched::schedule(&mut handle, || (), TaskPriority::Normal, TaskTraceInfo::new("via-handle"))
            .unwrap();
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_ready(), 1);
        assert!(scheduler.is_idle());
    }
}

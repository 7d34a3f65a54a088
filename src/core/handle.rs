//! # Registration seam shared by the scheduler and its handles.
//!
//! [`Submit`] is what the task combinators need from "a scheduler": an
//! allocator, an id generator, and a place to append a finished descriptor.
//!
//! - [`TaskScheduler`](crate::TaskScheduler) appends straight to its registry.
//! - [`SchedulerHandle`] is `Clone + Send + Sync` and posts descriptors into the
//!   scheduler's inbox; the next tick moves them into the registry.
//!
//! Deferred tasks are not part of this seam: registering one needs
//! `&mut TaskScheduler`, which only the dispatch thread holds.

use tokio::sync::mpsc;

use crate::allocator::Allocator;
use crate::error::SchedulerError;
use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Task, TaskId, TaskIdGen};

/// Something tasks can be registered with.
pub trait Submit {
    /// Allocator every per-task allocation is charged to.
    fn allocator(&self) -> &Allocator;

    /// Returns a fresh id from the scheduler-wide sequence.
    fn next_task_id(&self) -> TaskId;

    /// Appends a fully built descriptor.
    ///
    /// ### Errors
    /// [`SchedulerError::Closed`] if the scheduler no longer exists.
    fn submit(&mut self, task: Task) -> Result<(), SchedulerError>;
}

/// Thread-safe registration handle.
///
/// Safe to move into task closures running on workers; what it registers
/// becomes visible to the dispatch loop on its next tick.
#[derive(Clone, Debug)]
pub struct SchedulerHandle {
    inbox: mpsc::UnboundedSender<Task>,
    ids: TaskIdGen,
    allocator: Allocator,
    bus: Bus,
}

impl SchedulerHandle {
    pub(crate) fn new(
        inbox: mpsc::UnboundedSender<Task>,
        ids: TaskIdGen,
        allocator: Allocator,
        bus: Bus,
    ) -> Self {
        Self {
            inbox,
            ids,
            allocator,
            bus,
        }
    }

    /// True once the scheduler behind this handle was dropped.
    pub fn is_closed(&self) -> bool {
        self.inbox.is_closed()
    }
}

impl Submit for SchedulerHandle {
    fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    fn next_task_id(&self) -> TaskId {
        self.ids.next()
    }

    fn submit(&mut self, task: Task) -> Result<(), SchedulerError> {
        let registered = Event::new(EventKind::TaskRegistered)
            .with_task_id(task.id())
            .with_task(task.trace().shared_name())
            .with_priority(task.priority());
        self.inbox.send(task).map_err(|_| SchedulerError::Closed)?;
        self.bus.publish(registered);
        Ok(())
    }
}

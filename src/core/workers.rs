//! # Blocking-pool workers for dispatched jobs.
//!
//! Each [`Job`] runs on tokio's blocking pool while holding one permit of the
//! dispatcher's semaphore; the permit goes back when the closure returns.
//!
//! A panicking closure is fatal: the panic is reported on the bus as
//! `TaskPanicked` and then re-raised on the dispatch task.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;
use tokio::task::{self, JoinError, JoinSet};

use crate::events::{Bus, Event, EventKind};
use crate::tasks::Job;

pub(crate) struct Workers {
    set: JoinSet<()>,
    running: HashMap<task::Id, Arc<str>>,
    bus: Bus,
}

impl Workers {
    pub(crate) fn new(bus: Bus) -> Self {
        Self {
            set: JoinSet::new(),
            running: HashMap::new(),
            bus,
        }
    }

    /// Starts `job` on the blocking pool; `permit` is released when it returns.
    pub(crate) fn spawn(&mut self, job: Job, permit: OwnedSemaphorePermit) {
        let name = job.trace().shared_name();
        let handle = self.set.spawn_blocking(move || {
            let _permit = permit;
            job.run();
        });
        self.running.insert(handle.id(), name);
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.set.is_empty()
    }

    /// Collects every job that already returned, without waiting.
    pub(crate) fn reap(&mut self) {
        while let Some(res) = self.set.try_join_next_with_id() {
            self.settle(res);
        }
    }

    /// Waits for every running job.
    pub(crate) async fn join_all(&mut self) {
        while let Some(res) = self.set.join_next_with_id().await {
            self.settle(res);
        }
    }

    /// Names of the jobs still running, sorted.
    pub(crate) fn stuck(&self) -> Vec<String> {
        let mut names: Vec<String> = self.running.values().map(|n| n.to_string()).collect();
        names.sort_unstable();
        names
    }

    /// Stops tracking running jobs; they finish on the blocking pool unobserved.
    pub(crate) fn detach(&mut self) {
        self.set.detach_all();
        self.running.clear();
    }

    fn settle(&mut self, res: Result<(task::Id, ()), JoinError>) {
        match res {
            Ok((id, ())) => {
                self.running.remove(&id);
            }
            Err(err) => {
                let name = self.running.remove(&err.id());
                if !err.is_panic() {
                    return;
                }
                let payload = err.into_panic();
                let reason = panic_message(payload.as_ref());
                let task = name.unwrap_or_else(|| Arc::from("unknown"));
                tracing::error!(task = %task, %reason, "task closure panicked");
                self.bus.publish(
                    Event::new(EventKind::TaskPanicked)
                        .with_task(task)
                        .with_reason(reason),
                );
                std::panic::resume_unwind(payload);
            }
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

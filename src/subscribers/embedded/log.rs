//! # LogWriter: renders events through `tracing`.
//!
//! Install any `tracing` subscriber (e.g. `tracing_subscriber::fmt()`) to see
//! the output. Per-task lifecycle lines go to `DEBUG`, shutdown and delivery
//! problems to `INFO`/`WARN`, closure panics to `ERROR`.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let id = e.task_id.map(|id| id.as_u64());
        let priority = e.priority.map(|p| p.as_label());
        let status = e.status.map(|s| s.as_label());
        let reason = e.reason.as_deref().unwrap_or("unknown");

        match e.kind {
            EventKind::TaskRegistered => {
                tracing::debug!(seq = e.seq, task, ?id, ?priority, "[registered]");
            }
            EventKind::DeferredRegistered => {
                tracing::debug!(seq = e.seq, "[deferred-registered]");
            }
            EventKind::DeferredExecuted => {
                tracing::debug!(seq = e.seq, waited_ms = ?e.waited_ms, "[deferred-executed]");
            }
            EventKind::TaskDispatched => {
                tracing::debug!(seq = e.seq, task, ?id, ?priority, waited_ms = ?e.waited_ms, "[dispatched]");
            }
            EventKind::TaskFinished => {
                tracing::debug!(seq = e.seq, task, ?id, ?status, duration_ms = ?e.duration_ms, "[finished]");
            }
            EventKind::TaskCanceled => {
                tracing::info!(seq = e.seq, task, ?id, "[canceled]");
            }
            EventKind::TaskHeld => {
                tracing::info!(seq = e.seq, task, ?id, ?status, "[held]");
            }
            EventKind::TaskPanicked => {
                tracing::error!(seq = e.seq, task, reason, "[panicked]");
            }
            EventKind::ShutdownRequested => {
                tracing::info!(seq = e.seq, "[shutdown-requested]");
            }
            EventKind::AllStoppedWithin => {
                tracing::info!(seq = e.seq, "[all-stopped-within-grace]");
            }
            EventKind::GraceExceeded => {
                tracing::warn!(seq = e.seq, "[grace-exceeded]");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(seq = e.seq, subscriber = task, reason, "[subscriber-overflow]");
            }
            EventKind::SubscriberPanicked => {
                tracing::warn!(seq = e.seq, subscriber = task, reason, "[subscriber-panicked]");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}

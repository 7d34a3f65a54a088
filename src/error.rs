//! Error types used by the taskweave scheduler, its futures and the async dispatcher.
//!
//! This module defines three error enums:
//!
//! - [`SchedulerError`]: failures while building or registering a task (combinator-call time).
//! - [`FutureError`]: reasons a future's result cannot be read.
//! - [`RuntimeError`]: failures of the async [`Dispatcher`](crate::Dispatcher) itself.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//!
//! Double completion of a promise is deliberately **not** represented here: it is a
//! programming error and panics at the call site.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while constructing or registering scheduled work.
///
/// Returned to the immediate caller of a combinator; nothing is registered
/// when one of these is returned.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The scheduler's allocator budget cannot satisfy the reservation.
    #[error("allocator exhausted: requested {requested} bytes, {in_use} of {limit} in use")]
    OutOfMemory {
        /// Bytes requested by the failed reservation.
        requested: usize,
        /// Bytes held by live reservations at the time of the request.
        in_use: usize,
        /// Configured budget.
        limit: usize,
    },

    /// The scheduler behind a [`SchedulerHandle`](crate::SchedulerHandle) was dropped.
    #[error("scheduler closed")]
    Closed,
}

impl SchedulerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskweave::SchedulerError;
    ///
    /// let err = SchedulerError::OutOfMemory { requested: 64, in_use: 1000, limit: 1024 };
    /// assert_eq!(err.as_label(), "alloc_exhausted");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SchedulerError::OutOfMemory { .. } => "alloc_exhausted",
            SchedulerError::Closed => "scheduler_closed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            SchedulerError::OutOfMemory {
                requested,
                in_use,
                limit,
            } => format!("out of memory: need {requested}B, used {in_use}B/{limit}B"),
            SchedulerError::Closed => "scheduler closed".to_string(),
        }
    }
}

/// # Reasons a future's value is unavailable.
#[non_exhaustive]
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FutureError {
    /// The async operation has not reached a terminal state yet.
    #[error("pending")]
    Pending,

    /// The async operation was canceled and will never carry a value.
    #[error("canceled")]
    Canceled,
}

impl FutureError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            FutureError::Pending => "future_pending",
            FutureError::Canceled => "future_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            FutureError::Pending => "future pending: no terminal state yet".to_string(),
            FutureError::Canceled => "future canceled: no value will be stored".to_string(),
        }
    }
}

/// # Errors produced by the async dispatcher.
///
/// These represent failures in the orchestration layer itself,
/// such as a shutdown sequence exceeding its grace period.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some task closures were still running.
    #[error("shutdown timeout {grace:?} exceeded; still running: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the tasks whose closures had not returned.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskweave::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::GraceExceeded { grace: Duration::from_secs(5), stuck: vec![] };
    /// assert_eq!(err.as_label(), "runtime_grace_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::GraceExceeded { grace, stuck } => {
                format!("grace exceeded after {grace:?}; running tasks={stuck:?}")
            }
        }
    }
}

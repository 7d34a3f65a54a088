//! # Status model of an async operation.
//!
//! A slot carries two independent pieces of state:
//! - an **informational** status (`Scheduled`, `Submitted`, `Executing`, plus
//!   `Preempted`, `Suspended` and `Resuming` while the scheduler holds a task
//!   back), written with relaxed ordering and only meant for observation;
//! - a **terminal** status (`Completed`, `Canceled`), written exactly once.
//!
//! The terminal status always overrides the informational one when observed.

/// Observable status of a future.
///
/// The states are mutually exclusive; informational states may be skipped or
/// observed out of order, terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FutureStatus {
    /// Registered with a scheduler; the default state of every slot.
    Scheduled,
    /// Picked by the dispatch loop and handed to an execution unit.
    Submitted,
    /// The task body is running.
    Executing,
    /// Held back by the executor after a preempt request.
    Preempted,
    /// Held back after a suspend request from a holder of the future.
    Suspended,
    /// The hold was lifted; the task is eligible for dispatch again.
    Resuming,
    /// Terminal: the operation was canceled and carries no value.
    Canceled,
    /// Terminal: the operation produced its value.
    Completed,
}

impl FutureStatus {
    /// Returns true for `Completed` and `Canceled`.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, FutureStatus::Completed | FutureStatus::Canceled)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            FutureStatus::Scheduled => "scheduled",
            FutureStatus::Submitted => "submitted",
            FutureStatus::Executing => "executing",
            FutureStatus::Preempted => "preempted",
            FutureStatus::Suspended => "suspended",
            FutureStatus::Resuming => "resuming",
            FutureStatus::Canceled => "canceled",
            FutureStatus::Completed => "completed",
        }
    }
}

/// Cancellation request observed by the executor of a task.
///
/// A request is sticky: once `Canceled`, it never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelState {
    /// No cancellation was requested.
    Executing,
    /// A holder of the future asked for cancellation.
    Canceled,
}

/// Suspend request observed by the executor. The last request wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuspendState {
    /// No suspension requested, or a resume superseded it.
    Executing,
    /// A holder of the future asked for suspension.
    Suspended,
}

/// Preempt request set by the executor side (a promise holder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreemptState {
    /// No preemption requested.
    Executing,
    /// The task must yield its turn until the request is cleared.
    Preempted,
}

// Encodings of the atomics in `StateCore`.
pub(crate) mod repr {
    pub const INFO_SCHEDULED: u8 = 0;
    pub const INFO_SUBMITTED: u8 = 1;
    pub const INFO_EXECUTING: u8 = 2;
    pub const INFO_PREEMPTED: u8 = 3;
    pub const INFO_SUSPENDED: u8 = 4;
    pub const INFO_RESUMING: u8 = 5;

    pub const TERM_PENDING: u8 = 0;
    pub const TERM_COMPLETING: u8 = 1;
    pub const TERM_COMPLETED: u8 = 2;
    pub const TERM_CANCELED: u8 = 3;
}

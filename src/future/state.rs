//! # Shared slot behind a promise and its futures.
//!
//! ## Ordering
//! - Informational status: relaxed loads/stores, no data is published through it.
//! - Terminal status: `Pending → Completing → Completed` or `Pending → Canceled`
//!   via CAS, so the terminal state and the value are written at most once.
//!   The value is stored before the `Release` store of `Completed`; readers load
//!   the terminal status with `Acquire` before touching the value.
//! - Cancel, suspend and preempt requests are independent relaxed flags. A
//!   cancel request outranks preempt, which outranks suspend.
//! - After completion the value is immutable, so reading it needs no lock.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use crate::allocator::Lease;
use crate::error::FutureError;

use super::status::{CancelState, FutureStatus, PreemptState, SuspendState, repr};

/// Type-independent part of a slot: status and the pending requests.
#[derive(Debug)]
pub(crate) struct StateCore {
    info: AtomicU8,
    term: AtomicU8,
    cancel_requested: AtomicBool,
    suspend_requested: AtomicBool,
    preempt_requested: AtomicBool,
}

impl StateCore {
    fn new() -> Self {
        Self {
            info: AtomicU8::new(repr::INFO_SCHEDULED),
            term: AtomicU8::new(repr::TERM_PENDING),
            cancel_requested: AtomicBool::new(false),
            suspend_requested: AtomicBool::new(false),
            preempt_requested: AtomicBool::new(false),
        }
    }

    pub(crate) fn notify_submitted(&self) {
        self.info.store(repr::INFO_SUBMITTED, Ordering::Relaxed);
    }

    pub(crate) fn notify_executing(&self) {
        self.info.store(repr::INFO_EXECUTING, Ordering::Relaxed);
    }

    /// Moves `Pending → Canceled`. Returns false if a terminal state was already taken.
    pub(crate) fn notify_canceled(&self) -> bool {
        self.term
            .compare_exchange(
                repr::TERM_PENDING,
                repr::TERM_CANCELED,
                Ordering::Release,
                Ordering::Relaxed,
            )
            .is_ok()
    }

    pub(crate) fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::Relaxed);
    }

    pub(crate) fn fetch_cancel_request(&self) -> CancelState {
        if self.cancel_requested.load(Ordering::Relaxed) {
            CancelState::Canceled
        } else {
            CancelState::Executing
        }
    }

    pub(crate) fn request_suspend(&self) {
        self.suspend_requested.store(true, Ordering::Relaxed);
    }

    pub(crate) fn request_resume(&self) {
        self.suspend_requested.store(false, Ordering::Relaxed);
    }

    pub(crate) fn fetch_suspend_request(&self) -> SuspendState {
        if self.suspend_requested.load(Ordering::Relaxed) {
            SuspendState::Suspended
        } else {
            SuspendState::Executing
        }
    }

    pub(crate) fn request_preempt(&self) {
        self.preempt_requested.store(true, Ordering::Relaxed);
    }

    pub(crate) fn clear_preempt_request(&self) {
        self.preempt_requested.store(false, Ordering::Relaxed);
    }

    pub(crate) fn fetch_preempt_request(&self) -> PreemptState {
        if self.preempt_requested.load(Ordering::Relaxed) {
            PreemptState::Preempted
        } else {
            PreemptState::Executing
        }
    }

    pub(crate) fn notify_preempted(&self) {
        self.info.store(repr::INFO_PREEMPTED, Ordering::Relaxed);
    }

    pub(crate) fn notify_suspended(&self) {
        self.info.store(repr::INFO_SUSPENDED, Ordering::Relaxed);
    }

    pub(crate) fn notify_resuming(&self) {
        self.info.store(repr::INFO_RESUMING, Ordering::Relaxed);
    }

    /// Applies pending preempt/suspend requests to the informational status.
    ///
    /// Returns true if the task must be held back. A held task whose requests
    /// were lifted moves to `Resuming`. A pending cancel request never holds.
    pub(crate) fn hold(&self) -> bool {
        if self.fetch_cancel_request() == CancelState::Canceled {
            return false;
        }
        if self.fetch_preempt_request() == PreemptState::Preempted {
            self.notify_preempted();
            return true;
        }
        if self.fetch_suspend_request() == SuspendState::Suspended {
            self.notify_suspended();
            return true;
        }
        if matches!(
            self.info.load(Ordering::Relaxed),
            repr::INFO_PREEMPTED | repr::INFO_SUSPENDED
        ) {
            self.notify_resuming();
        }
        false
    }

    pub(crate) fn is_done(&self) -> bool {
        matches!(
            self.term.load(Ordering::Acquire),
            repr::TERM_COMPLETED | repr::TERM_CANCELED
        )
    }

    pub(crate) fn fetch_status(&self) -> FutureStatus {
        match self.term.load(Ordering::Acquire) {
            repr::TERM_COMPLETED => FutureStatus::Completed,
            repr::TERM_CANCELED => FutureStatus::Canceled,
            _ => match self.info.load(Ordering::Relaxed) {
                repr::INFO_SUBMITTED => FutureStatus::Submitted,
                repr::INFO_EXECUTING => FutureStatus::Executing,
                repr::INFO_PREEMPTED => FutureStatus::Preempted,
                repr::INFO_SUSPENDED => FutureStatus::Suspended,
                repr::INFO_RESUMING => FutureStatus::Resuming,
                _ => FutureStatus::Scheduled,
            },
        }
    }
}

/// Typed slot: status core plus the write-once value.
#[derive(Debug)]
pub(crate) struct FutureState<T> {
    core: StateCore,
    value: OnceLock<T>,
    _lease: Lease,
}

impl<T> FutureState<T> {
    pub(crate) fn new(lease: Lease) -> Self {
        Self {
            core: StateCore::new(),
            value: OnceLock::new(),
            _lease: lease,
        }
    }

    pub(crate) fn core(&self) -> &StateCore {
        &self.core
    }

    /// Performs the single permitted write.
    ///
    /// # Panics
    /// If the slot already reached (or is reaching) a terminal state.
    pub(crate) fn complete(&self, value: T) {
        let claimed = self.core.term.compare_exchange(
            repr::TERM_PENDING,
            repr::TERM_COMPLETING,
            Ordering::Acquire,
            Ordering::Acquire,
        );
        match claimed {
            Ok(_) => {
                let _ = self.value.set(value);
                self.core.term.store(repr::TERM_COMPLETED, Ordering::Release);
            }
            Err(observed) => panic!(
                "promise completed twice (slot was already {})",
                terminal_label(observed)
            ),
        }
    }

    pub(crate) fn get(&self) -> Result<&T, FutureError> {
        match self.core.term.load(Ordering::Acquire) {
            repr::TERM_COMPLETED => self.value.get().ok_or(FutureError::Pending),
            repr::TERM_CANCELED => Err(FutureError::Canceled),
            _ => Err(FutureError::Pending),
        }
    }
}

fn terminal_label(term: u8) -> &'static str {
    match term {
        repr::TERM_COMPLETING => "completing",
        repr::TERM_COMPLETED => "completed",
        repr::TERM_CANCELED => "canceled",
        _ => "pending",
    }
}

/// Closed interface the erased handles see: nothing but the status core.
pub(crate) trait ErasedState: Send + Sync {
    fn core(&self) -> &StateCore;
}

impl<T: Send + Sync> ErasedState for FutureState<T> {
    fn core(&self) -> &StateCore {
        &self.core
    }
}

//! # Write handles: [`Promise`] and its erased form [`PromiseAny`].
//!
//! A promise is paired 1:1 with one slot at creation. It is the only handle that
//! can store a value; it is deliberately not `Clone`.
//!
//! ## Rules
//! - `notify_completed` may run at most once per slot; a second terminal write panics.
//! - Dropping a promise without completing it leaves every future pending forever.
//! - `notify_canceled` is idempotent and reports whether it took the terminal state.

use std::fmt;
use std::sync::Arc;

use crate::allocator::Allocator;
use crate::error::SchedulerError;

use super::future::Future;
use super::state::{ErasedState, FutureState};
use super::status::{CancelState, FutureStatus, PreemptState, SuspendState};

/// Creates a promise whose slot is accounted against `allocator`.
///
/// ### Errors
/// [`SchedulerError::OutOfMemory`] if the slot does not fit the allocator budget.
pub fn make_promise<T>(allocator: &Allocator) -> Result<Promise<T>, SchedulerError> {
    let lease = allocator.reserve_for::<FutureState<T>>()?;
    Ok(Promise {
        state: Arc::new(FutureState::new(lease)),
    })
}

/// Single-writer completion handle.
pub struct Promise<T> {
    state: Arc<FutureState<T>>,
}

impl<T> Promise<T> {
    /// Returns a future sharing this promise's slot. May be called any number of times.
    pub fn get_future(&self) -> Future<T> {
        Future::from_state(Arc::clone(&self.state))
    }

    /// Stores `value` and flips the slot to `Completed`.
    ///
    /// # Panics
    /// If the slot already reached a terminal state (double completion, or
    /// completion after cancellation). This is a contract violation, not a
    /// recoverable error.
    pub fn notify_completed(&self, value: T) {
        self.state.complete(value);
    }

    /// Marks the slot `Canceled`. Returns false if it was already terminal.
    pub fn notify_canceled(&self) -> bool {
        self.state.core().notify_canceled()
    }

    /// Informational: the dispatch loop handed the task to an execution unit.
    pub fn notify_submitted(&self) {
        self.state.core().notify_submitted();
    }

    /// Informational: the task body started.
    pub fn notify_executing(&self) {
        self.state.core().notify_executing();
    }

    /// Informational: the task is held back by a preempt request.
    pub fn notify_preempted(&self) {
        self.state.core().notify_preempted();
    }

    /// Informational: the task is held back by a suspend request.
    pub fn notify_suspended(&self) {
        self.state.core().notify_suspended();
    }

    /// Informational: a hold was lifted.
    pub fn notify_resuming(&self) {
        self.state.core().notify_resuming();
    }

    /// Returns whether a holder of the future requested cancellation.
    pub fn fetch_cancel_request(&self) -> CancelState {
        self.state.core().fetch_cancel_request()
    }

    /// Returns the current suspend request.
    pub fn fetch_suspend_request(&self) -> SuspendState {
        self.state.core().fetch_suspend_request()
    }

    /// Asks the scheduler to hold the task back until [`clear_preempt_request`](Self::clear_preempt_request).
    pub fn request_preempt(&self) {
        self.state.core().request_preempt();
    }

    /// Withdraws a preempt request.
    pub fn clear_preempt_request(&self) {
        self.state.core().clear_preempt_request();
    }

    /// Returns the current preempt request.
    pub fn fetch_preempt_request(&self) -> PreemptState {
        self.state.core().fetch_preempt_request()
    }

    /// Returns the current status of the slot.
    pub fn fetch_status(&self) -> FutureStatus {
        self.state.core().fetch_status()
    }

    /// True once the slot reached a terminal state.
    pub fn is_done(&self) -> bool {
        self.state.core().is_done()
    }
}

impl<T: Send + Sync + 'static> Promise<T> {
    /// Returns a type-erased handle to this promise's slot.
    pub fn erase(&self) -> PromiseAny {
        let state: Arc<dyn ErasedState> = Arc::clone(&self.state) as Arc<dyn ErasedState>;
        PromiseAny { state }
    }
}

impl<T> fmt::Debug for Promise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("status", &self.fetch_status())
            .finish()
    }
}

/// Type-erased promise kept by the scheduler next to each task.
///
/// It can publish informational status and cancellation, never a value.
#[derive(Clone)]
pub struct PromiseAny {
    state: Arc<dyn ErasedState>,
}

impl PromiseAny {
    /// True once the slot reached a terminal state.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state.core().is_done()
    }

    /// Returns the current status of the slot.
    pub fn fetch_status(&self) -> FutureStatus {
        self.state.core().fetch_status()
    }

    /// Returns whether cancellation was requested.
    pub fn fetch_cancel_request(&self) -> CancelState {
        self.state.core().fetch_cancel_request()
    }

    /// Informational: handed to an execution unit.
    pub fn notify_submitted(&self) {
        self.state.core().notify_submitted();
    }

    /// Informational: the task body started.
    pub fn notify_executing(&self) {
        self.state.core().notify_executing();
    }

    /// Marks the slot `Canceled`. Returns false if it was already terminal.
    pub fn notify_canceled(&self) -> bool {
        self.state.core().notify_canceled()
    }

    /// Returns the current suspend request.
    pub fn fetch_suspend_request(&self) -> SuspendState {
        self.state.core().fetch_suspend_request()
    }

    /// Returns the current preempt request.
    pub fn fetch_preempt_request(&self) -> PreemptState {
        self.state.core().fetch_preempt_request()
    }

    /// Asks the scheduler to hold the task back.
    pub fn request_preempt(&self) {
        self.state.core().request_preempt();
    }

    /// Withdraws a preempt request.
    pub fn clear_preempt_request(&self) {
        self.state.core().clear_preempt_request();
    }

    /// Informational: held back by a preempt request.
    pub fn notify_preempted(&self) {
        self.state.core().notify_preempted();
    }

    /// Informational: held back by a suspend request.
    pub fn notify_suspended(&self) {
        self.state.core().notify_suspended();
    }

    /// Applies pending preempt/suspend requests; true if the task must stay held.
    pub(crate) fn hold(&self) -> bool {
        self.state.core().hold()
    }
}

impl fmt::Debug for PromiseAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromiseAny")
            .field("status", &self.fetch_status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "promise completed twice")]
    fn double_completion_is_fatal() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u32>(&alloc).unwrap();
        promise.notify_completed(1);
        promise.notify_completed(2);
    }

    #[test]
    #[should_panic(expected = "promise completed twice")]
    fn completion_after_cancel_is_fatal() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u32>(&alloc).unwrap();
        promise.notify_canceled();
        promise.notify_completed(1);
    }

    #[test]
    fn first_value_wins_and_stays() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u32>(&alloc).unwrap();
        let fut = promise.get_future();
        promise.notify_completed(5);
        assert!(!promise.notify_canceled());
        assert_eq!(fut.copy(), Ok(5));
        assert_eq!(fut.fetch_status(), FutureStatus::Completed);
    }

    #[test]
    fn informational_status_is_overridden_by_terminal() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<()>(&alloc).unwrap();
        let erased = promise.erase();
        assert_eq!(erased.fetch_status(), FutureStatus::Scheduled);
        erased.notify_submitted();
        assert_eq!(promise.fetch_status(), FutureStatus::Submitted);
        promise.notify_executing();
        assert_eq!(erased.fetch_status(), FutureStatus::Executing);
        promise.notify_completed(());
        assert_eq!(erased.fetch_status(), FutureStatus::Completed);
        assert!(erased.is_done());
    }

    #[test]
    fn hold_ranks_cancel_over_preempt_over_suspend() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<()>(&alloc).unwrap();
        let fut = promise.get_future();
        let erased = promise.erase();
        assert!(!erased.hold());
        assert_eq!(fut.fetch_status(), FutureStatus::Scheduled);

        fut.request_suspend();
        assert!(erased.hold());
        assert_eq!(fut.fetch_status(), FutureStatus::Suspended);

        promise.request_preempt();
        assert_eq!(erased.fetch_preempt_request(), PreemptState::Preempted);
        assert!(erased.hold());
        assert_eq!(fut.fetch_status(), FutureStatus::Preempted);

        promise.clear_preempt_request();
        fut.request_resume();
        assert!(!erased.hold());
        assert_eq!(fut.fetch_status(), FutureStatus::Resuming);

        fut.request_suspend();
        fut.request_cancel();
        assert!(!erased.hold());
        assert!(!fut.is_done());
    }

    #[test]
    fn slot_is_charged_until_last_handle_drops() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<[u8; 256]>(&alloc).unwrap();
        let fut = promise.get_future();
        assert!(alloc.in_use() >= 256);
        drop(promise);
        assert!(alloc.in_use() >= 256);
        drop(fut);
        assert_eq!(alloc.in_use(), 0);
    }

    #[test]
    fn out_of_budget_promise_fails() {
        let alloc = Allocator::with_limit(8);
        let err = make_promise::<[u8; 64]>(&alloc).unwrap_err();
        assert_eq!(err.as_label(), "alloc_exhausted");
    }
}

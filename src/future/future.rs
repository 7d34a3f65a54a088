//! # Read handles: [`Future`] and its erased form [`FutureAny`].
//!
//! A [`Future`] is a shared, read-only view of a slot. Cloning (or [`Future::share`])
//! adds a reference to the same slot and never copies the value.
//!
//! Note that this type is unrelated to `std::future::Future`: it is never polled
//! by an async executor, only peeked by the scheduler's readiness predicates.

use std::fmt;
use std::sync::Arc;

use crate::error::FutureError;

use super::state::{ErasedState, FutureState, StateCore};
use super::status::{CancelState, FutureStatus, SuspendState};

/// Shared read handle to a write-once result of type `T`.
///
/// ## Example
/// ```
/// use taskweave::{Allocator, FutureError, make_promise};
///
/// let alloc = Allocator::unbounded();
/// let promise = make_promise::<u32>(&alloc).unwrap();
/// let early = promise.get_future();
/// assert_eq!(early.copy(), Err(FutureError::Pending));
///
/// promise.notify_completed(7);
/// let late = early.share();
/// assert!(early.is_done() && late.is_done());
/// assert_eq!(late.copy(), Ok(7));
/// ```
pub struct Future<T> {
    pub(crate) state: Arc<FutureState<T>>,
}

impl<T> Future<T> {
    pub(crate) fn from_state(state: Arc<FutureState<T>>) -> Self {
        Self { state }
    }

    /// Non-blocking peek: true once the slot reached `Completed` or `Canceled`.
    ///
    /// A `true` result never reverts, and the completion write happens-before
    /// the load that observed it.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.state.core().is_done()
    }

    /// Returns the current status (terminal status overrides informational).
    pub fn fetch_status(&self) -> FutureStatus {
        self.state.core().fetch_status()
    }

    /// Asks the executor to cancel the operation.
    ///
    /// The request is a hint: a task that already started runs to completion.
    pub fn request_cancel(&self) {
        self.state.core().request_cancel();
    }

    /// Returns whether cancellation was requested through any handle.
    pub fn fetch_cancel_request(&self) -> CancelState {
        self.state.core().fetch_cancel_request()
    }

    /// Asks the scheduler to hold the task back until [`request_resume`](Self::request_resume).
    ///
    /// Only a task that has not started is held; a running closure is unaffected.
    pub fn request_suspend(&self) {
        self.state.core().request_suspend();
    }

    /// Withdraws a suspend request. The last of suspend/resume wins.
    pub fn request_resume(&self) {
        self.state.core().request_resume();
    }

    /// Returns the current suspend request.
    pub fn fetch_suspend_request(&self) -> SuspendState {
        self.state.core().fetch_suspend_request()
    }

    /// Returns a new handle to the same slot.
    #[inline]
    pub fn share(&self) -> Future<T> {
        Future {
            state: Arc::clone(&self.state),
        }
    }

    /// Number of live handles (futures, the promise and erased forms) on this slot.
    pub fn share_count(&self) -> usize {
        Arc::strong_count(&self.state)
    }

    /// Borrows the completed value.
    ///
    /// ### Errors
    /// - [`FutureError::Pending`] before completion
    /// - [`FutureError::Canceled`] if the operation was canceled
    pub fn get(&self) -> Result<&T, FutureError> {
        self.state.get()
    }

    /// Clones the completed value out of the slot.
    ///
    /// Keep `T` cheap to clone (or wrap it in an `Arc`) when many readers copy it.
    pub fn copy(&self) -> Result<T, FutureError>
    where
        T: Clone,
    {
        self.get().cloned()
    }
}

impl<T: Send + Sync + 'static> Future<T> {
    /// Returns a type-erased handle to the same slot.
    pub fn erase(&self) -> FutureAny {
        FutureAny::from(self.share())
    }
}

impl<T> Clone for Future<T> {
    fn clone(&self) -> Self {
        self.share()
    }
}

impl<T> fmt::Debug for Future<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Future")
            .field("status", &self.fetch_status())
            .finish()
    }
}

/// Type-erased future exposing only status queries.
///
/// Holds a reference to the same slot as the typed handle it was made from;
/// erasure does not duplicate state.
#[derive(Clone)]
pub struct FutureAny {
    state: Arc<dyn ErasedState>,
}

impl FutureAny {
    /// Non-blocking peek: true once the slot reached a terminal state.
    #[inline]
    pub fn is_done(&self) -> bool {
        self.core().is_done()
    }

    /// Returns the current status.
    pub fn fetch_status(&self) -> FutureStatus {
        self.core().fetch_status()
    }

    /// Asks the executor to cancel the operation.
    pub fn request_cancel(&self) {
        self.core().request_cancel();
    }

    /// Asks the scheduler to hold the task back.
    pub fn request_suspend(&self) {
        self.core().request_suspend();
    }

    /// Withdraws a suspend request.
    pub fn request_resume(&self) {
        self.core().request_resume();
    }

    /// Returns a new erased handle to the same slot.
    pub fn share(&self) -> FutureAny {
        self.clone()
    }

    fn core(&self) -> &StateCore {
        self.state.core()
    }
}

impl<T: Send + Sync + 'static> From<Future<T>> for FutureAny {
    fn from(future: Future<T>) -> Self {
        let state: Arc<dyn ErasedState> = future.state;
        Self { state }
    }
}

impl fmt::Debug for FutureAny {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FutureAny")
            .field("status", &self.fetch_status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::allocator::Allocator;
    use crate::error::FutureError;
    use crate::future::{FutureStatus, SuspendState, make_promise};

    #[test]
    fn completion_is_visible_on_every_share() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<String>(&alloc).unwrap();
        let before = promise.get_future();
        let erased = before.erase();
        assert!(!before.is_done());
        assert!(!erased.is_done());

        promise.notify_completed("done".to_string());
        let after = before.share();

        assert!(before.is_done());
        assert!(after.is_done());
        assert!(erased.is_done());
        assert_eq!(after.get().map(String::as_str), Ok("done"));
    }

    #[test]
    fn share_does_not_copy_the_slot() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u8>(&alloc).unwrap();
        let a = promise.get_future();
        let count = a.share_count();
        let b = a.share();
        assert_eq!(b.share_count(), count + 1);
        drop(b);
        assert_eq!(a.share_count(), count);
    }

    #[test]
    fn canceled_future_reports_done_without_value() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u8>(&alloc).unwrap();
        let fut = promise.get_future();
        assert!(promise.notify_canceled());
        assert!(fut.is_done());
        assert_eq!(fut.fetch_status(), FutureStatus::Canceled);
        assert_eq!(fut.copy(), Err(FutureError::Canceled));
    }

    #[test]
    fn cancel_request_is_sticky_and_shared() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<()>(&alloc).unwrap();
        let fut = promise.get_future();
        fut.erase().request_cancel();
        assert_eq!(fut.fetch_cancel_request(), crate::CancelState::Canceled);
        assert_eq!(
            promise.fetch_cancel_request(),
            crate::CancelState::Canceled
        );
        assert!(!fut.is_done());
    }

    #[test]
    fn last_suspend_or_resume_request_wins() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u8>(&alloc).unwrap();
        let fut = promise.get_future();
        let erased = fut.erase();
        assert_eq!(fut.fetch_suspend_request(), SuspendState::Executing);

        erased.request_suspend();
        assert_eq!(promise.fetch_suspend_request(), SuspendState::Suspended);
        fut.request_resume();
        assert_eq!(promise.fetch_suspend_request(), SuspendState::Executing);
        fut.request_suspend();
        assert_eq!(fut.fetch_suspend_request(), SuspendState::Suspended);
        assert!(!fut.is_done());
    }

    #[test]
    fn dropped_promise_leaves_future_pending() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<u8>(&alloc).unwrap();
        let fut = promise.get_future();
        drop(promise);
        assert!(!fut.is_done());
        assert_eq!(fut.fetch_status(), FutureStatus::Scheduled);
        assert_eq!(fut.get(), Err(FutureError::Pending));
    }

    #[test]
    fn completion_crosses_threads() {
        let alloc = Allocator::unbounded();
        let promise = make_promise::<Vec<u32>>(&alloc).unwrap();
        let fut = promise.get_future();
        let writer = std::thread::spawn(move || promise.notify_completed(vec![1, 2, 3]));
        writer.join().unwrap();
        assert_eq!(fut.copy(), Ok(vec![1, 2, 3]));
    }
}

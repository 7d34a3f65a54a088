//! # Readiness protocol.
//!
//! A readiness predicate is a function of the time elapsed since its owning
//! descriptor was registered, answering [`TaskReady::Ready`] or
//! [`TaskReady::Waiting`]. The dispatch loop only ever calls [`Readiness::poll`];
//! it does not know *why* a task became ready.
//!
//! Shipped families:
//! - [`Readiness::all_of`]: every captured future is done (`await_all`, `deferred`)
//! - [`Readiness::any_of`]: at least one captured future is done (`await_any`)
//! - [`Readiness::after`]: a delay has elapsed (`delay`)
//! - [`Readiness::immediate`]: always ready (`schedule`)
//!
//! Captures are moved in at construction and charged to the allocator;
//! polling does not allocate.

use std::fmt;
use std::mem;
use std::time::Duration;

use crate::allocator::{Allocator, Lease};
use crate::error::SchedulerError;
use crate::future::FutureAny;

/// Answer of a readiness predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskReady {
    /// The task can be dispatched now.
    Ready,
    /// Poll again on a later tick.
    Waiting,
}

impl From<bool> for TaskReady {
    #[inline]
    fn from(ready: bool) -> Self {
        if ready {
            TaskReady::Ready
        } else {
            TaskReady::Waiting
        }
    }
}

type PollFn = Box<dyn FnMut(Duration) -> TaskReady + Send>;

/// Owned readiness predicate.
pub struct Readiness {
    poll: PollFn,
    _lease: Option<Lease>,
}

impl Readiness {
    /// Wraps an arbitrary predicate, charging its captures to `allocator`.
    pub fn new<F>(allocator: &Allocator, predicate: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(Duration) -> TaskReady + Send + 'static,
    {
        Self::charged(allocator, mem::size_of::<F>(), predicate)
    }

    fn charged<F>(allocator: &Allocator, bytes: usize, predicate: F) -> Result<Self, SchedulerError>
    where
        F: FnMut(Duration) -> TaskReady + Send + 'static,
    {
        let lease = allocator.reserve(bytes)?;
        Ok(Self {
            poll: Box::new(predicate),
            _lease: Some(lease),
        })
    }

    /// Always ready. Captures nothing, so nothing is charged.
    pub fn immediate() -> Self {
        Self {
            poll: Box::new(|_| TaskReady::Ready),
            _lease: None,
        }
    }

    /// Ready once `delay` has elapsed since registration.
    pub fn after(allocator: &Allocator, delay: Duration) -> Result<Self, SchedulerError> {
        Self::new(allocator, move |elapsed| TaskReady::from(elapsed >= delay))
    }

    /// Ready iff every future in `futures` is done.
    pub fn all_of(allocator: &Allocator, futures: Vec<FutureAny>) -> Result<Self, SchedulerError> {
        let bytes = Self::list_bytes(&futures);
        Self::charged(allocator, bytes, move |_| {
            TaskReady::from(futures.iter().all(FutureAny::is_done))
        })
    }

    /// Ready iff at least one future in `futures` is done.
    ///
    /// An empty list is never ready.
    pub fn any_of(allocator: &Allocator, futures: Vec<FutureAny>) -> Result<Self, SchedulerError> {
        let bytes = Self::list_bytes(&futures);
        Self::charged(allocator, bytes, move |_| {
            TaskReady::from(futures.iter().any(FutureAny::is_done))
        })
    }

    fn list_bytes(futures: &[FutureAny]) -> usize {
        mem::size_of::<Vec<FutureAny>>() + mem::size_of_val(futures)
    }

    /// Evaluates the predicate for the given elapsed time.
    #[inline]
    pub fn poll(&mut self, elapsed: Duration) -> TaskReady {
        (self.poll)(elapsed)
    }
}

impl fmt::Debug for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Readiness").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::future::make_promise;

    fn pair(alloc: &Allocator) -> (crate::Promise<u32>, FutureAny) {
        let p = make_promise::<u32>(alloc).unwrap();
        let f = p.get_future().erase();
        (p, f)
    }

    #[test]
    fn all_of_waits_for_every_future() {
        let alloc = Allocator::unbounded();
        let (pa, fa) = pair(&alloc);
        let (pb, fb) = pair(&alloc);
        let mut gate = Readiness::all_of(&alloc, vec![fa, fb]).unwrap();

        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Waiting);
        pa.notify_completed(1);
        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Waiting);
        pb.notify_completed(2);
        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Ready);
    }

    #[test]
    fn any_of_fires_on_first_future() {
        let alloc = Allocator::unbounded();
        let (_pa, fa) = pair(&alloc);
        let (pb, fb) = pair(&alloc);
        let mut gate = Readiness::any_of(&alloc, vec![fa, fb]).unwrap();

        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Waiting);
        pb.notify_completed(10);
        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Ready);
    }

    #[test]
    fn any_of_empty_is_never_ready() {
        let alloc = Allocator::unbounded();
        let mut gate = Readiness::any_of(&alloc, Vec::new()).unwrap();
        assert_eq!(gate.poll(Duration::from_secs(3600)), TaskReady::Waiting);
    }

    #[test]
    fn canceled_input_counts_as_done() {
        let alloc = Allocator::unbounded();
        let (pa, fa) = pair(&alloc);
        let mut gate = Readiness::all_of(&alloc, vec![fa]).unwrap();
        pa.notify_canceled();
        assert_eq!(gate.poll(Duration::ZERO), TaskReady::Ready);
    }

    #[test]
    fn after_uses_elapsed_time_only() {
        let alloc = Allocator::unbounded();
        let mut gate = Readiness::after(&alloc, Duration::from_millis(50)).unwrap();
        assert_eq!(gate.poll(Duration::from_millis(49)), TaskReady::Waiting);
        assert_eq!(gate.poll(Duration::from_millis(50)), TaskReady::Ready);
    }

    #[test]
    fn captures_are_charged_and_released() {
        let alloc = Allocator::unbounded();
        let (_pa, fa) = pair(&alloc);
        let baseline = alloc.in_use();
        let gate = Readiness::all_of(&alloc, vec![fa]).unwrap();
        assert!(alloc.in_use() > baseline);
        drop(gate);
        assert_eq!(alloc.in_use(), baseline);
    }

    #[test]
    fn exhausted_budget_refuses_predicate() {
        let alloc = Allocator::with_limit(0);
        let err = Readiness::after(&alloc, Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, SchedulerError::OutOfMemory { .. }));
        assert!(Readiness::immediate().poll(Duration::ZERO) == TaskReady::Ready);
    }
}

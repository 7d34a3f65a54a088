//! # Budgeted allocator shared by everything a scheduler creates.
//!
//! Every closure box, readiness capture and promise slot built by a combinator
//! reserves its size from one [`Allocator`] before it is constructed. The
//! reservation is held by a [`Lease`] that lives next to the allocation and
//! gives the bytes back when it is dropped.
//!
//! ```text
//! combinator ──► Allocator::reserve(n) ──► Lease ──┐
//!                     │                            │ stored inside the
//!                     ├─ Ok  (in_use + n <= limit) │ closure/slot it paid for
//!                     └─ Err(OutOfMemory)          ▼
//!                                          drop ──► in_use -= n
//! ```
//!
//! ## Rules
//! - Reservation is a single CAS loop; no lock.
//! - Lifetime of the accounting is scoped to the scheduler that owns the allocator,
//!   but leases keep the budget alive for as long as any allocation survives.
//! - `in_use()` returns to zero once every future, promise and task built from the
//!   allocator has been dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::SchedulerError;

#[derive(Debug)]
struct Budget {
    limit: Option<usize>,
    in_use: AtomicUsize,
}

/// Cheap-to-clone handle to a shared byte budget.
///
/// ## Example
/// ```
/// use taskweave::Allocator;
///
/// let alloc = Allocator::with_limit(128);
/// let lease = alloc.reserve(100).unwrap();
/// assert!(alloc.reserve(64).is_err());
/// drop(lease);
/// assert_eq!(alloc.in_use(), 0);
/// ```
#[derive(Clone, Debug)]
pub struct Allocator {
    budget: Arc<Budget>,
}

impl Allocator {
    /// Creates an allocator without a limit; reservations never fail.
    pub fn unbounded() -> Self {
        Self::build(None)
    }

    /// Creates an allocator that refuses reservations beyond `bytes` live bytes.
    pub fn with_limit(bytes: usize) -> Self {
        Self::build(Some(bytes))
    }

    /// Creates an allocator from an optional budget (`None` = unbounded).
    pub fn from_budget(limit: Option<usize>) -> Self {
        Self::build(limit)
    }

    fn build(limit: Option<usize>) -> Self {
        Self {
            budget: Arc::new(Budget {
                limit,
                in_use: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns the configured limit, if any.
    pub fn limit(&self) -> Option<usize> {
        self.budget.limit
    }

    /// Returns the number of bytes held by live leases.
    pub fn in_use(&self) -> usize {
        self.budget.in_use.load(Ordering::Relaxed)
    }

    /// Returns how many bytes can still be reserved (`None` = unbounded).
    pub fn available(&self) -> Option<usize> {
        self.budget
            .limit
            .map(|limit| limit.saturating_sub(self.in_use()))
    }

    /// Reserves `bytes` from the budget.
    ///
    /// ### Errors
    /// [`SchedulerError::OutOfMemory`] if the reservation would exceed the limit.
    pub fn reserve(&self, bytes: usize) -> Result<Lease, SchedulerError> {
        let budget = &self.budget;
        match budget.limit {
            None => {
                budget.in_use.fetch_add(bytes, Ordering::Relaxed);
            }
            Some(limit) => {
                let mut current = budget.in_use.load(Ordering::Relaxed);
                loop {
                    let next = current
                        .checked_add(bytes)
                        .filter(|next| *next <= limit)
                        .ok_or(SchedulerError::OutOfMemory {
                            requested: bytes,
                            in_use: current,
                            limit,
                        })?;
                    match budget.in_use.compare_exchange_weak(
                        current,
                        next,
                        Ordering::Relaxed,
                        Ordering::Relaxed,
                    ) {
                        Ok(_) => break,
                        Err(observed) => current = observed,
                    }
                }
            }
        }
        Ok(Lease {
            budget: Arc::clone(&self.budget),
            bytes,
        })
    }

    /// Reserves room for one `T`.
    pub fn reserve_for<T>(&self) -> Result<Lease, SchedulerError> {
        self.reserve(std::mem::size_of::<T>())
    }
}

impl Default for Allocator {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// Proof of a reservation; gives its bytes back on drop.
#[derive(Debug)]
pub struct Lease {
    budget: Arc<Budget>,
    bytes: usize,
}

impl Lease {
    /// Number of bytes held by this lease.
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.budget.in_use.fetch_sub(self.bytes, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unbounded_never_fails() {
        let alloc = Allocator::unbounded();
        let a = alloc.reserve(usize::MAX / 2).unwrap();
        assert_eq!(alloc.in_use(), usize::MAX / 2);
        assert_eq!(alloc.available(), None);
        drop(a);
        assert_eq!(alloc.in_use(), 0);
    }

    #[test]
    fn limit_is_enforced_and_released() {
        let alloc = Allocator::with_limit(100);
        let a = alloc.reserve(60).unwrap();
        let err = alloc.reserve(41).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::OutOfMemory {
                requested: 41,
                in_use: 60,
                limit: 100
            }
        );
        let b = alloc.reserve(40).unwrap();
        assert_eq!(alloc.available(), Some(0));
        drop(a);
        drop(b);
        assert_eq!(alloc.available(), Some(100));
    }

    #[test]
    fn overflowing_request_is_refused() {
        let alloc = Allocator::with_limit(usize::MAX);
        let _a = alloc.reserve(10).unwrap();
        assert!(alloc.reserve(usize::MAX).is_err());
    }

    #[test]
    fn clones_share_the_budget() {
        let alloc = Allocator::with_limit(10);
        let other = alloc.clone();
        let _a = alloc.reserve(8).unwrap();
        assert!(other.reserve(4).is_err());
        assert_eq!(other.in_use(), 8);
    }
}

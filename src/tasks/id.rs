//! Task identifiers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing identifier, unique for a scheduler's lifetime.
///
/// Assigned at registration time; ordering by id is registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Returns the raw numeric value.
    #[inline]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Shared id generator; clones hand out ids from the same sequence.
#[derive(Clone, Debug, Default)]
pub(crate) struct TaskIdGen {
    next: Arc<AtomicU64>,
}

impl TaskIdGen {
    pub(crate) fn next(&self) -> TaskId {
        TaskId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_shared_and_increasing() {
        let ids = TaskIdGen::default();
        let other = ids.clone();
        let a = ids.next();
        let b = other.next();
        let c = ids.next();
        assert!(a < b && b < c);
        assert_eq!(a.to_string(), "task#0");
    }
}

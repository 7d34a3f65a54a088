//! Task priorities.

use std::fmt;

/// Ordered priority of a task; higher values are dispatched first.
///
/// Tasks of equal priority are dispatched in registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum TaskPriority {
    /// Work that can wait behind everything else.
    Background,
    /// Below-normal work.
    Low,
    /// The default.
    #[default]
    Normal,
    /// Latency-sensitive work.
    High,
    /// Must run before anything else that is ready.
    Critical,
}

impl TaskPriority {
    /// Returns a short stable label for logs/metrics.
    pub fn as_label(self) -> &'static str {
        match self {
            TaskPriority::Background => "background",
            TaskPriority::Low => "low",
            TaskPriority::Normal => "normal",
            TaskPriority::High => "high",
            TaskPriority::Critical => "critical",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

//! Diagnostic metadata attached to tasks.

use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Opaque diagnostic bundle: a task name and the source location that registered it.
///
/// Never inspected by scheduling logic; only copied into events and logs.
///
/// ## Example
/// ```
/// use taskweave::TaskTraceInfo;
///
/// let trace = TaskTraceInfo::new("load-config");
/// assert_eq!(trace.name(), "load-config");
/// assert!(trace.origin().file().ends_with(".rs"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TaskTraceInfo {
    name: Arc<str>,
    origin: &'static Location<'static>,
}

impl TaskTraceInfo {
    /// Creates trace info named `name`, recording the caller's location as origin.
    #[track_caller]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            origin: Location::caller(),
        }
    }

    /// Returns the task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the name as a shared string (cheap to clone into events).
    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Returns the source location that created this trace info.
    pub fn origin(&self) -> &'static Location<'static> {
        self.origin
    }
}

impl fmt::Debug for TaskTraceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} @ {}", self.name, self.origin)
    }
}

impl fmt::Display for TaskTraceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

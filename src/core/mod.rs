//! Scheduling core: the task scheduler and its async dispatcher.
//!
//! Internal modules:
//! - [`scheduler`]: registries, id generator, allocator and the dispatch tick;
//! - [`handle`]: the [`Submit`] seam and the thread-safe [`SchedulerHandle`];
//! - [`dispatcher`]: drives ticks on tokio, fans out events, graceful shutdown;
//! - [`workers`]: blocking-pool execution of dispatched jobs;
//! - [`shutdown`]: cross-platform termination signals.

mod builder;
mod dispatcher;
mod handle;
mod scheduler;
mod shutdown;
mod workers;

pub use builder::DispatcherBuilder;
pub use dispatcher::Dispatcher;
pub use handle::{SchedulerHandle, Submit};
pub use scheduler::{TaskScheduler, Tick};
pub(crate) use workers::panic_message;

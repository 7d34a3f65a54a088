//! # Global scheduler configuration.
//!
//! Provides [`Config`] centralized settings for the scheduler and its async dispatcher.
//!
//! Config is used in two ways:
//! 1. **Scheduler creation**: `TaskScheduler::new(&config)` (allocator budget, bus capacity)
//! 2. **Dispatcher creation**: `Dispatcher::builder(config)` (workers, cadence, shutdown)
//!
//! ## Sentinel values
//! - `workers = 0` → closures run inline on the dispatch task (single-threaded)
//! - `memory_limit = 0` → unbounded allocator
//! - `grace = 0s` → do not wait for in-flight closures on shutdown

use std::time::Duration;

/// Global configuration for the scheduler runtime.
///
/// ## Field semantics
/// - `workers`: Worker cap for task closures (`0` = inline on the dispatch task)
/// - `tick_interval`: Dispatch loop cadence (min 1ms; clamped)
/// - `memory_limit`: Allocator budget in bytes (`0` = unbounded)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: Maximum wait for running closures after shutdown is requested
/// - `exit_when_idle`: Whether the dispatcher returns once no work is left
///
/// ## Notes
/// All fields are public for flexibility. Prefer using helper accessors to avoid
/// sprinkling sentinel checks (`0`) across the codebase.
#[derive(Clone, Debug)]
pub struct Config {
    /// Maximum number of task closures executing concurrently.
    ///
    /// - `0` = every closure runs on the dispatch task itself, one after another
    /// - `n > 0` = closures run on the blocking pool, at most `n` at a time
    ///
    /// Ready tasks beyond the cap stay registered and compete again next tick.
    pub workers: usize,

    /// Delay between two dispatch ticks.
    pub tick_interval: Duration,

    /// Byte budget shared by every closure, readiness predicate and promise slot.
    ///
    /// - `0` = unbounded
    /// - `n > 0` = combinators fail with `SchedulerError::OutOfMemory` past `n`
    pub memory_limit: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by Bus).
    pub bus_capacity: usize,

    /// Maximum time to wait for running closures once shutdown is requested.
    ///
    /// If exceeded, the dispatcher returns `RuntimeError::GraceExceeded`.
    pub grace: Duration,

    /// Return from the dispatch loop once nothing is registered, queued or running.
    ///
    /// Tasks waiting on a future that is never completed keep the loop alive.
    pub exit_when_idle: bool,
}

impl Config {
    /// Returns the worker cap as an `Option`.
    ///
    /// - `None` → inline execution on the dispatch task
    /// - `Some(n)` → at most `n` closures on the blocking pool
    #[inline]
    pub fn worker_limit(&self) -> Option<usize> {
        if self.workers == 0 {
            None
        } else {
            Some(self.workers)
        }
    }

    /// Returns the allocator budget as an `Option`.
    ///
    /// - `None` → unbounded
    /// - `Some(n)` → at most `n` live bytes
    #[inline]
    pub fn memory_budget(&self) -> Option<usize> {
        if self.memory_limit == 0 {
            None
        } else {
            Some(self.memory_limit)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns the tick interval clamped to a minimum of 1ms.
    ///
    /// `tokio::time::interval` panics on a zero period.
    #[inline]
    pub fn tick_interval_clamped(&self) -> Duration {
        self.tick_interval.max(Duration::from_millis(1))
    }
}

impl Default for Config {
    /// Default configuration:
    ///
    /// - `workers = 0` (inline execution)
    /// - `tick_interval = 1ms`
    /// - `memory_limit = 0` (unbounded)
    /// - `bus_capacity = 1024` (good baseline)
    /// - `grace = 30s`
    /// - `exit_when_idle = true`
    fn default() -> Self {
        Self {
            workers: 0,
            tick_interval: Duration::from_millis(1),
            memory_limit: 0,
            bus_capacity: 1024,
            grace: Duration::from_secs(30),
            exit_when_idle: true,
        }
    }
}

//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the scheduler, its jobs and the
//! dispatcher.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `TaskScheduler` (registration, dispatch, deferred),
//!   `SchedulerHandle` (registration), `Job::run` (finish), `Dispatcher`
//!   (shutdown, worker panics), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: `Dispatcher` subscriber listener (fans out to `SubscriberSet`).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};

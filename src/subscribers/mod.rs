//! # Event subscribers.
//!
//! [`Subscribe`] is the extension point; [`SubscriberSet`] fans events out to
//! subscribers on behalf of the [`Dispatcher`](crate::Dispatcher).
//!
//! ```text
//! TaskScheduler / Job / Dispatcher ── publish(Event) ──► Bus
//!                                                         │
//!                                            Dispatcher listener
//!                                                         │
//!                                                  SubscriberSet::emit
//!                                              ┌──────────┼──────────┐
//!                                              ▼          ▼          ▼
//!                                          LogWriter   Metrics     Custom
//! ```

mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

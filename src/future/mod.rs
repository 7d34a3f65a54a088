//! Future/promise completion channel.
//!
//! This module groups the write-once result slot shared by a single-writer
//! [`Promise`] and any number of read-only [`Future`] handles, plus the
//! type-erased [`FutureAny`] / [`PromiseAny`] forms the scheduler uses to poll
//! and signal heterogeneous slots without naming their value type.
//!
//! ## Contents
//! - [`FutureStatus`], [`CancelState`], [`SuspendState`], [`PreemptState`] status model
//! - [`Future`], [`FutureAny`] read handles
//! - [`Promise`], [`PromiseAny`], [`make_promise`] write handles
//!
//! ## Lifecycle
//! ```text
//! make_promise(alloc) ──► Promise<T> ──get_future()/share()──► Future<T> ×N
//!        │                     │                                  │
//!        │            notify_submitted/executing        is_done()/fetch_status()
//!        │                     │                                  │
//!        │            notify_completed(v) ── Release ──► Acquire ─┘ get()/copy()
//!        │            notify_canceled()
//!        ▼
//!   Lease (slot bytes) released when the last handle drops
//! ```
//!
//! There is no blocking wait. Waiting is expressed by leaving a task registered
//! in the scheduler until its readiness predicate observes `is_done()`.

mod future;
mod promise;
mod state;
mod status;

pub use future::{Future, FutureAny};
pub use promise::{Promise, PromiseAny, make_promise};
pub use status::{CancelState, FutureStatus, PreemptState, SuspendState};

use std::time::Instant;

use crate::core::{Submit, TaskScheduler};
use crate::error::SchedulerError;
use crate::future::{CancelState, Future, make_promise};
use crate::tasks::{DeferredFn, DeferredTask, Readiness};

use super::inputs::{AwaitInputs, DeferredContinuation};

/// Registers `f` to run on the dispatch thread once every future in `inputs` is done.
///
/// `f` receives `&mut TaskScheduler` first and may register further tasks
/// (including deferred ones) through it, e.g. to choose the next step from a
/// prior result. Deferred tasks have no priority; due ones run in
/// registration order at the start of each tick.
///
/// A cancel request on the returned future is honored while the inputs are
/// still pending: the next tick finalizes the output as `Canceled` and drops
/// the closure. Suspend requests keep it registered without polling.
///
/// ## Example
/// ```
/// use taskweave::{Future, TaskPriority, TaskScheduler, TaskTraceInfo, sched};
///
/// let mut scheduler = TaskScheduler::default();
/// let sample = sched::schedule(&mut scheduler, || 17, TaskPriority::Normal, TaskTraceInfo::new("sample")).unwrap();
///
/// let next = sched::deferred(
///     &mut scheduler,
///     |s: &mut TaskScheduler, sample: Future<i32>| {
///         let n = sample.copy().unwrap();
///         let name = if n % 2 == 0 { "even" } else { "odd" };
///         sched::schedule(s, move || name, TaskPriority::High, TaskTraceInfo::new(name)).unwrap()
///     },
///     (sample,),
/// )
/// .unwrap();
///
/// scheduler.run_until_idle(8);
/// assert_eq!(next.get().unwrap().copy(), Ok("odd"));
/// ```
pub fn deferred<I, F>(
    scheduler: &mut TaskScheduler,
    f: F,
    inputs: I,
) -> Result<Future<F::Output>, SchedulerError>
where
    I: AwaitInputs,
    F: DeferredContinuation<I>,
{
    let registered_at = Instant::now();
    let readiness = Readiness::all_of(scheduler.allocator(), inputs.erase_all())?;
    let promise = make_promise::<F::Output>(scheduler.allocator())?;
    let future = promise.get_future();
    let erased = promise.erase();

    let run = DeferredFn::new(scheduler.allocator(), move |s: &mut TaskScheduler| {
        if promise.fetch_cancel_request() == CancelState::Canceled {
            promise.notify_canceled();
            return;
        }
        promise.notify_executing();
        promise.notify_completed(f.call(s, inputs));
    })?;

    scheduler.push_deferred(DeferredTask::new(run, registered_at, readiness, erased));
    Ok(future)
}

use std::time::Instant;

use crate::core::Submit;
use crate::error::SchedulerError;
use crate::future::Future;
use crate::tasks::{Readiness, TaskPriority, TaskTraceInfo};

use super::inputs::{AwaitInputs, Continuation};
use super::register;

/// Registers `f` to run once every future in `inputs` is done.
///
/// `f` receives the typed futures by value. "Done" includes `Canceled`, so a
/// continuation that cares must check each input's result.
///
/// ### Errors
/// [`SchedulerError::OutOfMemory`] if the allocator cannot hold the predicate,
/// the promise or the closure; nothing is registered in that case.
pub fn await_all<S, I, F>(
    scheduler: &mut S,
    f: F,
    priority: TaskPriority,
    trace: TaskTraceInfo,
    inputs: I,
) -> Result<Future<F::Output>, SchedulerError>
where
    S: Submit + ?Sized,
    I: AwaitInputs,
    F: Continuation<I>,
{
    let id = scheduler.next_task_id();
    let registered_at = Instant::now();
    let readiness = Readiness::all_of(scheduler.allocator(), inputs.erase_all())?;
    register(
        scheduler,
        id,
        registered_at,
        readiness,
        move || f.call(inputs),
        priority,
        trace,
    )
}

/// Registers `f` to run once at least one future in `inputs` is done.
///
/// `f` still receives *every* input; only one is guaranteed done at dispatch,
/// so it must check each with [`Future::is_done`] before reading it.
pub fn await_any<S, I, F>(
    scheduler: &mut S,
    f: F,
    priority: TaskPriority,
    trace: TaskTraceInfo,
    inputs: I,
) -> Result<Future<F::Output>, SchedulerError>
where
    S: Submit + ?Sized,
    I: AwaitInputs,
    F: Continuation<I>,
{
    let id = scheduler.next_task_id();
    let registered_at = Instant::now();
    let readiness = Readiness::any_of(scheduler.allocator(), inputs.erase_all())?;
    register(
        scheduler,
        id,
        registered_at,
        readiness,
        move || f.call(inputs),
        priority,
        trace,
    )
}

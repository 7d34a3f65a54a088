use std::time::{Duration, Instant};

use crate::core::Submit;
use crate::error::SchedulerError;
use crate::future::Future;
use crate::tasks::{Readiness, TaskPriority, TaskTraceInfo};

use super::register;

/// Registers `f` to run as soon as a worker picks it.
pub fn schedule<S, F, R>(
    scheduler: &mut S,
    f: F,
    priority: TaskPriority,
    trace: TaskTraceInfo,
) -> Result<Future<R>, SchedulerError>
where
    S: Submit + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    let id = scheduler.next_task_id();
    let registered_at = Instant::now();
    register(
        scheduler,
        id,
        registered_at,
        Readiness::immediate(),
        f,
        priority,
        trace,
    )
}

/// Registers `f` to become ready once `delay` has elapsed since registration.
///
/// The delay is a lower bound: the task still waits for the next tick and a
/// free worker.
pub fn delay<S, F, R>(
    scheduler: &mut S,
    f: F,
    priority: TaskPriority,
    trace: TaskTraceInfo,
    delay: Duration,
) -> Result<Future<R>, SchedulerError>
where
    S: Submit + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + Sync + 'static,
{
    let id = scheduler.next_task_id();
    let registered_at = Instant::now();
    let readiness = Readiness::after(scheduler.allocator(), delay)?;
    register(scheduler, id, registered_at, readiness, f, priority, trace)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::allocator::Allocator;
    use crate::config::Config;
    use crate::core::TaskScheduler;
    use crate::error::FutureError;
    use crate::future::FutureStatus;

    fn trace(name: &str) -> TaskTraceInfo {
        TaskTraceInfo::new(name.to_string())
    }

    fn recording(
        scheduler: &mut TaskScheduler,
        log: &Arc<Mutex<Vec<&'static str>>>,
        name: &'static str,
        priority: TaskPriority,
    ) -> Future<()> {
        let log = Arc::clone(log);
        schedule(
            scheduler,
            move || log.lock().unwrap().push(name),
            priority,
            trace(name),
        )
        .unwrap()
    }

    #[test]
    fn schedule_runs_on_next_tick() {
        let mut scheduler = TaskScheduler::default();
        let out = schedule(&mut scheduler, || "done", TaskPriority::Normal, trace("t")).unwrap();

        assert_eq!(out.fetch_status(), FutureStatus::Scheduled);
        assert_eq!(out.get(), Err(FutureError::Pending));
        assert_eq!(scheduler.run_ready(), 1);
        assert_eq!(out.get(), Ok(&"done"));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn higher_priority_dispatches_first_in_either_order() {
        for low_first in [true, false] {
            let mut scheduler = TaskScheduler::default();
            let log = Arc::new(Mutex::new(Vec::new()));
            if low_first {
                recording(&mut scheduler, &log, "low", TaskPriority::Low);
                recording(&mut scheduler, &log, "high", TaskPriority::High);
            } else {
                recording(&mut scheduler, &log, "high", TaskPriority::High);
                recording(&mut scheduler, &log, "low", TaskPriority::Low);
            }

            scheduler.run_ready();
            assert_eq!(*log.lock().unwrap(), vec!["high", "low"]);
        }
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut scheduler = TaskScheduler::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        for name in ["first", "second", "third"] {
            recording(&mut scheduler, &log, name, TaskPriority::Normal);
        }
        recording(&mut scheduler, &log, "urgent", TaskPriority::Critical);

        scheduler.run_ready();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["urgent", "first", "second", "third"]
        );
    }

    #[test]
    fn budget_limits_one_tick() {
        let mut scheduler = TaskScheduler::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        recording(&mut scheduler, &log, "a", TaskPriority::Normal);
        recording(&mut scheduler, &log, "b", TaskPriority::High);
        recording(&mut scheduler, &log, "c", TaskPriority::Normal);

        let tick = scheduler.tick(Some(2));
        let picked: Vec<&str> = tick.jobs().iter().map(|job| job.trace().name()).collect();
        assert_eq!(picked, vec!["b", "a"]);
        assert_eq!(scheduler.pending(), 1);

        for job in tick.into_jobs() {
            job.run();
        }
        scheduler.run_ready();
        assert_eq!(*log.lock().unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn delay_waits_for_elapsed_time() {
        let mut scheduler = TaskScheduler::default();
        let out = delay(
            &mut scheduler,
            || 5u8,
            TaskPriority::Normal,
            trace("later"),
            Duration::from_millis(30),
        )
        .unwrap();

        assert_eq!(scheduler.run_ready(), 0);
        assert!(!out.is_done());

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(scheduler.run_ready(), 1);
        assert_eq!(out.copy(), Ok(5));
    }

    #[test]
    fn out_of_memory_registers_nothing() {
        let mut scheduler =
            TaskScheduler::with_allocator(&Config::default(), Allocator::with_limit(8));

        let err = schedule(&mut scheduler, || [0u64; 16], TaskPriority::Normal, trace("big"))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::OutOfMemory { .. }));
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.is_idle());
        assert_eq!(Submit::allocator(&scheduler).in_use(), 0);
    }

    #[test]
    fn cancel_before_dispatch_skips_closure() {
        let mut scheduler = TaskScheduler::default();
        let ran = Arc::new(Mutex::new(false));
        let flag = Arc::clone(&ran);
        let out = schedule(
            &mut scheduler,
            move || *flag.lock().unwrap() = true,
            TaskPriority::Normal,
            trace("doomed"),
        )
        .unwrap();

        out.request_cancel();
        let tick = scheduler.tick(None);
        assert_eq!(tick.canceled(), 1);
        assert!(tick.jobs().is_empty());
        assert_eq!(out.fetch_status(), FutureStatus::Canceled);
        assert_eq!(out.get(), Err(FutureError::Canceled));
        assert!(!*ran.lock().unwrap());
        assert!(scheduler.is_idle());
    }

    #[test]
    fn cancel_after_dispatch_is_observed_by_closure() {
        let mut scheduler = TaskScheduler::default();
        let out = schedule(&mut scheduler, || 1, TaskPriority::Normal, trace("late")).unwrap();

        let jobs = scheduler.tick(None).into_jobs();
        assert_eq!(out.fetch_status(), FutureStatus::Submitted);
        out.request_cancel();
        for job in jobs {
            job.run();
        }
        assert_eq!(out.copy(), Err(FutureError::Canceled));
    }

    #[test]
    fn suspended_task_stays_registered_until_resume() {
        let mut scheduler = TaskScheduler::default();
        let out = schedule(&mut scheduler, || 3, TaskPriority::Normal, trace("paused")).unwrap();

        out.request_suspend();
        assert_eq!(scheduler.run_ready(), 0);
        assert_eq!(scheduler.run_ready(), 0);
        assert_eq!(out.fetch_status(), FutureStatus::Suspended);
        assert_eq!(scheduler.pending(), 1);

        out.request_resume();
        assert_eq!(scheduler.run_ready(), 1);
        assert_eq!(out.copy(), Ok(3));
    }

    #[test]
    fn cancel_overrides_suspend() {
        let mut scheduler = TaskScheduler::default();
        let out = schedule(&mut scheduler, || 3, TaskPriority::Normal, trace("paused")).unwrap();

        out.request_suspend();
        scheduler.run_ready();
        out.request_cancel();
        assert_eq!(scheduler.tick(None).canceled(), 1);
        assert_eq!(out.copy(), Err(FutureError::Canceled));
        assert!(scheduler.is_idle());
    }

    #[test]
    fn preempted_job_goes_back_to_registry() {
        let mut scheduler = TaskScheduler::default();
        let mut rx = scheduler.bus().subscribe();
        let ran = Arc::new(Mutex::new(0));
        let count = Arc::clone(&ran);
        let out = schedule(
            &mut scheduler,
            move || *count.lock().unwrap() += 1,
            TaskPriority::Normal,
            trace("yielding"),
        )
        .unwrap();

        let mut jobs = scheduler.tick(None).into_jobs();
        let job = jobs.pop().unwrap();
        let promise = job.promise().clone();
        promise.request_preempt();
        job.run();

        assert_eq!(*ran.lock().unwrap(), 0);
        assert_eq!(out.fetch_status(), FutureStatus::Preempted);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_ready(), 0);

        promise.clear_preempt_request();
        assert_eq!(scheduler.run_ready(), 1);
        assert_eq!(*ran.lock().unwrap(), 1);
        assert_eq!(out.fetch_status(), FutureStatus::Completed);

        let held: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|ev| ev.kind == crate::EventKind::TaskHeld)
            .collect();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].status, Some(FutureStatus::Preempted));
        assert_eq!(held[0].task.as_deref(), Some("yielding"));
    }

    #[test]
    fn handle_registers_from_worker_thread() {
        let mut scheduler = TaskScheduler::default();
        let mut handle = scheduler.handle();

        let outer = std::thread::spawn(move || {
            schedule(&mut handle, || 99, TaskPriority::High, trace("from-worker")).unwrap()
        })
        .join()
        .unwrap();

        assert_eq!(scheduler.pending(), 1);
        scheduler.run_ready();
        assert_eq!(outer.copy(), Ok(99));
    }

    #[test]
    fn handle_fails_after_scheduler_drop() {
        let scheduler = TaskScheduler::default();
        let mut handle = scheduler.handle();
        drop(scheduler);

        assert!(handle.is_closed());
        let err = schedule(&mut handle, || (), TaskPriority::Normal, trace("orphan")).unwrap_err();
        assert_eq!(err, SchedulerError::Closed);
    }
}

//! # Dispatcher: drives a [`TaskScheduler`] on tokio, fans out events, shuts down gracefully.
//!
//! The [`Dispatcher`] owns the runtime configuration and the subscriber list.
//! It borrows the scheduler for the duration of a run, ticking it on a fixed
//! cadence and handing picked jobs to tokio's blocking pool.
//!
//! ## High-level architecture
//! ```text
//! run_until(scheduler, token):
//!
//! Preparation:
//!   - semaphore from cfg.workers (0 = inline on the dispatch task)
//!   - subscriber listener: Bus.subscribe() ─► SubscriberSet::emit(&Event)
//!   - tokio::time::interval(cfg.tick_interval)
//!
//! Every tick:
//!   workers.reap()                          (re-raises closure panics)
//!   permits = try_acquire up to `workers`
//!   scheduler.tick(Some(permits.len())) ──► Job[0] Job[1] ... Job[k-1]
//!       │                                     │
//!       └── inline mode: job.run() here       └──► spawn_blocking(job.run(), permit)
//!   exit_when_idle && scheduler idle && no workers ─► Ok(())
//!
//! Shutdown path (token cancelled, or OS signal via run()):
//!   Bus.publish(ShutdownRequested)
//!   wait for running jobs up to cfg.grace:
//!     ├─ all joined      → Bus.publish(AllStoppedWithin), Ok(())
//!     └─ grace exceeded  → Bus.publish(GraceExceeded), Err(GraceExceeded { stuck })
//! ```
//!
//! Tasks still registered at shutdown stay in the scheduler; a later run picks them up.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use taskweave::{Config, Dispatcher, TaskPriority, TaskScheduler, TaskTraceInfo, sched};
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.workers = 2;
//!     cfg.grace = Duration::from_secs(5);
//!
//!     let mut scheduler = TaskScheduler::new(&cfg);
//!     let a = sched::schedule(&mut scheduler, || 3, TaskPriority::Normal, TaskTraceInfo::new("a"))?;
//!     let b = sched::schedule(&mut scheduler, || 4, TaskPriority::Normal, TaskTraceInfo::new("b"))?;
//!     let sum = sched::await_all(
//!         &mut scheduler,
//!         |a: taskweave::Future<i32>, b: taskweave::Future<i32>| a.copy().unwrap_or(0) + b.copy().unwrap_or(0),
//!         TaskPriority::High,
//!         TaskTraceInfo::new("sum"),
//!         (a, b),
//!     )?;
//!
//!     Dispatcher::builder(cfg).build().run(&mut scheduler).await?;
//!     assert_eq!(sum.copy(), Ok(7));
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

use super::builder::DispatcherBuilder;
use super::scheduler::TaskScheduler;
use super::shutdown;
use super::workers::Workers;

/// Drives a [`TaskScheduler`] on the tokio runtime.
pub struct Dispatcher {
    /// Runtime configuration.
    pub cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Dispatcher {
    /// Returns a builder for a dispatcher using `cfg`.
    pub fn builder(cfg: Config) -> DispatcherBuilder {
        DispatcherBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { cfg, subscribers }
    }

    /// Runs until the scheduler is idle (when `exit_when_idle` is set) or a
    /// termination signal arrives, which starts the graceful shutdown.
    pub async fn run(&self, scheduler: &mut TaskScheduler) -> Result<(), RuntimeError> {
        let token = CancellationToken::new();
        let watcher = {
            let token = token.clone();
            tokio::spawn(async move {
                match shutdown::wait_for_shutdown_signal().await {
                    Ok(_) => token.cancel(),
                    Err(err) => tracing::warn!(error = %err, "signal handler registration failed"),
                }
            })
        };

        let res = self.run_until(scheduler, token).await;
        watcher.abort();
        res
    }

    /// Runs until the scheduler is idle (when `exit_when_idle` is set) or `token`
    /// is cancelled, which starts the graceful shutdown.
    pub async fn run_until(
        &self,
        scheduler: &mut TaskScheduler,
        token: CancellationToken,
    ) -> Result<(), RuntimeError> {
        let bus = scheduler.bus().clone();
        let stop_listener = CancellationToken::new();
        let listener = self.subscriber_listener(&bus, stop_listener.clone());

        let semaphore = self.cfg.worker_limit().map(|n| Arc::new(Semaphore::new(n)));
        let mut workers = Workers::new(bus.clone());

        let mut interval = tokio::time::interval(self.cfg.tick_interval_clamped());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(workers = self.cfg.workers, "dispatch loop started");
        let outcome = loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    break self.wait_all_with_grace(&bus, &mut workers).await;
                }
                _ = interval.tick() => {
                    workers.reap();
                    Self::dispatch(scheduler, semaphore.as_ref(), &mut workers);
                    if self.cfg.exit_when_idle && scheduler.is_idle() && workers.is_empty() {
                        break Ok(());
                    }
                }
            }
        };
        tracing::debug!(ok = outcome.is_ok(), "dispatch loop stopped");

        stop_listener.cancel();
        if let Some(listener) = listener {
            let _ = listener.await;
        }
        outcome
    }

    /// One dispatch tick: inline, or bounded by the free worker permits.
    fn dispatch(
        scheduler: &mut TaskScheduler,
        semaphore: Option<&Arc<Semaphore>>,
        workers: &mut Workers,
    ) {
        let Some(semaphore) = semaphore else {
            for job in scheduler.tick(None).into_jobs() {
                job.run();
            }
            return;
        };

        let permits: Vec<OwnedSemaphorePermit> = std::iter::from_fn(|| {
            Arc::clone(semaphore).try_acquire_owned().ok()
        })
        .collect();
        let jobs = scheduler.tick(Some(permits.len())).into_jobs();
        for (job, permit) in jobs.into_iter().zip(permits) {
            workers.spawn(job, permit);
        }
    }

    /// Subscribes to the bus and forwards events to the subscriber set.
    ///
    /// After `stop` fires, events already in the bus are still delivered before
    /// the subscriber workers are shut down.
    fn subscriber_listener(&self, bus: &Bus, stop: CancellationToken) -> Option<JoinHandle<()>> {
        if self.subscribers.is_empty() {
            return None;
        }
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(self.subscribers.clone(), bus.clone());

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    res = rx.recv() => match res {
                        Ok(ev) => set.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "subscriber listener lagged behind the bus");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = stop.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => set.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            set.shutdown().await;
        }))
    }

    /// Waits for running jobs within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout and returns
    /// [`RuntimeError::GraceExceeded`] with the names of the jobs still running.
    async fn wait_all_with_grace(&self, bus: &Bus, workers: &mut Workers) -> Result<(), RuntimeError> {
        bus.publish(Event::new(EventKind::ShutdownRequested));
        let grace = self.cfg.grace;

        match tokio::time::timeout(grace, workers.join_all()).await {
            Ok(()) => {
                bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(_) => {
                bus.publish(Event::new(EventKind::GraceExceeded));
                let stuck = workers.stuck();
                workers.detach();
                Err(RuntimeError::GraceExceeded { grace, stuck })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::future::Future;
    use crate::sched;
    use crate::tasks::{TaskPriority, TaskTraceInfo};

    fn cfg(workers: usize) -> Config {
        Config {
            workers,
            grace: Duration::from_secs(5),
            ..Config::default()
        }
    }

    struct Recorder {
        kinds: Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            if let Ok(mut kinds) = self.kinds.lock() {
                kinds.push(ev.kind);
            }
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test]
    async fn inline_run_completes_dependency_chain() {
        let config = cfg(0);
        let mut scheduler = TaskScheduler::new(&config);

        let a = sched::schedule(&mut scheduler, || 3, TaskPriority::Normal, TaskTraceInfo::new("a"))
            .unwrap();
        let b = sched::delay(
            &mut scheduler,
            || 4,
            TaskPriority::Normal,
            TaskTraceInfo::new("b"),
            Duration::from_millis(5),
        )
        .unwrap();
        let sum = sched::await_all(
            &mut scheduler,
            |a: Future<i32>, b: Future<i32>| a.copy().unwrap() + b.copy().unwrap(),
            TaskPriority::Normal,
            TaskTraceInfo::new("sum"),
            (a, b),
        )
        .unwrap();

        Dispatcher::builder(config)
            .build()
            .run_until(&mut scheduler, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(sum.copy(), Ok(7));
        assert!(scheduler.is_idle());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_pool_respects_cap() {
        let config = cfg(2);
        let mut scheduler = TaskScheduler::new(&config);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut outputs = Vec::new();
        for i in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let fut = sched::schedule(
                &mut scheduler,
                move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(10));
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                },
                TaskPriority::Normal,
                TaskTraceInfo::new("sleeper"),
            )
            .unwrap();
            outputs.push(fut);
        }

        Dispatcher::builder(config)
            .build()
            .run_until(&mut scheduler, CancellationToken::new())
            .await
            .unwrap();

        assert!(peak.load(Ordering::SeqCst) <= 2);
        for (i, fut) in outputs.iter().enumerate() {
            assert_eq!(fut.copy(), Ok(i));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn grace_exceeded_reports_stuck_tasks() {
        let config = Config {
            workers: 1,
            grace: Duration::from_millis(20),
            exit_when_idle: false,
            ..Config::default()
        };
        let mut scheduler = TaskScheduler::new(&config);
        let _slow = sched::schedule(
            &mut scheduler,
            || std::thread::sleep(Duration::from_millis(300)),
            TaskPriority::Normal,
            TaskTraceInfo::new("slow"),
        )
        .unwrap();

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            cancel.cancel();
        });

        let err = Dispatcher::builder(config)
            .build()
            .run_until(&mut scheduler, token)
            .await
            .unwrap_err();
        match err {
            RuntimeError::GraceExceeded { stuck, .. } => assert_eq!(stuck, vec!["slow".to_string()]),
        }
    }

    #[tokio::test]
    async fn subscribers_observe_lifecycle() {
        let config = cfg(0);
        let mut scheduler = TaskScheduler::new(&config);
        let recorder = Arc::new(Recorder {
            kinds: Mutex::new(Vec::new()),
        });

        let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
        let dispatcher = Dispatcher::builder(config).with_subscribers(subs).build();
        let _out = sched::schedule(&mut scheduler, || (), TaskPriority::Low, TaskTraceInfo::new("noop"))
            .unwrap();

        dispatcher
            .run_until(&mut scheduler, CancellationToken::new())
            .await
            .unwrap();

        let kinds = recorder.kinds.lock().unwrap().clone();
        assert!(kinds.contains(&EventKind::TaskDispatched));
        assert!(kinds.contains(&EventKind::TaskFinished));
    }

    #[tokio::test]
    async fn cancelled_token_stops_waiting_loop() {
        let config = Config {
            exit_when_idle: false,
            ..cfg(0)
        };
        let mut scheduler = TaskScheduler::new(&config);
        let token = CancellationToken::new();
        token.cancel();

        Dispatcher::builder(config)
            .build()
            .run_until(&mut scheduler, token)
            .await
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn worker_panic_is_published_then_reraised() {
        use futures::FutureExt;

        let config = cfg(1);
        let mut scheduler = TaskScheduler::new(&config);
        let mut rx = scheduler.bus().subscribe();
        let _boom = sched::schedule(
            &mut scheduler,
            || -> u8 { panic!("disk on fire") },
            TaskPriority::Normal,
            TaskTraceInfo::new("exploding"),
        )
        .unwrap();

        let dispatcher = Dispatcher::builder(config).build();
        let outcome = std::panic::AssertUnwindSafe(
            dispatcher.run_until(&mut scheduler, CancellationToken::new()),
        )
        .catch_unwind()
        .await;

        let payload = match outcome {
            Ok(res) => panic!("dispatch loop returned {res:?} instead of unwinding"),
            Err(payload) => payload,
        };
        assert_eq!(crate::core::panic_message(payload.as_ref()), "disk on fire");

        let panicked: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|ev| ev.kind == EventKind::TaskPanicked)
            .collect();
        assert_eq!(panicked.len(), 1);
        assert_eq!(panicked[0].task.as_deref(), Some("exploding"));
        assert_eq!(panicked[0].reason.as_deref(), Some("disk on fire"));
    }
}

//! Multi-stage pipeline on the blocking pool.
//!
//! ```text
//! cargo run --example pipeline --features logging
//! RUST_LOG=taskweave=debug cargo run --example pipeline --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use taskweave::{
    Config, Dispatcher, Future, LogWriter, Subscribe, TaskPriority, TaskScheduler, TaskTraceInfo,
    sched,
};
use tracing_subscriber::EnvFilter;

fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| acc.rotate_left(5) ^ u32::from(*b))
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cfg = Config {
        workers: 4,
        tick_interval: Duration::from_millis(2),
        memory_limit: 1 << 20,
        grace: Duration::from_secs(5),
        ..Config::default()
    };
    let mut scheduler = TaskScheduler::new(&cfg);

    let load = sched::schedule(
        &mut scheduler,
        || (0u8..=255).cycle().take(64 * 1024).collect::<Vec<u8>>(),
        TaskPriority::High,
        TaskTraceInfo::new("load"),
    )?;
    let header = sched::delay(
        &mut scheduler,
        || "TWV1".to_string(),
        TaskPriority::Normal,
        TaskTraceInfo::new("header"),
        Duration::from_millis(20),
    )?;

    let sum = sched::await_all(
        &mut scheduler,
        |data: Future<Vec<u8>>| data.get().map(|bytes| checksum(bytes)).unwrap_or(0),
        TaskPriority::Normal,
        TaskTraceInfo::new("checksum"),
        (load.share(),),
    )?;

    // The worker-side follow-up goes through a handle; plain tasks only.
    let handle = scheduler.handle();
    let report = sched::deferred(
        &mut scheduler,
        move |s: &mut TaskScheduler, header: Future<String>, sum: Future<u32>| {
            let header = header.copy().unwrap_or_default();
            let sum = sum.copy().unwrap_or_default();
            let priority = if sum % 2 == 0 {
                TaskPriority::Low
            } else {
                TaskPriority::Critical
            };
            let mut handle = handle;
            sched::schedule(
                s,
                move || {
                    let audit = sched::schedule(
                        &mut handle,
                        move || tracing::info!(sum, "audit recorded"),
                        TaskPriority::Background,
                        TaskTraceInfo::new("audit"),
                    );
                    if let Err(err) = audit {
                        tracing::warn!(error = %err, "audit not registered");
                    }
                    format!("{header}:{sum:08x}")
                },
                priority,
                TaskTraceInfo::new("report"),
            )
        },
        (header, sum),
    )?;

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    Dispatcher::builder(cfg)
        .with_subscribers(subs)
        .build()
        .run(&mut scheduler)
        .await?;

    match report.get() {
        Ok(Ok(line)) => {
            let line = line.copy()?;
            tracing::info!(report = %line, "pipeline finished");
        }
        Ok(Err(err)) => tracing::warn!(error = %err, "report stage not registered"),
        Err(err) => tracing::warn!(error = %err, "planner did not run"),
    }
    Ok(())
}

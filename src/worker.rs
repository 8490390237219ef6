// Reporting loop: build a snapshot each tick and push it to the sink.
// Single-flight: a cycle (collection + push) finishes before the next tick is awaited.

use crate::builder::SnapshotBuilder;
use crate::error::SinkError;
use crate::sink::TelemetrySink;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Builder, sink and stop signal for the worker.
pub struct WorkerDeps<K> {
    pub builder: SnapshotBuilder,
    pub sink: K,
    pub cancel: CancellationToken,
}

pub struct WorkerConfig {
    /// Gap between cycle starts.
    pub interval: Duration,
    /// How often to log push counters at INFO level.
    pub stats_log_interval: Duration,
}

/// Why the worker returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerExit {
    /// Stop was requested through the cancellation token.
    Cancelled,
    /// The collector refused a payload; the agent must not keep sending.
    Rejected { code: i64, message: String },
}

#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error("snapshot collection failed: {0}")]
    Collect(String),
    #[error(transparent)]
    Sink(#[from] SinkError),
}

async fn run_cycle<K: TelemetrySink>(
    builder: &Arc<Mutex<SnapshotBuilder>>,
    sink: &K,
) -> Result<(), CycleError> {
    let builder = builder.clone();
    let snapshot = tokio::task::spawn_blocking(move || {
        // Recover after a panicked build; builder fields are only ever replaced whole.
        let mut builder = builder.lock().unwrap_or_else(PoisonError::into_inner);
        builder.build()
    })
    .await
    .map_err(|e| CycleError::Collect(format!("collection task join: {e}")))?;
    sink.send(&snapshot).await?;
    Ok(())
}

pub fn spawn<K: TelemetrySink>(
    deps: WorkerDeps<K>,
    config: WorkerConfig,
) -> tokio::task::JoinHandle<WorkerExit> {
    let WorkerDeps {
        builder,
        sink,
        cancel,
    } = deps;
    let WorkerConfig {
        interval: cycle_interval,
        stats_log_interval,
    } = config;
    let builder = Arc::new(Mutex::new(builder));

    let worker_span = tracing::span!(
        tracing::Level::DEBUG,
        "worker",
        interval_ms = cycle_interval.as_millis() as u64
    );

    tokio::spawn(
        async move {
            let mut tick = interval(cycle_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            let mut stats_log_tick = interval(stats_log_interval);
            stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // first tick of an interval completes immediately
            stats_log_tick.tick().await;

            let mut pushes_ok: u64 = 0;
            let mut push_failures: u64 = 0;

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Worker shutting down");
                        return WorkerExit::Cancelled;
                    }
                    _ = stats_log_tick.tick() => {
                        tracing::info!(pushes_ok, push_failures, "app stats");
                        continue;
                    }
                    _ = tick.tick() => {}
                }

                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::debug!("Worker shutting down mid-cycle");
                        return WorkerExit::Cancelled;
                    }
                    outcome = run_cycle(&builder, &sink) => outcome,
                };

                match outcome {
                    Ok(()) => {
                        pushes_ok += 1;
                        tracing::debug!(operation = "push_snapshot", "Snapshot delivered");
                    }
                    Err(CycleError::Sink(SinkError::Rejected { code, message })) => {
                        tracing::error!(
                            code,
                            message = %message,
                            operation = "push_snapshot",
                            "Collector rejected snapshot; stopping"
                        );
                        cancel.cancel();
                        return WorkerExit::Rejected { code, message };
                    }
                    Err(e) => {
                        push_failures += 1;
                        tracing::warn!(
                            error = %e,
                            operation = "push_snapshot",
                            "Cycle failed; retrying next tick"
                        );
                    }
                }
            }
        }
        .instrument(worker_span),
    )
}

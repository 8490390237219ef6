// Stop signalling: OS signals flip a cancellation token, the supervisor polls it.

use crate::worker::WorkerExit;
use tokio::task::JoinHandle;
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;

/// How often the supervisor checks for a stop request.
pub const SUPERVISOR_POLL: Duration = Duration::from_secs(1);

/// Resolves on SIGINT or SIGTERM (Ctrl+C only on non-Unix).
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}

/// Cancels `token` when a stop signal arrives. Idempotent; exits quietly if
/// the token is cancelled some other way first.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::info!("Received shutdown signal");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

/// Wait until the worker ends or a stop is requested, checking once per `poll`.
/// On a stop request the worker observes the same token and returns promptly.
pub async fn supervise(
    token: &CancellationToken,
    worker: JoinHandle<WorkerExit>,
    poll: Duration,
) -> anyhow::Result<WorkerExit> {
    let mut ticker = interval(poll);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if worker.is_finished() {
            break;
        }
        if token.is_cancelled() {
            tracing::info!("Stop requested; waiting for worker");
            break;
        }
    }
    worker
        .await
        .map_err(|e| anyhow::anyhow!("worker task join: {}", e))
}

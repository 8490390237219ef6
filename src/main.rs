use anyhow::Result;
use hostreport::*;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let dir = config::agent_dir();
    let app_config = config::AppConfig::load(&dir)?;
    let credentials_path = dir.join(config::CREDENTIALS_FILE);
    let credentials = tokio::task::spawn_blocking(move || {
        let stdin = std::io::stdin();
        config::load_or_prompt(&credentials_path, &mut stdin.lock(), &mut std::io::stdout())
    })
    .await??;

    let sink = sink::HttpSink::new(&credentials.api_address, app_config.sink_timeout())?;
    let source = counters::platform_source(app_config.cpu_window());
    let builder = tokio::task::spawn_blocking({
        let builder_config = builder::BuilderConfig {
            secret_key: credentials.secret_key,
            disk_ttl: app_config.disk_ttl(),
            utc_offset: app_config.utc_offset(),
        };
        move || builder::SnapshotBuilder::new(source, builder_config)
    })
    .await?;

    tracing::info!(
        agent = %version::agent_id(),
        endpoint = sink.endpoint(),
        os = builder.os_name(),
        interval_ms = app_config.tick_interval().as_millis() as u64,
        energy_saving = app_config.reporting.energy_saving,
        "Agent running"
    );

    let token = CancellationToken::new();
    let _signals = shutdown::spawn_signal_listener(token.clone());
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            builder,
            sink,
            cancel: token.clone(),
        },
        worker::WorkerConfig {
            interval: app_config.tick_interval(),
            stats_log_interval: app_config.stats_log_interval(),
        },
    );

    match shutdown::supervise(&token, worker_handle, shutdown::SUPERVISOR_POLL).await? {
        worker::WorkerExit::Cancelled => {
            tracing::info!("Agent stopped");
            Ok(())
        }
        worker::WorkerExit::Rejected { code, message } => {
            anyhow::bail!("collector rejected snapshot (code {code}): {message}")
        }
    }
}

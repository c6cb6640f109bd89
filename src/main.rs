//! Unattended race-result logger.
//!
//! Wires the capture pipeline together: operator log, configuration,
//! crash-recovery flush, shared memory connection, then the poll loop until
//! the process is terminated. Exits 1 on a telemetry format version mismatch
//! or when the log sink cannot be opened; everything else degrades and
//! retries.

use anyhow::Context;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

#[cfg(windows)]
use {
    parcferme::artifact::ArtifactPaths,
    parcferme::config::{Config, DEFAULT_CONFIG_FILE},
    parcferme::delivery::{DeliveryQueue, HttpCollector},
    parcferme::notify,
    parcferme::pipeline::{Pipeline, Timing},
    parcferme::windows::SharedMemoryRegion,
    tokio_util::sync::CancellationToken,
};

/// CSV output alongside the JSON artifact.
const ENABLE_CSV: bool = false;

const LOG_DIR: &str = "log";
const LOG_FILE: &str = "log/info.log";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // The operator log is the only view into an unattended deployment; not
    // being able to open it is the one I/O failure worth dying for.
    if let Err(e) = init_logging() {
        eprintln!("ERROR: Failed to open log sink {}: {:#}", LOG_FILE, e);
        return ExitCode::from(1);
    }

    info!("Race results logger started");
    info!("CSV output {}", if ENABLE_CSV { "enabled" } else { "disabled" });

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Stdout and `log/info.log`, both behind the standard `RUST_LOG` filter.
fn init_logging() -> anyhow::Result<()> {
    std::fs::create_dir_all(LOG_DIR).context("create log directory")?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(LOG_FILE)
        .context("open log file")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(std::sync::Mutex::new(file)))
        .init();
    Ok(())
}

#[cfg(windows)]
async fn run() -> anyhow::Result<()> {
    notify::startup();

    let config = Config::load(DEFAULT_CONFIG_FILE);
    let paths = ArtifactPaths::default();
    let timing = Timing::default();

    // Flush artifacts a previous run left behind before anything else; the
    // simulation may not even be running yet.
    let recovery = DeliveryQueue::new(
        HttpCollector::new(config.upload_url()),
        paths.sent_dir.clone(),
        timing.retry_interval,
        config.disable_upload,
    );
    recovery.flush_all(&paths).await.context("flush leftover artifacts")?;

    let region = connect(timing.reconnect_interval).await;

    let mut pipeline = Pipeline::new(
        region,
        HttpCollector::new(config.upload_url()),
        config,
        paths,
        timing,
        ENABLE_CSV,
    );
    pipeline.verify_version().await.context("validate telemetry format version")?;

    // Runs until the process is terminated externally.
    pipeline.run(CancellationToken::new()).await;
    Ok(())
}

/// Wait for the simulation to publish its shared memory, retrying forever on
/// a fixed interval.
#[cfg(windows)]
async fn connect(interval: std::time::Duration) -> SharedMemoryRegion {
    loop {
        match SharedMemoryRegion::open() {
            Ok(region) => {
                info!("Connection established to shared memory");
                return region;
            }
            Err(e) => {
                info!(
                    "Failed to open shared memory ({}), retrying in {} seconds",
                    e,
                    interval.as_secs()
                );
                tokio::time::sleep(interval).await;
            }
        }
    }
}

#[cfg(not(windows))]
async fn run() -> anyhow::Result<()> {
    anyhow::bail!("live telemetry capture requires Windows shared memory")
}

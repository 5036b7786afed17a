use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use calibrator_common::CalibratorConfig;
use chrono_tz::Tz;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::{
    clock::SystemClock, device::CometBlueClient, sensor_feed::FileSensorFeed,
    supervisor::Supervisor,
};

/// Keeps a Comet Blue radiator thermostat's temperature offset calibrated
/// against an external room sensor.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long)]
    debug: bool,

    /// Path to the JSON configuration file
    #[arg(long, env = "CALIBRATOR_CONFIG", default_value = "calibrator.json")]
    config: PathBuf,
}

pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let mut config = read_config(&cli.config).await?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.sanitize();

    let timezone: Tz = config
        .timezone
        .parse()
        .map_err(|err| anyhow::anyhow!("unknown timezone {:?}: {err}", config.timezone))?;

    info!(
        address = %config.device.address,
        sensor = %config.sensor.path.display(),
        %timezone,
        "starting thermostat calibrator"
    );

    let cancel = CancellationToken::new();
    spawn_shutdown_listener(cancel.clone());

    let client = Arc::new(CometBlueClient::new(config.device.clone()));
    let sensor = FileSensorFeed::new(config.sensor.clone());
    let clock = Arc::new(SystemClock::new(timezone));

    Supervisor::new(client, sensor, clock, &config, cancel)
        .run()
        .await;
    Ok(())
}

async fn read_config(path: &Path) -> anyhow::Result<CalibratorConfig> {
    match tokio::fs::read(path).await {
        Ok(raw) => serde_json::from_slice::<CalibratorConfig>(&raw)
            .with_context(|| format!("invalid configuration in {}", path.display())),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "no configuration file, using defaults");
            Ok(CalibratorConfig::default())
        }
        Err(err) => {
            Err(err).with_context(|| format!("failed to read configuration {}", path.display()))
        }
    }
}

fn apply_env_overrides(config: &mut CalibratorConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(address) = lookup("THERMOSTAT_ADDRESS") {
        config.device.address = address;
    }
    if let Some(path) = lookup("THERMOSTAT_SENSOR_FILE") {
        config.sensor.path = PathBuf::from(path);
    }
}

fn spawn_shutdown_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            match signal(SignalKind::terminate()) {
                Ok(mut terminate) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = terminate.recv() => {}
                    }
                }
                Err(err) => {
                    warn!(error = %err, "SIGTERM handler unavailable");
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        info!("shutdown requested");
        cancel.cancel();
    });
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioner Daemon (provisionerd)
//!
//! Background process that owns the operation queues and drives every
//! operation through its stages.

use std::path::PathBuf;

use pv_adapters::{
    HelmInstallerAdapter, KubectlShootAdapter, NoOpInstallerAdapter, TracedInstallerAdapter,
    TracedShootAdapter,
};
use pv_daemon::{startup, Config, LifecycleError};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::resolve(std::env::args_os().nth(1).map(PathBuf::from), |key| {
        std::env::var_os(key)
    })?;

    // Write startup marker to log (before tracing setup, so operators can find it)
    write_startup_marker(&config)?;

    let log_guard = setup_logging(&config)?;

    info!(
        "Starting provisionerd with state dir {}",
        config.state_dir.display()
    );

    let shoots = TracedShootAdapter::new(KubectlShootAdapter::new(
        config.gardener.kubectl.clone(),
        config.gardener.kubeconfig.clone(),
        config.gardener.namespace(),
    ));

    let started = if config.installer.enabled {
        let installer = HelmInstallerAdapter::new(
            config.installer.helm.clone(),
            config.installer.chart.clone(),
            config.installer.release.clone(),
            config.installer.namespace.clone(),
            config.kubeconfig_dir(),
        );
        startup(&config, shoots, TracedInstallerAdapter::new(installer)).await
    } else {
        info!("Runtime installer disabled");
        startup(
            &config,
            shoots,
            TracedInstallerAdapter::new(NoOpInstallerAdapter::new()),
        )
        .await
    };

    let daemon = match started {
        Ok(d) => d,
        Err(e) => {
            // Write error synchronously (tracing is non-blocking and may not flush in time)
            write_startup_error(&config, &e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("Daemon ready");
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        _ = sigint.recv() => info!("Received SIGINT, shutting down..."),
    }

    daemon.shutdown().await?;

    info!("Daemon stopped");
    Ok(())
}

/// Startup marker prefix written to log before anything else.
/// Full format: "--- provisionerd: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- provisionerd: starting (pid: ";

/// Write startup marker to log file (appends to existing log)
fn write_startup_marker(config: &Config) -> Result<(), LifecycleError> {
    use std::io::Write;

    std::fs::create_dir_all(&config.state_dir)?;

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())?;
    writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;

    Ok(())
}

/// Write startup error synchronously to log file.
fn write_startup_error(config: &Config, error: &LifecycleError) {
    use std::io::Write;

    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(config.log_path())
    else {
        return;
    };
    let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let file_appender = tracing_appender::rolling::never(&config.state_dir, "provisionerd.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

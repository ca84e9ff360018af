// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, recovery, shutdown.

use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use pv_adapters::{InstallerAdapter, ShootAdapter};
use pv_core::{OperationKind, SystemClock, UuidIdGen};
use pv_engine::{
    default_sequences, OperationExecutor, OperationService, QueueSet, QueueSetHandle,
    RecoveryEnqueuer, RecoveryError, SequenceError,
};
use pv_storage::{OperationStore, StoreError, WalStore};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// Executor over the daemon's WAL store
pub type DaemonExecutor = OperationExecutor<Arc<WalStore>, SystemClock>;

/// One queue per kind, all sharing the daemon's executor
pub type DaemonQueues = QueueSet<DaemonExecutor>;

/// Intake for new operations
pub type DaemonService = OperationService<Arc<WalStore>, DaemonQueues, SystemClock, UuidIdGen>;

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid stage sequences: {0}")]
    Sequence(#[from] SequenceError),

    #[error("Recovery failed: {0}")]
    Recovery(#[from] RecoveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running daemon
pub struct Daemon {
    config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    store: Arc<WalStore>,
    queues: Arc<DaemonQueues>,
    service: DaemonService,
    stop: CancellationToken,
    workers: QueueSetHandle,
    start_time: Instant,
}

impl Daemon {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<WalStore> {
        &self.store
    }

    pub fn queues(&self) -> &Arc<DaemonQueues> {
        &self.queues
    }

    pub fn service(&self) -> &DaemonService {
        &self.service
    }

    /// Stop the queues, wait for running stages, release the lock
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // Timers are cancelled and idle workers exit; running stages finish
        self.stop.cancel();
        self.workers.join().await;

        let in_progress = self.store.in_progress_count().await?;
        if in_progress.total() > 0 {
            info!(
                in_progress = in_progress.total(),
                "operations left in progress; they resume on next start"
            );
        }

        if self.config.lock_path().exists() {
            if let Err(e) = std::fs::remove_file(self.config.lock_path()) {
                warn!("Failed to remove PID file: {}", e);
            }
        }

        info!(
            uptime_secs = self.start_time.elapsed().as_secs(),
            "Daemon shutdown complete"
        );
        Ok(())
    }
}

/// Start the daemon with the given capability adapters
pub async fn startup<Sh, In>(
    config: &Config,
    shoots: Sh,
    installer: In,
) -> Result<Daemon, LifecycleError>
where
    Sh: ShootAdapter,
    In: InstallerAdapter,
{
    // Lock first so a second daemon never touches the WAL
    std::fs::create_dir_all(&config.state_dir)?;
    let mut lock_file = File::create(config.lock_path())?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    writeln!(lock_file, "{}", std::process::id())?;

    match startup_inner(config, lock_file, shoots, installer).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            cleanup_on_failure(config);
            Err(e)
        }
    }
}

async fn startup_inner<Sh, In>(
    config: &Config,
    lock_file: File,
    shoots: Sh,
    installer: In,
) -> Result<Daemon, LifecycleError>
where
    Sh: ShootAdapter,
    In: InstallerAdapter,
{
    let wal_path = config.wal_path();
    if let Some(parent) = wal_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store = Arc::new(WalStore::open(&wal_path)?);

    let in_progress = store.in_progress_count().await?;
    info!(
        provision = in_progress.count(OperationKind::Provision),
        deprovision = in_progress.count(OperationKind::Deprovision),
        upgrade = in_progress.count(OperationKind::Upgrade),
        shoot_upgrade = in_progress.count(OperationKind::ShootUpgrade),
        hibernate = in_progress.count(OperationKind::Hibernate),
        "Loaded operations from {}",
        wal_path.display()
    );

    let registry = Arc::new(default_sequences(
        shoots,
        installer,
        &config.stage_settings(),
    )?);
    let executor = Arc::new(DaemonExecutor::new(
        Arc::clone(&store),
        Arc::clone(&registry),
        SystemClock,
    ));
    let queues = Arc::new(QueueSet::new(executor, |kind| {
        config.queues.workers(kind)
    }));

    let stop = CancellationToken::new();
    let workers = queues.run(stop.clone());

    if config.recovery.enabled {
        let recovery = RecoveryEnqueuer::new(config.recovery.attempts, config.recovery.delay);
        match recovery.run(store.as_ref(), queues.as_ref()).await {
            Ok(count) => info!(count, "Re-enqueued in-progress operations"),
            Err(e) => {
                stop.cancel();
                workers.join().await;
                return Err(e.into());
            }
        }
    } else if in_progress.total() > 0 {
        warn!(
            count = in_progress.total(),
            "Recovery disabled; in-progress operations will not resume"
        );
    }

    let service = OperationService::new(
        Arc::clone(&store),
        registry,
        Arc::clone(&queues),
        SystemClock,
        UuidIdGen,
    );

    info!(state_dir = %config.state_dir.display(), "Daemon started");

    Ok(Daemon {
        config: config.clone(),
        lock_file,
        store,
        queues,
        service,
        stop,
        workers,
        start_time: Instant::now(),
    })
}

/// Clean up resources on startup failure
fn cleanup_on_failure(config: &Config) {
    if config.lock_path().exists() {
        let _ = std::fs::remove_file(config.lock_path());
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;

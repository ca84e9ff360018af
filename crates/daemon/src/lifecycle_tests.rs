// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use pv_adapters::{FakeInstallerAdapter, FakeShootAdapter, ShootCall};
use pv_core::OperationState;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config {
        state_dir: dir.path().join("state"),
        ..Config::default()
    };
    config.recovery.delay = Duration::from_millis(10);
    // Waiting stages park for the rest of the test
    config.stages.poll_interval = Duration::from_secs(3600);
    config
}

fn status_calls(shoots: &FakeShootAdapter) -> usize {
    shoots
        .calls()
        .iter()
        .filter(|call| matches!(call, ShootCall::Status { .. }))
        .count()
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn startup_takes_lock_and_shutdown_releases_it() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let daemon = startup(
        &config,
        FakeShootAdapter::new(),
        FakeInstallerAdapter::new(),
    )
    .await
    .unwrap();

    assert!(config.lock_path().exists());
    assert!(config.wal_path().exists());
    let pid = std::fs::read_to_string(config.lock_path()).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());

    daemon.shutdown().await.unwrap();
    assert!(!config.lock_path().exists());
}

#[tokio::test]
async fn second_daemon_is_refused_while_locked() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);

    let daemon = startup(
        &config,
        FakeShootAdapter::new(),
        FakeInstallerAdapter::new(),
    )
    .await
    .unwrap();

    let second = startup(
        &config,
        FakeShootAdapter::new(),
        FakeInstallerAdapter::new(),
    )
    .await;
    assert!(matches!(second, Err(LifecycleError::LockFailed(_))));

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn started_operation_runs_through_queues() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let shoots = FakeShootAdapter::new();

    let daemon = startup(&config, shoots.clone(), FakeInstallerAdapter::new())
        .await
        .unwrap();

    let op = daemon
        .service()
        .start(OperationKind::Provision, "runtime-1", HashMap::new())
        .await
        .unwrap();

    // create-shoot finishes, wait-for-shoot polls once and parks
    wait_until(|| status_calls(&shoots) == 1).await;
    let stored = daemon.store().get_operation(&op.id).await.unwrap();
    assert_eq!(stored.state, OperationState::InProgress);
    assert_eq!(stored.stage, "wait-for-shoot");

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn restart_resumes_in_progress_operations() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let shoots = FakeShootAdapter::new();

    let daemon = startup(&config, shoots.clone(), FakeInstallerAdapter::new())
        .await
        .unwrap();
    let op = daemon
        .service()
        .start(OperationKind::Provision, "runtime-1", HashMap::new())
        .await
        .unwrap();
    wait_until(|| status_calls(&shoots) == 1).await;
    daemon.shutdown().await.unwrap();

    let daemon = startup(&config, shoots.clone(), FakeInstallerAdapter::new())
        .await
        .unwrap();

    // Recovery picks the operation up at wait-for-shoot, not create-shoot
    wait_until(|| status_calls(&shoots) == 2).await;
    let creates = shoots
        .calls()
        .iter()
        .filter(|call| matches!(call, ShootCall::Create { .. }))
        .count();
    assert_eq!(creates, 1);
    assert!(daemon
        .queues()
        .get(OperationKind::Provision)
        .unwrap()
        .is_in_flight(&op.id));

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn disabled_recovery_leaves_operations_idle() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir);
    let shoots = FakeShootAdapter::new();

    let daemon = startup(&config, shoots.clone(), FakeInstallerAdapter::new())
        .await
        .unwrap();
    let op = daemon
        .service()
        .start(OperationKind::Provision, "runtime-1", HashMap::new())
        .await
        .unwrap();
    wait_until(|| status_calls(&shoots) == 1).await;
    daemon.shutdown().await.unwrap();

    config.recovery.enabled = false;
    let daemon = startup(&config, shoots.clone(), FakeInstallerAdapter::new())
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(status_calls(&shoots), 1);
    assert!(!daemon
        .queues()
        .get(OperationKind::Provision)
        .unwrap()
        .is_in_flight(&op.id));

    daemon.shutdown().await.unwrap();
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn spec(name: &str) -> ShootSpec {
    ShootSpec {
        name: name.to_string(),
        runtime_id: "runtime-1".to_string(),
        kubernetes_version: "1.29.4".to_string(),
        provider: "gcp".to_string(),
        region: "europe-west3".to_string(),
        machine_type: "n2-standard-4".to_string(),
        min_workers: 1,
        max_workers: 3,
    }
}

#[tokio::test]
async fn fake_shoot_create_then_reconcile() {
    let adapter = FakeShootAdapter::new();

    adapter.create_shoot(&spec("c-1")).await.unwrap();
    assert_eq!(
        adapter.shoot_status("c-1").await.unwrap().state,
        ShootState::Processing
    );

    adapter.complete("c-1");
    assert_eq!(
        adapter.shoot_status("c-1").await.unwrap().state,
        ShootState::Succeeded
    );
}

#[tokio::test]
async fn fake_shoot_duplicate_create() {
    let adapter = FakeShootAdapter::new();

    adapter.create_shoot(&spec("c-1")).await.unwrap();
    let result = adapter.create_shoot(&spec("c-1")).await;

    assert!(matches!(result, Err(ShootError::AlreadyExists(_))));
}

#[tokio::test]
async fn fake_shoot_delete_completes_to_not_found() {
    let adapter = FakeShootAdapter::new();
    adapter.create_shoot(&spec("c-1")).await.unwrap();
    adapter.complete("c-1");

    adapter.delete_shoot("c-1").await.unwrap();
    adapter.shoot_status("c-1").await.unwrap();
    adapter.complete("c-1");

    assert!(matches!(
        adapter.shoot_status("c-1").await,
        Err(ShootError::NotFound(_))
    ));
}

#[tokio::test]
async fn fake_shoot_hibernate_and_upgrade() {
    let adapter = FakeShootAdapter::new();
    adapter.create_shoot(&spec("c-1")).await.unwrap();

    adapter.hibernate_shoot("c-1").await.unwrap();
    adapter.complete("c-1");
    assert!(adapter.shoot_status("c-1").await.unwrap().hibernated);

    adapter.upgrade_shoot("c-1", "1.30.1").await.unwrap();
    adapter.complete("c-1");
    let status = adapter.shoot_status("c-1").await.unwrap();
    assert_eq!(status.kubernetes_version.as_deref(), Some("1.30.1"));
}

#[tokio::test]
async fn fake_shoot_injected_errors_are_consumed_in_order() {
    let adapter = FakeShootAdapter::new();
    adapter.fail_next(ShootError::CommandFailed("timeout".to_string()));
    adapter.fail_next(ShootError::Rejected("quota exceeded".to_string()));

    let first = adapter.create_shoot(&spec("c-1")).await;
    let second = adapter.create_shoot(&spec("c-1")).await;
    let third = adapter.create_shoot(&spec("c-1")).await;

    assert!(matches!(first, Err(ShootError::CommandFailed(_))));
    assert!(matches!(second, Err(ShootError::Rejected(_))));
    assert!(third.is_ok());
    assert_eq!(adapter.calls().len(), 3);
}

#[tokio::test]
async fn fake_shoot_missing_shoot_is_not_found() {
    let adapter = FakeShootAdapter::new();

    assert!(matches!(
        adapter.hibernate_shoot("c-9").await,
        Err(ShootError::NotFound(_))
    ));
    assert!(matches!(
        adapter.delete_shoot("c-9").await,
        Err(ShootError::NotFound(_))
    ));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn fake_installer_install_lifecycle() {
    let adapter = FakeInstallerAdapter::new();

    assert_eq!(
        adapter.installation_status("rt-1").await.unwrap(),
        InstallationState::NotStarted
    );

    adapter.install("rt-1", "2.20.0").await.unwrap();
    assert_eq!(adapter.state("rt-1"), InstallationState::InProgress);

    adapter.complete("rt-1");
    assert_eq!(
        adapter.installation_status("rt-1").await.unwrap(),
        InstallationState::Installed {
            version: Some("2.20.0".to_string())
        }
    );
}

#[tokio::test]
async fn fake_installer_upgrade_requires_installation() {
    let adapter = FakeInstallerAdapter::new();

    let result = adapter.upgrade("rt-1", "2.21.0").await;
    assert!(matches!(result, Err(InstallError::NotFound(_))));

    adapter.install("rt-1", "2.20.0").await.unwrap();
    adapter.complete("rt-1");
    adapter.upgrade("rt-1", "2.21.0").await.unwrap();
    adapter.complete("rt-1");

    assert_eq!(
        adapter.state("rt-1"),
        InstallationState::Installed {
            version: Some("2.21.0".to_string())
        }
    );
}

#[tokio::test]
async fn fake_installer_uninstall_missing_is_not_found() {
    let adapter = FakeInstallerAdapter::new();

    let result = adapter.uninstall("rt-1").await;
    assert!(matches!(result, Err(InstallError::NotFound(_))));
    assert_eq!(
        adapter.calls(),
        vec![InstallCall::Uninstall {
            runtime_id: "rt-1".to_string()
        }]
    );
}

#[tokio::test]
async fn fake_installer_injected_error() {
    let adapter = FakeInstallerAdapter::new();
    adapter.fail_next(InstallError::Rejected("unknown version".to_string()));

    let result = adapter.install("rt-1", "9.9.9").await;

    assert!(matches!(&result, Err(e) if e.is_permanent()));
    assert_eq!(adapter.state("rt-1"), InstallationState::NotStarted);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;
use yare::parameterized;

fn release(status: &str) -> serde_json::Value {
    json!({
        "name": "kyma",
        "info": { "status": status, "description": "Install complete" },
        "chart": { "metadata": { "version": "2.20.0" } },
    })
}

#[test]
fn deployed_release_is_installed_with_chart_version() {
    let state = parse_release_status(&release("deployed")).unwrap();
    assert_eq!(
        state,
        InstallationState::Installed {
            version: Some("2.20.0".to_string())
        }
    );
}

#[parameterized(
    pending_install = { "pending-install" },
    pending_upgrade = { "pending-upgrade" },
    pending_rollback = { "pending-rollback" },
    uninstalling = { "uninstalling" },
)]
fn pending_statuses_are_in_progress(status: &str) {
    assert_eq!(
        parse_release_status(&release(status)).unwrap(),
        InstallationState::InProgress
    );
}

#[test]
fn failed_release_keeps_description() {
    let mut value = release("failed");
    value["info"]["description"] = json!("timed out waiting for the condition");

    assert_eq!(
        parse_release_status(&value).unwrap(),
        InstallationState::Failed("timed out waiting for the condition".to_string())
    );
}

#[test]
fn missing_status_is_invalid_response() {
    let result = parse_release_status(&json!({ "name": "kyma" }));
    assert!(matches!(result, Err(InstallError::InvalidResponse(_))));
}

#[test]
fn stderr_is_classified() {
    assert!(matches!(
        classify_failure("Error: release: not found"),
        InstallError::NotFound(_)
    ));
    assert!(matches!(
        classify_failure("Error: chart \"kyma\" version \"9.9.9\" not found"),
        InstallError::Rejected(_)
    ));
    assert!(matches!(
        classify_failure("Error: Kubernetes cluster unreachable"),
        InstallError::CommandFailed(_)
    ));
}

#[tokio::test]
async fn kubeconfig_is_per_runtime() {
    let adapter = HelmInstallerAdapter::new(
        PathBuf::from("/nonexistent/helm"),
        "kyma/kyma".to_string(),
        "kyma".to_string(),
        "kyma-system".to_string(),
        PathBuf::from("/var/lib/provisioner/kubeconfigs"),
    );

    assert_eq!(
        adapter.kubeconfig("runtime-1"),
        PathBuf::from("/var/lib/provisioner/kubeconfigs/runtime-1.yaml")
    );
    assert!(matches!(
        adapter.install("runtime-1", "2.20.0").await,
        Err(InstallError::CommandFailed(_))
    ));
}

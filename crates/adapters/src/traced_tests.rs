// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::installer::{FakeInstallerAdapter, InstallCall};
use crate::shoot::{FakeShootAdapter, ShootCall};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

fn spec(name: &str) -> ShootSpec {
    ShootSpec {
        name: name.to_string(),
        runtime_id: "runtime-1".to_string(),
        kubernetes_version: "1.29.4".to_string(),
        provider: "aws".to_string(),
        region: "eu-central-1".to_string(),
        machine_type: "m5.xlarge".to_string(),
        min_workers: 1,
        max_workers: 3,
    }
}

// =============================================================================
// Precondition validation tests
// =============================================================================

#[tokio::test]
async fn traced_shoot_rejects_inverted_worker_bounds() {
    let fake = FakeShootAdapter::new();
    let traced = TracedShootAdapter::new(fake.clone());

    let mut bad = spec("c-1");
    bad.min_workers = 5;
    let result = traced.create_shoot(&bad).await;

    let err = result.unwrap_err();
    assert!(err.is_permanent(), "Expected a rejection, got: {}", err);
    assert!(fake.calls().is_empty(), "Inner adapter must not be called");
}

#[tokio::test]
async fn traced_shoot_rejects_empty_upgrade_version() {
    let fake = FakeShootAdapter::new();
    let traced = TracedShootAdapter::new(fake.clone());

    let result = traced.upgrade_shoot("c-1", "").await;

    assert!(matches!(result, Err(ShootError::Rejected(_))));
    assert!(fake.calls().is_empty());
}

// =============================================================================
// Tracing output verification tests
// =============================================================================

#[test]
fn traced_shoot_create_logs_entry_and_completion() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedShootAdapter::new(FakeShootAdapter::new());
        traced.create_shoot(&spec("c-1a2b")).await
    });

    assert!(result.is_ok(), "create should succeed: {:?}", result);
    assert!(
        logs.contains("shoot.create"),
        "Should log span name. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("c-1a2b"),
        "Should log shoot name. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("creating shoot"),
        "Should log entry message. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("shoot created"),
        "Should log completion. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("elapsed_ms"),
        "Should log timing. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_shoot_delete_logs_missing_shoot_as_info() {
    let (logs, result) = with_tracing(|| async {
        let traced = TracedShootAdapter::new(FakeShootAdapter::new());
        traced.delete_shoot("c-gone").await
    });

    assert!(matches!(result, Err(ShootError::NotFound(_))));
    assert!(
        logs.contains("shoot already gone"),
        "Should log missing shoot. Logs:\n{}",
        logs
    );
    assert!(
        !logs.contains("WARN"),
        "Missing shoot is not a warning. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_installer_install_logs_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeInstallerAdapter::new();
        fake.fail_next(InstallError::CommandFailed("cluster unreachable".to_string()));
        TracedInstallerAdapter::new(fake)
            .install("runtime-1", "2.20.0")
            .await
    });

    assert!(result.is_err());
    assert!(
        logs.contains("installer.install"),
        "Should log span name. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("cluster unreachable"),
        "Should log error. Logs:\n{}",
        logs
    );
}

// =============================================================================
// Delegation tests - verify traced wrapper delegates to inner adapter
// =============================================================================

#[tokio::test]
async fn traced_shoot_delegates_upgrade_to_inner() {
    let fake = FakeShootAdapter::new();
    let traced = TracedShootAdapter::new(fake.clone());

    traced.create_shoot(&spec("c-1")).await.unwrap();
    traced.upgrade_shoot("c-1", "1.30.1").await.unwrap();

    assert_eq!(
        fake.calls(),
        vec![
            ShootCall::Create {
                name: "c-1".to_string()
            },
            ShootCall::Upgrade {
                name: "c-1".to_string(),
                version: "1.30.1".to_string()
            },
        ]
    );
}

#[tokio::test]
async fn traced_installer_delegates_status_to_inner() {
    let fake = FakeInstallerAdapter::new();
    let traced = TracedInstallerAdapter::new(fake.clone());

    traced.install("runtime-1", "2.20.0").await.unwrap();
    fake.complete("runtime-1");
    let state = traced.installation_status("runtime-1").await.unwrap();

    assert_eq!(
        state,
        InstallationState::Installed {
            version: Some("2.20.0".to_string())
        }
    );
    assert_eq!(
        fake.calls()[1],
        InstallCall::Status {
            runtime_id: "runtime-1".to_string()
        }
    );
}

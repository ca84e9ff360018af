// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shoot adapter that drives the provider's API through `kubectl`

use super::{ShootAdapter, ShootError, ShootSpec, ShootState, ShootStatus};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// `kubectl`-based shoot adapter scoped to one project namespace
#[derive(Clone, Debug)]
pub struct KubectlShootAdapter {
    kubectl: PathBuf,
    kubeconfig: Option<PathBuf>,
    namespace: String,
}

impl KubectlShootAdapter {
    pub fn new(kubectl: PathBuf, kubeconfig: Option<PathBuf>, namespace: String) -> Self {
        Self {
            kubectl,
            kubeconfig,
            namespace,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.kubectl);
        if let Some(kubeconfig) = &self.kubeconfig {
            cmd.arg("--kubeconfig").arg(kubeconfig);
        }
        cmd.arg("--namespace").arg(&self.namespace);
        cmd.kill_on_drop(true);
        cmd
    }

    async fn run(&self, args: &[&str], stdin: Option<String>) -> Result<String, ShootError> {
        let mut cmd = self.command();
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .map_err(|e| ShootError::CommandFailed(e.to_string()))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input.as_bytes())
                .await
                .map_err(|e| ShootError::CommandFailed(e.to_string()))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ShootError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn patch(&self, name: &str, patch: serde_json::Value) -> Result<(), ShootError> {
        let patch = patch.to_string();
        self.run(
            &["patch", "shoot", name, "--type", "merge", "-p", &patch],
            None,
        )
        .await?;
        Ok(())
    }
}

/// Map kubectl's stderr onto the provider error taxonomy
fn classify_failure(stderr: &str) -> ShootError {
    let message = stderr.trim().to_string();
    if message.contains("(NotFound)") {
        ShootError::NotFound(message)
    } else if message.contains("(AlreadyExists)") {
        ShootError::AlreadyExists(message)
    } else if message.contains("(Forbidden)")
        || message.contains("(Invalid)")
        || message.contains("quota")
    {
        ShootError::Rejected(message)
    } else {
        ShootError::CommandFailed(message)
    }
}

/// Extract status from a Shoot resource rendered as JSON
pub fn parse_shoot_status(shoot: &serde_json::Value) -> Result<ShootStatus, ShootError> {
    if shoot.get("kind").and_then(|k| k.as_str()) != Some("Shoot") {
        return Err(ShootError::InvalidResponse(
            "expected a Shoot resource".to_string(),
        ));
    }

    let status = &shoot["status"];
    let last_operation = &status["lastOperation"];
    let description = last_operation["description"]
        .as_str()
        .unwrap_or_default()
        .to_string();

    let state = match last_operation["state"].as_str() {
        None | Some("Pending") => ShootState::Pending,
        Some("Processing") => ShootState::Processing,
        Some("Succeeded") => ShootState::Succeeded,
        Some("Error") => ShootState::Error(description),
        Some("Failed") | Some("Aborted") => ShootState::Failed(description),
        Some(other) => {
            return Err(ShootError::InvalidResponse(format!(
                "unknown last operation state: {}",
                other
            )))
        }
    };

    Ok(ShootStatus {
        state,
        hibernated: status["hibernated"].as_bool().unwrap_or(false),
        kubernetes_version: shoot["spec"]["kubernetes"]["version"]
            .as_str()
            .map(str::to_string),
    })
}

#[async_trait]
impl ShootAdapter for KubectlShootAdapter {
    async fn create_shoot(&self, spec: &ShootSpec) -> Result<(), ShootError> {
        let manifest = spec.manifest(&self.namespace).to_string();
        self.run(&["create", "-f", "-"], Some(manifest)).await?;
        Ok(())
    }

    async fn delete_shoot(&self, name: &str) -> Result<(), ShootError> {
        // The provider refuses deletion without the confirmation annotation
        self.run(
            &[
                "annotate",
                "shoot",
                name,
                "confirmation.gardener.cloud/deletion=true",
                "--overwrite",
            ],
            None,
        )
        .await?;
        self.run(&["delete", "shoot", name, "--wait=false"], None)
            .await?;
        Ok(())
    }

    async fn hibernate_shoot(&self, name: &str) -> Result<(), ShootError> {
        self.patch(
            name,
            serde_json::json!({ "spec": { "hibernation": { "enabled": true } } }),
        )
        .await
    }

    async fn upgrade_shoot(&self, name: &str, kubernetes_version: &str) -> Result<(), ShootError> {
        self.patch(
            name,
            serde_json::json!({ "spec": { "kubernetes": { "version": kubernetes_version } } }),
        )
        .await
    }

    async fn shoot_status(&self, name: &str) -> Result<ShootStatus, ShootError> {
        let stdout = self.run(&["get", "shoot", name, "-o", "json"], None).await?;
        let shoot: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|e| ShootError::InvalidResponse(e.to_string()))?;
        parse_shoot_status(&shoot)
    }
}

#[cfg(test)]
#[path = "kubectl_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installer adapter that deploys the runtime chart with `helm`

use super::{InstallError, InstallationState, InstallerAdapter};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// `helm`-based installer
///
/// Each runtime's kubeconfig is read from `<kubeconfig_dir>/<runtime_id>.yaml`.
#[derive(Clone, Debug)]
pub struct HelmInstallerAdapter {
    helm: PathBuf,
    chart: String,
    release: String,
    namespace: String,
    kubeconfig_dir: PathBuf,
}

impl HelmInstallerAdapter {
    pub fn new(
        helm: PathBuf,
        chart: String,
        release: String,
        namespace: String,
        kubeconfig_dir: PathBuf,
    ) -> Self {
        Self {
            helm,
            chart,
            release,
            namespace,
            kubeconfig_dir,
        }
    }

    fn kubeconfig(&self, runtime_id: &str) -> PathBuf {
        self.kubeconfig_dir.join(format!("{}.yaml", runtime_id))
    }

    async fn run(&self, runtime_id: &str, args: &[&str]) -> Result<String, InstallError> {
        let output = Command::new(&self.helm)
            .args(args)
            .arg("--namespace")
            .arg(&self.namespace)
            .arg("--kubeconfig")
            .arg(self.kubeconfig(runtime_id))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| InstallError::CommandFailed(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Map helm's stderr onto the installer error taxonomy
fn classify_failure(stderr: &str) -> InstallError {
    let message = stderr.trim().to_string();
    if message.contains("release: not found") {
        InstallError::NotFound(message)
    } else if (message.contains("chart") && message.contains("not found"))
        || message.contains("invalid")
    {
        InstallError::Rejected(message)
    } else {
        InstallError::CommandFailed(message)
    }
}

/// Extract installation state from `helm status -o json` output
pub fn parse_release_status(release: &serde_json::Value) -> Result<InstallationState, InstallError> {
    let info = &release["info"];
    let status = info["status"]
        .as_str()
        .ok_or_else(|| InstallError::InvalidResponse("missing info.status".to_string()))?;

    let state = match status {
        "deployed" => InstallationState::Installed {
            version: release["chart"]["metadata"]["version"]
                .as_str()
                .map(str::to_string),
        },
        "pending-install" | "pending-upgrade" | "pending-rollback" | "uninstalling" => {
            InstallationState::InProgress
        }
        "failed" => InstallationState::Failed(
            info["description"].as_str().unwrap_or_default().to_string(),
        ),
        "uninstalled" => InstallationState::NotStarted,
        other => {
            return Err(InstallError::InvalidResponse(format!(
                "unknown release status: {}",
                other
            )))
        }
    };
    Ok(state)
}

#[async_trait]
impl InstallerAdapter for HelmInstallerAdapter {
    async fn install(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        self.run(
            runtime_id,
            &[
                "upgrade",
                "--install",
                &self.release,
                &self.chart,
                "--version",
                version,
                "--create-namespace",
            ],
        )
        .await?;
        Ok(())
    }

    async fn upgrade(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        self.run(
            runtime_id,
            &["upgrade", &self.release, &self.chart, "--version", version],
        )
        .await?;
        Ok(())
    }

    async fn uninstall(&self, runtime_id: &str) -> Result<(), InstallError> {
        self.run(runtime_id, &["uninstall", &self.release]).await?;
        Ok(())
    }

    async fn installation_status(
        &self,
        runtime_id: &str,
    ) -> Result<InstallationState, InstallError> {
        let stdout = match self
            .run(runtime_id, &["status", &self.release, "-o", "json"])
            .await
        {
            Ok(stdout) => stdout,
            Err(InstallError::NotFound(_)) => return Ok(InstallationState::NotStarted),
            Err(e) => return Err(e),
        };
        let release: serde_json::Value = serde_json::from_str(&stdout)
            .map_err(|e| InstallError::InvalidResponse(e.to_string()))?;
        parse_release_status(&release)
    }
}

#[cfg(test)]
#[path = "helm_tests.rs"]
mod tests;

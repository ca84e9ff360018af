// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime upgrade stages

use super::{inputs, install_failure, required_input};
use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_adapters::{InstallationState, InstallerAdapter};
use pv_core::Operation;
use std::time::Duration;

/// Start upgrading the runtime components
pub struct UpgradeRuntime<I> {
    installer: I,
}

impl<I> UpgradeRuntime<I> {
    pub fn new(installer: I) -> Self {
        Self { installer }
    }
}

#[async_trait]
impl<I: InstallerAdapter> Stage for UpgradeRuntime<I> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let version = match required_input(operation, inputs::RUNTIME_VERSION) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };

        match self.installer.upgrade(&operation.runtime_id, version).await {
            Ok(()) => StageOutcome::Finished,
            Err(e) => install_failure("upgrade runtime", e),
        }
    }
}

/// Wait for the runtime to report the target version
pub struct WaitForRuntimeUpgrade<I> {
    installer: I,
    poll: Duration,
}

impl<I> WaitForRuntimeUpgrade<I> {
    pub fn new(installer: I, poll: Duration) -> Self {
        Self { installer, poll }
    }
}

#[async_trait]
impl<I: InstallerAdapter> Stage for WaitForRuntimeUpgrade<I> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let target = match required_input(operation, inputs::RUNTIME_VERSION) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };

        match self
            .installer
            .installation_status(&operation.runtime_id)
            .await
        {
            // Installers that do not report versions count as done once installed
            Ok(InstallationState::Installed { version }) => match version {
                Some(version) if version != target => StageOutcome::Continue(self.poll),
                _ => StageOutcome::Finished,
            },
            Ok(InstallationState::InProgress) => StageOutcome::Continue(self.poll),
            Ok(InstallationState::NotStarted) => StageOutcome::fatal("runtime is not installed"),
            Ok(InstallationState::Failed(description)) => {
                StageOutcome::fatal(format!("upgrade failed: {}", description))
            }
            Err(e) => install_failure("read installation status", e),
        }
    }
}

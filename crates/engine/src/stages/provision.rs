// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning stages

use super::{inputs, install_failure, required_input, shoot_failure, shoot_name, ShootDefaults};
use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_adapters::{
    InstallationState, InstallerAdapter, ShootAdapter, ShootError, ShootSpec, ShootState,
};
use pv_core::Operation;
use std::time::Duration;

/// Submit the shoot for a new cluster
pub struct CreateShoot<S> {
    shoots: S,
    defaults: ShootDefaults,
}

impl<S> CreateShoot<S> {
    pub fn new(shoots: S, defaults: ShootDefaults) -> Self {
        Self { shoots, defaults }
    }

    fn spec(&self, operation: &Operation) -> Result<ShootSpec, StageOutcome> {
        let text = |key: &str, default: &str| operation.input(key).unwrap_or(default).to_string();
        let count = |key: &str, default: u32| match operation.input(key) {
            Some(value) => value
                .parse::<u32>()
                .map_err(|_| StageOutcome::fatal(format!("invalid {}: {}", key, value))),
            None => Ok(default),
        };

        Ok(ShootSpec {
            name: shoot_name(operation),
            runtime_id: operation.runtime_id.clone(),
            kubernetes_version: text(
                inputs::KUBERNETES_VERSION,
                &self.defaults.kubernetes_version,
            ),
            provider: text(inputs::PROVIDER, &self.defaults.provider),
            region: text(inputs::REGION, &self.defaults.region),
            machine_type: text(inputs::MACHINE_TYPE, &self.defaults.machine_type),
            min_workers: count(inputs::MIN_WORKERS, self.defaults.min_workers)?,
            max_workers: count(inputs::MAX_WORKERS, self.defaults.max_workers)?,
        })
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for CreateShoot<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let spec = match self.spec(operation) {
            Ok(spec) => spec,
            Err(outcome) => return outcome,
        };

        match self.shoots.create_shoot(&spec).await {
            // A previous run submitted it before the crash
            Ok(()) | Err(ShootError::AlreadyExists(_)) => StageOutcome::Finished,
            Err(e) => shoot_failure("create shoot", e),
        }
    }
}

/// Wait for the provider to finish reconciling the new shoot
pub struct WaitForShoot<S> {
    shoots: S,
    poll: Duration,
}

impl<S> WaitForShoot<S> {
    pub fn new(shoots: S, poll: Duration) -> Self {
        Self { shoots, poll }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for WaitForShoot<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let name = shoot_name(operation);
        match self.shoots.shoot_status(&name).await {
            Ok(status) => match status.state {
                ShootState::Succeeded => StageOutcome::Finished,
                ShootState::Failed(description) => {
                    StageOutcome::fatal(format!("shoot {} failed: {}", name, description))
                }
                ShootState::Pending | ShootState::Processing | ShootState::Error(_) => {
                    StageOutcome::Continue(self.poll)
                }
            },
            Err(e) => shoot_failure("read shoot status", e),
        }
    }
}

/// Start installing the runtime components on the cluster
pub struct InstallRuntime<I> {
    installer: I,
}

impl<I> InstallRuntime<I> {
    pub fn new(installer: I) -> Self {
        Self { installer }
    }
}

#[async_trait]
impl<I: InstallerAdapter> Stage for InstallRuntime<I> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let version = match required_input(operation, inputs::RUNTIME_VERSION) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };

        match self.installer.install(&operation.runtime_id, version).await {
            Ok(()) => StageOutcome::Finished,
            Err(e) => install_failure("install runtime", e),
        }
    }
}

/// Wait for the runtime components to report installed
pub struct WaitForInstallation<I> {
    installer: I,
    poll: Duration,
}

impl<I> WaitForInstallation<I> {
    pub fn new(installer: I, poll: Duration) -> Self {
        Self { installer, poll }
    }
}

#[async_trait]
impl<I: InstallerAdapter> Stage for WaitForInstallation<I> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        match self
            .installer
            .installation_status(&operation.runtime_id)
            .await
        {
            Ok(InstallationState::Installed { .. }) => StageOutcome::Finished,
            Ok(InstallationState::Failed(description)) => {
                StageOutcome::fatal(format!("installation failed: {}", description))
            }
            Ok(InstallationState::InProgress | InstallationState::NotStarted) => {
                StageOutcome::Continue(self.poll)
            }
            Err(e) => install_failure("read installation status", e),
        }
    }
}

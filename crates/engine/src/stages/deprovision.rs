// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deprovisioning stages

use super::{install_failure, shoot_failure, shoot_name};
use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_adapters::{InstallError, InstallerAdapter, ShootAdapter, ShootError, ShootState};
use pv_core::Operation;
use std::time::Duration;

/// Remove the runtime components before the cluster goes away
pub struct CleanupRuntime<I> {
    installer: I,
}

impl<I> CleanupRuntime<I> {
    pub fn new(installer: I) -> Self {
        Self { installer }
    }
}

#[async_trait]
impl<I: InstallerAdapter> Stage for CleanupRuntime<I> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        match self.installer.uninstall(&operation.runtime_id).await {
            Ok(()) | Err(InstallError::NotFound(_)) => StageOutcome::Finished,
            Err(e) => install_failure("uninstall runtime", e),
        }
    }
}

/// Request deletion of the shoot
pub struct DeleteShoot<S> {
    shoots: S,
}

impl<S> DeleteShoot<S> {
    pub fn new(shoots: S) -> Self {
        Self { shoots }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for DeleteShoot<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        match self.shoots.delete_shoot(&shoot_name(operation)).await {
            Ok(()) | Err(ShootError::NotFound(_)) => StageOutcome::Finished,
            Err(e) => shoot_failure("delete shoot", e),
        }
    }
}

/// Wait until the provider no longer knows the shoot
pub struct WaitForShootDeletion<S> {
    shoots: S,
    poll: Duration,
}

impl<S> WaitForShootDeletion<S> {
    pub fn new(shoots: S, poll: Duration) -> Self {
        Self { shoots, poll }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for WaitForShootDeletion<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let name = shoot_name(operation);
        match self.shoots.shoot_status(&name).await {
            Err(ShootError::NotFound(_)) => StageOutcome::Finished,
            Ok(status) => match status.state {
                ShootState::Failed(description) => StageOutcome::fatal(format!(
                    "deletion of shoot {} failed: {}",
                    name, description
                )),
                _ => StageOutcome::Continue(self.poll),
            },
            Err(e) => shoot_failure("read shoot status", e),
        }
    }
}

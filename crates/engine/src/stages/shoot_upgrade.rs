// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shoot Kubernetes version upgrade stages

use super::{inputs, required_input, shoot_failure, shoot_name};
use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_adapters::{ShootAdapter, ShootState};
use pv_core::Operation;
use std::time::Duration;

/// Request the Kubernetes version upgrade
pub struct UpgradeShoot<S> {
    shoots: S,
}

impl<S> UpgradeShoot<S> {
    pub fn new(shoots: S) -> Self {
        Self { shoots }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for UpgradeShoot<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let version = match required_input(operation, inputs::KUBERNETES_VERSION) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };

        match self
            .shoots
            .upgrade_shoot(&shoot_name(operation), version)
            .await
        {
            Ok(()) => StageOutcome::Finished,
            Err(e) => shoot_failure("upgrade shoot", e),
        }
    }
}

/// Wait for the shoot to reconcile at the target version
pub struct WaitForShootUpgrade<S> {
    shoots: S,
    poll: Duration,
}

impl<S> WaitForShootUpgrade<S> {
    pub fn new(shoots: S, poll: Duration) -> Self {
        Self { shoots, poll }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for WaitForShootUpgrade<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let target = match required_input(operation, inputs::KUBERNETES_VERSION) {
            Ok(version) => version,
            Err(outcome) => return outcome,
        };
        let name = shoot_name(operation);

        match self.shoots.shoot_status(&name).await {
            Ok(status) => match status.state {
                ShootState::Succeeded if status.kubernetes_version.as_deref() == Some(target) => {
                    StageOutcome::Finished
                }
                ShootState::Failed(description) => StageOutcome::fatal(format!(
                    "upgrade of shoot {} failed: {}",
                    name, description
                )),
                _ => StageOutcome::Continue(self.poll),
            },
            Err(e) => shoot_failure("read shoot status", e),
        }
    }
}

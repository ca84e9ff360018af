// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hibernation stages

use super::{shoot_failure, shoot_name};
use crate::stage::{Stage, StageOutcome};
use async_trait::async_trait;
use pv_adapters::{ShootAdapter, ShootState};
use pv_core::Operation;
use std::time::Duration;

/// Request hibernation of the shoot
pub struct HibernateShoot<S> {
    shoots: S,
}

impl<S> HibernateShoot<S> {
    pub fn new(shoots: S) -> Self {
        Self { shoots }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for HibernateShoot<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        match self.shoots.hibernate_shoot(&shoot_name(operation)).await {
            Ok(()) => StageOutcome::Finished,
            Err(e) => shoot_failure("hibernate shoot", e),
        }
    }
}

/// Wait for the shoot to report hibernated
pub struct WaitForHibernation<S> {
    shoots: S,
    poll: Duration,
}

impl<S> WaitForHibernation<S> {
    pub fn new(shoots: S, poll: Duration) -> Self {
        Self { shoots, poll }
    }
}

#[async_trait]
impl<S: ShootAdapter> Stage for WaitForHibernation<S> {
    async fn run(&self, operation: &Operation) -> StageOutcome {
        let name = shoot_name(operation);
        match self.shoots.shoot_status(&name).await {
            Ok(status) => match status.state {
                ShootState::Succeeded if status.hibernated => StageOutcome::Finished,
                ShootState::Failed(description) => StageOutcome::fatal(format!(
                    "hibernation of shoot {} failed: {}",
                    name, description
                )),
                _ => StageOutcome::Continue(self.poll),
            },
            Err(e) => shoot_failure("read shoot status", e),
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cluster lifecycle operations
//!
//! An [`Operation`] is one tracked, multi-stage lifecycle change applied to a
//! single managed cluster. Its durable fields are the only state the engine
//! needs to resume work after a restart: the current stage name, when that
//! stage was entered, and the consecutive failure count for that stage.

use crate::clock::{elapsed_between, Clock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// The lifecycle change an operation performs. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Provision,
    Deprovision,
    /// Upgrade of the runtime installed on the cluster
    Upgrade,
    /// Kubernetes version upgrade of the shoot itself
    ShootUpgrade,
    Hibernate,
}

impl OperationKind {
    pub const ALL: [OperationKind; 5] = [
        OperationKind::Provision,
        OperationKind::Deprovision,
        OperationKind::Upgrade,
        OperationKind::ShootUpgrade,
        OperationKind::Hibernate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Provision => "provision",
            OperationKind::Deprovision => "deprovision",
            OperationKind::Upgrade => "upgrade",
            OperationKind::ShootUpgrade => "shoot_upgrade",
            OperationKind::Hibernate => "hibernate",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown operation kind: {0}")]
pub struct ParseKindError(pub String);

impl FromStr for OperationKind {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provision" => Ok(OperationKind::Provision),
            "deprovision" => Ok(OperationKind::Deprovision),
            "upgrade" => Ok(OperationKind::Upgrade),
            "shoot_upgrade" | "shoot-upgrade" => Ok(OperationKind::ShootUpgrade),
            "hibernate" => Ok(OperationKind::Hibernate),
            other => Err(ParseKindError(other.to_string())),
        }
    }
}

/// Operation state; `Succeeded` and `Failed` are terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationState {
    InProgress,
    Succeeded,
    Failed,
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Succeeded | OperationState::Failed)
    }
}

impl fmt::Display for OperationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationState::InProgress => "in_progress",
            OperationState::Succeeded => "succeeded",
            OperationState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A persisted lifecycle operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    /// The cluster (runtime) this operation acts on
    pub runtime_id: String,
    pub kind: OperationKind,
    pub state: OperationState,
    /// Name of the current stage within the kind's stage sequence
    pub stage: String,
    pub started_at: DateTime<Utc>,
    /// When the current stage was entered; dwell time is measured from here
    pub stage_entered_at: DateTime<Utc>,
    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
    /// Last human-readable status or error
    #[serde(default)]
    pub message: String,
    /// Consecutive `Retry` outcomes in the current stage
    #[serde(default)]
    pub failures: u32,
    /// Request parameters (versions, region, ...) read by stages
    #[serde(default)]
    pub inputs: HashMap<String, String>,
}

impl Operation {
    /// Create a new in-progress operation positioned at `first_stage`
    pub fn new(
        id: impl Into<String>,
        runtime_id: impl Into<String>,
        kind: OperationKind,
        first_stage: impl Into<String>,
        inputs: HashMap<String, String>,
        clock: &impl Clock,
    ) -> Self {
        let now = clock.now();
        Self {
            id: id.into(),
            runtime_id: runtime_id.into(),
            kind,
            state: OperationState::InProgress,
            stage: first_stage.into(),
            started_at: now,
            stage_entered_at: now,
            finished_at: None,
            message: "operation started".to_string(),
            failures: 0,
            inputs,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Time spent in the current stage
    pub fn dwell(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.stage_entered_at, now)
    }

    /// Time since the operation started
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        elapsed_between(self.started_at, now)
    }

    pub fn input(&self, key: &str) -> Option<&str> {
        self.inputs.get(key).map(String::as_str)
    }

    /// Move to `stage`, restarting the dwell clock and failure count
    pub fn enter_stage(&mut self, stage: impl Into<String>, now: DateTime<Utc>) {
        self.stage = stage.into();
        self.stage_entered_at = now;
        self.failures = 0;
    }

    pub fn succeed(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.state = OperationState::Succeeded;
        self.message = message.into();
        self.finished_at = Some(now);
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.state = OperationState::Failed;
        self.message = message.into();
        self.finished_at = Some(now);
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;

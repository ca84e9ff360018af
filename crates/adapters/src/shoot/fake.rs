// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake shoot adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ShootAdapter, ShootError, ShootSpec, ShootState, ShootStatus};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Recorded shoot call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShootCall {
    Create { name: String },
    Delete { name: String },
    Hibernate { name: String },
    Upgrade { name: String, version: String },
    Status { name: String },
}

/// Fake shoot
#[derive(Debug, Clone)]
pub struct FakeShoot {
    pub spec: ShootSpec,
    pub status: ShootStatus,
}

#[derive(Default)]
struct FakeState {
    shoots: HashMap<String, FakeShoot>,
    calls: Vec<ShootCall>,
    errors: VecDeque<ShootError>,
}

/// Fake shoot adapter for testing
///
/// Requests change the recorded status to `Processing`; tests drive the
/// provider's reconcile with [`FakeShootAdapter::set_state`].
#[derive(Clone, Default)]
pub struct FakeShootAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeShootAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<ShootCall> {
        self.lock().calls.clone()
    }

    /// Get a shoot by name
    pub fn get_shoot(&self, name: &str) -> Option<FakeShoot> {
        self.lock().shoots.get(name).cloned()
    }

    /// Seed an existing shoot
    pub fn add_shoot(&self, spec: ShootSpec, status: ShootStatus) {
        self.lock()
            .shoots
            .insert(spec.name.clone(), FakeShoot { spec, status });
    }

    /// Set the reconcile state of an existing shoot
    pub fn set_state(&self, name: &str, state: ShootState) {
        if let Some(shoot) = self.lock().shoots.get_mut(name) {
            shoot.status.state = state;
        }
    }

    /// Fail the next calls with these errors, in order
    pub fn fail_next(&self, error: ShootError) {
        self.lock().errors.push_back(error);
    }

    /// Record the call and pop the next injected error, if any
    fn begin(&self, call: ShootCall) -> Result<std::sync::MutexGuard<'_, FakeState>, ShootError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl ShootAdapter for FakeShootAdapter {
    async fn create_shoot(&self, spec: &ShootSpec) -> Result<(), ShootError> {
        let mut state = self.begin(ShootCall::Create {
            name: spec.name.clone(),
        })?;

        if state.shoots.contains_key(&spec.name) {
            return Err(ShootError::AlreadyExists(spec.name.clone()));
        }

        state.shoots.insert(
            spec.name.clone(),
            FakeShoot {
                spec: spec.clone(),
                status: ShootStatus {
                    state: ShootState::Processing,
                    hibernated: false,
                    kubernetes_version: Some(spec.kubernetes_version.clone()),
                },
            },
        );
        Ok(())
    }

    async fn delete_shoot(&self, name: &str) -> Result<(), ShootError> {
        let mut state = self.begin(ShootCall::Delete {
            name: name.to_string(),
        })?;

        match state.shoots.get_mut(name) {
            Some(shoot) => {
                shoot.status.state = ShootState::Processing;
                Ok(())
            }
            None => Err(ShootError::NotFound(name.to_string())),
        }
    }

    async fn hibernate_shoot(&self, name: &str) -> Result<(), ShootError> {
        let mut state = self.begin(ShootCall::Hibernate {
            name: name.to_string(),
        })?;

        match state.shoots.get_mut(name) {
            Some(shoot) => {
                shoot.status.state = ShootState::Processing;
                Ok(())
            }
            None => Err(ShootError::NotFound(name.to_string())),
        }
    }

    async fn upgrade_shoot(&self, name: &str, kubernetes_version: &str) -> Result<(), ShootError> {
        let mut state = self.begin(ShootCall::Upgrade {
            name: name.to_string(),
            version: kubernetes_version.to_string(),
        })?;

        match state.shoots.get_mut(name) {
            Some(shoot) => {
                shoot.spec.kubernetes_version = kubernetes_version.to_string();
                shoot.status.state = ShootState::Processing;
                Ok(())
            }
            None => Err(ShootError::NotFound(name.to_string())),
        }
    }

    async fn shoot_status(&self, name: &str) -> Result<ShootStatus, ShootError> {
        let state = self.begin(ShootCall::Status {
            name: name.to_string(),
        })?;

        state
            .shoots
            .get(name)
            .map(|shoot| shoot.status.clone())
            .ok_or_else(|| ShootError::NotFound(name.to_string()))
    }
}

impl FakeShootAdapter {
    /// Finish the provider-side reconcile of the last request for a shoot
    ///
    /// A delete removes the shoot, a hibernate marks it hibernated and an
    /// upgrade reports the new version.
    pub fn complete(&self, name: &str) {
        let mut state = self.lock();
        let last_request = state
            .calls
            .iter()
            .rev()
            .find(|call| call.name() == name && !matches!(call, ShootCall::Status { .. }))
            .cloned();

        if let Some(ShootCall::Delete { .. }) = last_request {
            state.shoots.remove(name);
            return;
        }

        if let Some(shoot) = state.shoots.get_mut(name) {
            shoot.status.state = ShootState::Succeeded;
            match last_request {
                Some(ShootCall::Hibernate { .. }) => shoot.status.hibernated = true,
                Some(ShootCall::Upgrade { version, .. }) => {
                    shoot.status.kubernetes_version = Some(version)
                }
                _ => {}
            }
        }
    }
}

impl ShootCall {
    fn name(&self) -> &str {
        match self {
            ShootCall::Create { name }
            | ShootCall::Delete { name }
            | ShootCall::Hibernate { name }
            | ShootCall::Upgrade { name, .. }
            | ShootCall::Status { name } => name,
        }
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

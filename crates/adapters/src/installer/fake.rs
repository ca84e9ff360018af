// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake installer adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{InstallError, InstallationState, InstallerAdapter};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// Recorded installer call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallCall {
    Install { runtime_id: String, version: String },
    Upgrade { runtime_id: String, version: String },
    Uninstall { runtime_id: String },
    Status { runtime_id: String },
}

#[derive(Default)]
struct FakeState {
    installations: HashMap<String, InstallationState>,
    targets: HashMap<String, String>,
    calls: Vec<InstallCall>,
    errors: VecDeque<InstallError>,
}

/// Fake installer adapter for testing
///
/// Install and upgrade leave the runtime `InProgress` until
/// [`FakeInstallerAdapter::complete`] is called.
#[derive(Clone, Default)]
pub struct FakeInstallerAdapter {
    inner: Arc<Mutex<FakeState>>,
}

impl FakeInstallerAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Get all recorded calls
    pub fn calls(&self) -> Vec<InstallCall> {
        self.lock().calls.clone()
    }

    /// Current state of a runtime's installation
    pub fn state(&self, runtime_id: &str) -> InstallationState {
        self.lock()
            .installations
            .get(runtime_id)
            .cloned()
            .unwrap_or(InstallationState::NotStarted)
    }

    /// Force the state of a runtime's installation
    pub fn set_state(&self, runtime_id: &str, state: InstallationState) {
        self.lock()
            .installations
            .insert(runtime_id.to_string(), state);
    }

    /// Finish the pending install or upgrade at its requested version
    pub fn complete(&self, runtime_id: &str) {
        let mut state = self.lock();
        let version = state.targets.get(runtime_id).cloned();
        state.installations.insert(
            runtime_id.to_string(),
            InstallationState::Installed { version },
        );
    }

    /// Fail the next calls with these errors, in order
    pub fn fail_next(&self, error: InstallError) {
        self.lock().errors.push_back(error);
    }

    fn begin(&self, call: InstallCall) -> Result<MutexGuard<'_, FakeState>, InstallError> {
        let mut state = self.lock();
        state.calls.push(call);
        match state.errors.pop_front() {
            Some(error) => Err(error),
            None => Ok(state),
        }
    }
}

#[async_trait]
impl InstallerAdapter for FakeInstallerAdapter {
    async fn install(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        let mut state = self.begin(InstallCall::Install {
            runtime_id: runtime_id.to_string(),
            version: version.to_string(),
        })?;

        state
            .targets
            .insert(runtime_id.to_string(), version.to_string());
        state
            .installations
            .insert(runtime_id.to_string(), InstallationState::InProgress);
        Ok(())
    }

    async fn upgrade(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        let mut state = self.begin(InstallCall::Upgrade {
            runtime_id: runtime_id.to_string(),
            version: version.to_string(),
        })?;

        if !matches!(
            state.installations.get(runtime_id),
            Some(InstallationState::Installed { .. })
        ) {
            return Err(InstallError::NotFound(runtime_id.to_string()));
        }

        state
            .targets
            .insert(runtime_id.to_string(), version.to_string());
        state
            .installations
            .insert(runtime_id.to_string(), InstallationState::InProgress);
        Ok(())
    }

    async fn uninstall(&self, runtime_id: &str) -> Result<(), InstallError> {
        let mut state = self.begin(InstallCall::Uninstall {
            runtime_id: runtime_id.to_string(),
        })?;

        state.targets.remove(runtime_id);
        match state.installations.remove(runtime_id) {
            Some(_) => Ok(()),
            None => Err(InstallError::NotFound(runtime_id.to_string())),
        }
    }

    async fn installation_status(
        &self,
        runtime_id: &str,
    ) -> Result<InstallationState, InstallError> {
        let state = self.begin(InstallCall::Status {
            runtime_id: runtime_id.to_string(),
        })?;

        Ok(state
            .installations
            .get(runtime_id)
            .cloned()
            .unwrap_or(InstallationState::NotStarted))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;

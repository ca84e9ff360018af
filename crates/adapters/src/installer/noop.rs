// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op installer adapter for when component installation is disabled.

use super::{InstallError, InstallationState, InstallerAdapter};
use async_trait::async_trait;

/// Installer adapter that does nothing.
///
/// Every request succeeds and every runtime reports as installed.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpInstallerAdapter;

impl NoOpInstallerAdapter {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl InstallerAdapter for NoOpInstallerAdapter {
    async fn install(&self, _runtime_id: &str, _version: &str) -> Result<(), InstallError> {
        Ok(())
    }

    async fn upgrade(&self, _runtime_id: &str, _version: &str) -> Result<(), InstallError> {
        Ok(())
    }

    async fn uninstall(&self, _runtime_id: &str) -> Result<(), InstallError> {
        Ok(())
    }

    async fn installation_status(
        &self,
        _runtime_id: &str,
    ) -> Result<InstallationState, InstallError> {
        Ok(InstallationState::Installed { version: None })
    }
}

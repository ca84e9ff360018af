// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Installer adapters for the in-cluster runtime components

mod helm;
mod noop;

pub use helm::{parse_release_status, HelmInstallerAdapter};
pub use noop::NoOpInstallerAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeInstallerAdapter, InstallCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the runtime installer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstallError {
    #[error("installation not found: {0}")]
    NotFound(String),
    /// The installer refused the request (unknown version, invalid values)
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("invalid installer response: {0}")]
    InvalidResponse(String),
}

impl InstallError {
    /// Errors that retrying will not fix
    pub fn is_permanent(&self) -> bool {
        matches!(self, InstallError::Rejected(_))
    }
}

/// Installation state of a runtime's components
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallationState {
    NotStarted,
    InProgress,
    /// Installed, with the component version when the installer reports one
    Installed { version: Option<String> },
    Failed(String),
}

/// Adapter for installing runtime components onto a cluster
#[async_trait]
pub trait InstallerAdapter: Clone + Send + Sync + 'static {
    /// Start installing the components at a version
    async fn install(&self, runtime_id: &str, version: &str) -> Result<(), InstallError>;

    /// Start upgrading installed components to a version
    async fn upgrade(&self, runtime_id: &str, version: &str) -> Result<(), InstallError>;

    /// Remove the components
    async fn uninstall(&self, runtime_id: &str) -> Result<(), InstallError>;

    /// Read the installation state
    async fn installation_status(&self, runtime_id: &str)
        -> Result<InstallationState, InstallError>;
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shoot (managed cluster) provider adapters

mod kubectl;

pub use kubectl::{parse_shoot_status, KubectlShootAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeShoot, FakeShootAdapter, ShootCall};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the cluster provider
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShootError {
    #[error("shoot not found: {0}")]
    NotFound(String),
    #[error("shoot already exists: {0}")]
    AlreadyExists(String),
    /// The provider refused the request (quota, invalid spec, forbidden)
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("command failed: {0}")]
    CommandFailed(String),
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
}

impl ShootError {
    /// Errors that retrying will not fix
    pub fn is_permanent(&self) -> bool {
        matches!(self, ShootError::Rejected(_))
    }
}

/// State of the shoot's last reconcile, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShootState {
    Pending,
    Processing,
    Succeeded,
    /// Reconcile hit an error the provider will retry on its own
    Error(String),
    /// Reconcile gave up
    Failed(String),
}

/// Observed shoot status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShootStatus {
    pub state: ShootState,
    pub hibernated: bool,
    pub kubernetes_version: Option<String>,
}

/// Desired shoot for a new cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShootSpec {
    pub name: String,
    pub runtime_id: String,
    pub kubernetes_version: String,
    pub provider: String,
    pub region: String,
    pub machine_type: String,
    pub min_workers: u32,
    pub max_workers: u32,
}

impl ShootSpec {
    /// Render the Shoot resource submitted to the provider
    pub fn manifest(&self, namespace: &str) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": "core.gardener.cloud/v1beta1",
            "kind": "Shoot",
            "metadata": {
                "name": self.name,
                "namespace": namespace,
                "labels": { "provisioner.kyma-project.io/runtime-id": self.runtime_id },
            },
            "spec": {
                "region": self.region,
                "kubernetes": { "version": self.kubernetes_version },
                "hibernation": { "enabled": false },
                "provider": {
                    "type": self.provider,
                    "workers": [{
                        "name": "cpu-worker-0",
                        "machine": { "type": self.machine_type },
                        "minimum": self.min_workers,
                        "maximum": self.max_workers,
                    }],
                },
            },
        })
    }
}

/// Adapter for the cluster provider's shoot API
#[async_trait]
pub trait ShootAdapter: Clone + Send + Sync + 'static {
    /// Submit a new shoot
    async fn create_shoot(&self, spec: &ShootSpec) -> Result<(), ShootError>;

    /// Request deletion of a shoot
    async fn delete_shoot(&self, name: &str) -> Result<(), ShootError>;

    /// Request hibernation of a shoot
    async fn hibernate_shoot(&self, name: &str) -> Result<(), ShootError>;

    /// Request a Kubernetes version upgrade
    async fn upgrade_shoot(&self, name: &str, kubernetes_version: &str) -> Result<(), ShootError>;

    /// Read the current shoot status
    async fn shoot_status(&self, name: &str) -> Result<ShootStatus, ShootError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

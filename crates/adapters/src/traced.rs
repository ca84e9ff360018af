// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use crate::installer::{InstallError, InstallationState, InstallerAdapter};
use crate::shoot::{ShootAdapter, ShootError, ShootSpec, ShootStatus};
use async_trait::async_trait;
use std::time::Instant;
use tracing::Instrument;

/// Wrapper that adds tracing to any ShootAdapter
#[derive(Clone)]
pub struct TracedShootAdapter<S> {
    inner: S,
}

impl<S> TracedShootAdapter<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S: ShootAdapter> ShootAdapter for TracedShootAdapter<S> {
    async fn create_shoot(&self, spec: &ShootSpec) -> Result<(), ShootError> {
        let span = tracing::info_span!(
            "shoot.create",
            name = %spec.name,
            runtime_id = %spec.runtime_id
        );

        async {
            tracing::info!(
                provider = %spec.provider,
                region = %spec.region,
                version = %spec.kubernetes_version,
                "creating shoot"
            );

            // Precondition: worker bounds must be ordered
            if spec.name.is_empty() || spec.min_workers > spec.max_workers {
                tracing::error!(
                    min_workers = spec.min_workers,
                    max_workers = spec.max_workers,
                    "invalid shoot spec"
                );
                return Err(ShootError::Rejected(format!(
                    "invalid shoot spec: name={:?} workers={}..{}",
                    spec.name, spec.min_workers, spec.max_workers
                )));
            }

            let start = Instant::now();
            let result = self.inner.create_shoot(spec).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "shoot created"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "create failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn delete_shoot(&self, name: &str) -> Result<(), ShootError> {
        let span = tracing::info_span!("shoot.delete", name);

        async {
            let start = Instant::now();
            let result = self.inner.delete_shoot(name).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            // NotFound is expected when a retried deletion already went through
            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "deletion requested"),
                Err(ShootError::NotFound(_)) => tracing::info!(elapsed_ms, "shoot already gone"),
                Err(e) => tracing::warn!(elapsed_ms, error = %e, "delete failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn hibernate_shoot(&self, name: &str) -> Result<(), ShootError> {
        let span = tracing::info_span!("shoot.hibernate", name);

        async {
            let result = self.inner.hibernate_shoot(name).await;
            match &result {
                Ok(()) => tracing::info!("hibernation requested"),
                Err(e) => tracing::warn!(error = %e, "hibernate failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn upgrade_shoot(&self, name: &str, kubernetes_version: &str) -> Result<(), ShootError> {
        let span = tracing::info_span!("shoot.upgrade", name, version = kubernetes_version);

        async {
            if kubernetes_version.is_empty() {
                tracing::error!("empty target version");
                return Err(ShootError::Rejected(
                    "empty kubernetes version".to_string(),
                ));
            }

            let result = self.inner.upgrade_shoot(name, kubernetes_version).await;
            match &result {
                Ok(()) => tracing::info!("upgrade requested"),
                Err(e) => tracing::warn!(error = %e, "upgrade failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn shoot_status(&self, name: &str) -> Result<ShootStatus, ShootError> {
        let result = self.inner.shoot_status(name).await;
        tracing::trace!(
            name,
            state = ?result.as_ref().map(|s| &s.state).ok(),
            "checked shoot"
        );
        result
    }
}

/// Wrapper that adds tracing to any InstallerAdapter
#[derive(Clone)]
pub struct TracedInstallerAdapter<I> {
    inner: I,
}

impl<I> TracedInstallerAdapter<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<I: InstallerAdapter> InstallerAdapter for TracedInstallerAdapter<I> {
    async fn install(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        let span = tracing::info_span!("installer.install", runtime_id, version);

        async {
            tracing::info!("installing components");

            let start = Instant::now();
            let result = self.inner.install(runtime_id, version).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "installation started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "install failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn upgrade(&self, runtime_id: &str, version: &str) -> Result<(), InstallError> {
        let span = tracing::info_span!("installer.upgrade", runtime_id, version);

        async {
            let start = Instant::now();
            let result = self.inner.upgrade(runtime_id, version).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            match &result {
                Ok(()) => tracing::info!(elapsed_ms, "upgrade started"),
                Err(e) => tracing::error!(elapsed_ms, error = %e, "upgrade failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn uninstall(&self, runtime_id: &str) -> Result<(), InstallError> {
        let span = tracing::info_span!("installer.uninstall", runtime_id);

        async {
            let result = self.inner.uninstall(runtime_id).await;
            match &result {
                Ok(()) => tracing::info!("uninstalled"),
                Err(InstallError::NotFound(_)) => tracing::info!("nothing to uninstall"),
                Err(e) => tracing::warn!(error = %e, "uninstall failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn installation_status(
        &self,
        runtime_id: &str,
    ) -> Result<InstallationState, InstallError> {
        let result = self.inner.installation_status(runtime_id).await;
        tracing::trace!(runtime_id, state = ?result.as_ref().ok(), "checked installation");
        result
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;

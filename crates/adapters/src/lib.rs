// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the cluster provider and the runtime installer

pub mod installer;
pub mod shoot;
pub mod traced;

pub use installer::{
    HelmInstallerAdapter, InstallError, InstallationState, InstallerAdapter, NoOpInstallerAdapter,
};
pub use shoot::{KubectlShootAdapter, ShootAdapter, ShootError, ShootSpec, ShootState, ShootStatus};
pub use traced::{TracedInstallerAdapter, TracedShootAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use installer::{FakeInstallerAdapter, InstallCall};
#[cfg(any(test, feature = "test-support"))]
pub use shoot::{FakeShoot, FakeShootAdapter, ShootCall};

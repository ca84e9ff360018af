// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Default stage sequences for every operation kind
//!
//! Stages read request parameters from the operation's inputs and drive the
//! shoot and installer adapters. Permanent adapter errors fail the operation;
//! everything else is retried until the stage's dwell limit.

mod deprovision;
mod hibernate;
mod provision;
mod shoot_upgrade;
mod upgrade;

pub use deprovision::{CleanupRuntime, DeleteShoot, WaitForShootDeletion};
pub use hibernate::{HibernateShoot, WaitForHibernation};
pub use provision::{CreateShoot, InstallRuntime, WaitForInstallation, WaitForShoot};
pub use shoot_upgrade::{UpgradeShoot, WaitForShootUpgrade};
pub use upgrade::{UpgradeRuntime, WaitForRuntimeUpgrade};

use crate::sequence::{SequenceError, SequenceRegistry, StageSequence};
use crate::stage::{RetryPolicy, StageOutcome, StagePolicy};
use pv_adapters::{InstallError, InstallerAdapter, ShootAdapter, ShootError};
use pv_core::{Operation, OperationKind};
use sha2::{Digest, Sha256};
use std::time::Duration;

/// Digest bytes kept in derived shoot names (10 hex characters)
const SHOOT_HASH_BYTES: usize = 5;

/// Operation input keys read by the default stages
pub mod inputs {
    pub const SHOOT_NAME: &str = "shoot_name";
    pub const KUBERNETES_VERSION: &str = "kubernetes_version";
    pub const RUNTIME_VERSION: &str = "runtime_version";
    pub const PROVIDER: &str = "provider";
    pub const REGION: &str = "region";
    pub const MACHINE_TYPE: &str = "machine_type";
    pub const MIN_WORKERS: &str = "min_workers";
    pub const MAX_WORKERS: &str = "max_workers";
}

/// Maximum time an operation may spend in each phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwellLimits {
    pub cluster_creation: Duration,
    pub installation: Duration,
    pub upgrade: Duration,
    pub cluster_deletion: Duration,
    pub waiting_for_cluster_deletion: Duration,
    pub hibernation: Duration,
    pub shoot_upgrade: Duration,
}

impl Default for DwellLimits {
    fn default() -> Self {
        let hour = Duration::from_secs(60 * 60);
        Self {
            cluster_creation: hour,
            installation: hour,
            upgrade: hour,
            cluster_deletion: Duration::from_secs(30 * 60),
            waiting_for_cluster_deletion: hour,
            hibernation: hour,
            shoot_upgrade: hour,
        }
    }
}

/// Shoot parameters used when a provision request leaves them out
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShootDefaults {
    pub provider: String,
    pub region: String,
    pub machine_type: String,
    pub kubernetes_version: String,
    pub min_workers: u32,
    pub max_workers: u32,
}

impl Default for ShootDefaults {
    fn default() -> Self {
        Self {
            provider: "gcp".to_string(),
            region: "europe-west3".to_string(),
            machine_type: "n2-standard-4".to_string(),
            kubernetes_version: "1.29.4".to_string(),
            min_workers: 1,
            max_workers: 3,
        }
    }
}

/// Settings shared by the default stages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageSettings {
    pub retry: RetryPolicy,
    /// Delay between status checks while waiting on the provider
    pub poll_interval: Duration,
    pub execution_timeout: Duration,
    pub dwell: DwellLimits,
    pub shoot_defaults: ShootDefaults,
}

impl Default for StageSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::Backoff {
                initial: Duration::from_secs(5),
                max: Duration::from_secs(60),
            },
            poll_interval: Duration::from_secs(20),
            execution_timeout: Duration::from_secs(5 * 60),
            dwell: DwellLimits::default(),
            shoot_defaults: ShootDefaults::default(),
        }
    }
}

impl StageSettings {
    fn policy(&self, max_dwell: Duration) -> StagePolicy {
        StagePolicy {
            timeout: self.execution_timeout,
            retry: self.retry,
            max_dwell,
        }
    }
}

/// Build the sequences for all five operation kinds
pub fn default_sequences<Sh, In>(
    shoots: Sh,
    installer: In,
    settings: &StageSettings,
) -> Result<SequenceRegistry, SequenceError>
where
    Sh: ShootAdapter,
    In: InstallerAdapter,
{
    let dwell = settings.dwell;
    let poll = settings.poll_interval;

    let provision = StageSequence::builder(OperationKind::Provision)
        .stage(
            "create-shoot",
            settings.policy(dwell.cluster_creation),
            CreateShoot::new(shoots.clone(), settings.shoot_defaults.clone()),
        )
        .stage(
            "wait-for-shoot",
            settings.policy(dwell.cluster_creation),
            WaitForShoot::new(shoots.clone(), poll),
        )
        .stage(
            "install-runtime",
            settings.policy(dwell.installation),
            InstallRuntime::new(installer.clone()),
        )
        .stage(
            "wait-for-installation",
            settings.policy(dwell.installation),
            WaitForInstallation::new(installer.clone(), poll),
        )
        .deadline(dwell.cluster_creation + dwell.installation)
        .build()?;

    let deprovision = StageSequence::builder(OperationKind::Deprovision)
        .stage(
            "cleanup-runtime",
            settings.policy(dwell.cluster_deletion),
            CleanupRuntime::new(installer.clone()),
        )
        .stage(
            "delete-shoot",
            settings.policy(dwell.cluster_deletion),
            DeleteShoot::new(shoots.clone()),
        )
        .stage(
            "wait-for-shoot-deletion",
            settings.policy(dwell.waiting_for_cluster_deletion),
            WaitForShootDeletion::new(shoots.clone(), poll),
        )
        .deadline(dwell.cluster_deletion + dwell.waiting_for_cluster_deletion)
        .build()?;

    let upgrade = StageSequence::builder(OperationKind::Upgrade)
        .stage(
            "upgrade-runtime",
            settings.policy(dwell.upgrade),
            UpgradeRuntime::new(installer.clone()),
        )
        .stage(
            "wait-for-runtime-upgrade",
            settings.policy(dwell.upgrade),
            WaitForRuntimeUpgrade::new(installer, poll),
        )
        .deadline(dwell.upgrade)
        .build()?;

    let shoot_upgrade = StageSequence::builder(OperationKind::ShootUpgrade)
        .stage(
            "upgrade-shoot",
            settings.policy(dwell.shoot_upgrade),
            UpgradeShoot::new(shoots.clone()),
        )
        .stage(
            "wait-for-shoot-upgrade",
            settings.policy(dwell.shoot_upgrade),
            WaitForShootUpgrade::new(shoots.clone(), poll),
        )
        .deadline(dwell.shoot_upgrade)
        .build()?;

    let hibernate = StageSequence::builder(OperationKind::Hibernate)
        .stage(
            "hibernate-shoot",
            settings.policy(dwell.hibernation),
            HibernateShoot::new(shoots.clone()),
        )
        .stage(
            "wait-for-hibernation",
            settings.policy(dwell.hibernation),
            WaitForHibernation::new(shoots, poll),
        )
        .deadline(dwell.hibernation)
        .build()?;

    SequenceRegistry::new([provision, deprovision, upgrade, shoot_upgrade, hibernate])
}

/// Shoot name from the operation inputs, else derived from the runtime ID
pub fn shoot_name(operation: &Operation) -> String {
    match operation.input(inputs::SHOOT_NAME) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => derive_shoot_name(&operation.runtime_id),
    }
}

/// Shoot name for a runtime, hashed from the whole runtime ID
pub fn derive_shoot_name(runtime_id: &str) -> String {
    let digest = Sha256::digest(runtime_id.as_bytes());
    let hex: String = digest[..SHOOT_HASH_BYTES]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("c-{}", hex)
}

/// Required input, or a fatal outcome naming the missing key
fn required_input<'a>(operation: &'a Operation, key: &str) -> Result<&'a str, StageOutcome> {
    operation
        .input(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| StageOutcome::fatal(format!("missing input: {}", key)))
}

fn shoot_failure(action: &str, error: ShootError) -> StageOutcome {
    if error.is_permanent() {
        StageOutcome::fatal(format!("{}: {}", action, error))
    } else {
        StageOutcome::retry(format!("{}: {}", action, error))
    }
}

fn install_failure(action: &str, error: InstallError) -> StageOutcome {
    if error.is_permanent() {
        StageOutcome::fatal(format!("{}: {}", action, error))
    } else {
        StageOutcome::retry(format!("{}: {}", action, error))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration
//!
//! Loaded from a TOML file. Every key is optional; durations are written
//! in human form (`"30m"`, `"5s"`).

use pv_core::OperationKind;
use pv_engine::{DwellLimits, RetryPolicy, ShootDefaults, StageSettings};
use serde::Deserialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file when no argument is given
pub const CONFIG_ENV: &str = "PROVISIONER_CONFIG";

/// Environment variable overriding `state_dir`
pub const STATE_DIR_ENV: &str = "PROVISIONER_STATE_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory holding the WAL, lock file and log
    pub state_dir: PathBuf,
    /// Filter used when `RUST_LOG` is unset
    pub log_level: String,
    pub queues: QueueConfig,
    pub recovery: RecoveryConfig,
    pub timeouts: TimeoutConfig,
    pub gardener: GardenerConfig,
    pub installer: InstallerConfig,
    pub shoot: ShootConfig,
    pub stages: StagesConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("/var/lib/provisioner"),
            log_level: "info".to_string(),
            queues: QueueConfig::default(),
            recovery: RecoveryConfig::default(),
            timeouts: TimeoutConfig::default(),
            gardener: GardenerConfig::default(),
            installer: InstallerConfig::default(),
            shoot: ShootConfig::default(),
            stages: StagesConfig::default(),
        }
    }
}

/// Worker count per operation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    pub provision: usize,
    pub deprovision: usize,
    pub upgrade: usize,
    pub shoot_upgrade: usize,
    pub hibernate: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            provision: 10,
            deprovision: 10,
            upgrade: 10,
            shoot_upgrade: 10,
            hibernate: 10,
        }
    }
}

impl QueueConfig {
    pub fn workers(&self, kind: OperationKind) -> usize {
        match kind {
            OperationKind::Provision => self.provision,
            OperationKind::Deprovision => self.deprovision,
            OperationKind::Upgrade => self.upgrade,
            OperationKind::ShootUpgrade => self.shoot_upgrade,
            OperationKind::Hibernate => self.hibernate,
        }
    }
}

/// Startup re-enqueue of in-progress operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RecoveryConfig {
    pub enabled: bool,
    pub attempts: u32,
    #[serde(with = "humantime_serde")]
    pub delay: Duration,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            attempts: 30,
            delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutConfig {
    pub provisioning: ProvisioningTimeouts,
    pub deprovisioning: DeprovisioningTimeouts,
    pub hibernation: HibernationTimeouts,
    pub shoot_upgrade: ShootUpgradeTimeouts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvisioningTimeouts {
    #[serde(with = "humantime_serde")]
    pub cluster_creation: Duration,
    #[serde(with = "humantime_serde")]
    pub installation: Duration,
    #[serde(with = "humantime_serde")]
    pub upgrade: Duration,
}

impl Default for ProvisioningTimeouts {
    fn default() -> Self {
        let limits = DwellLimits::default();
        Self {
            cluster_creation: limits.cluster_creation,
            installation: limits.installation,
            upgrade: limits.upgrade,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeprovisioningTimeouts {
    #[serde(with = "humantime_serde")]
    pub cluster_deletion: Duration,
    #[serde(with = "humantime_serde")]
    pub waiting_for_cluster_deletion: Duration,
}

impl Default for DeprovisioningTimeouts {
    fn default() -> Self {
        let limits = DwellLimits::default();
        Self {
            cluster_deletion: limits.cluster_deletion,
            waiting_for_cluster_deletion: limits.waiting_for_cluster_deletion,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HibernationTimeouts {
    #[serde(with = "humantime_serde")]
    pub waiting_for_hibernation: Duration,
}

impl Default for HibernationTimeouts {
    fn default() -> Self {
        Self {
            waiting_for_hibernation: DwellLimits::default().hibernation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShootUpgradeTimeouts {
    #[serde(with = "humantime_serde")]
    pub shoot_upgrade: Duration,
}

impl Default for ShootUpgradeTimeouts {
    fn default() -> Self {
        Self {
            shoot_upgrade: DwellLimits::default().shoot_upgrade,
        }
    }
}

impl TimeoutConfig {
    pub fn dwell_limits(&self) -> DwellLimits {
        DwellLimits {
            cluster_creation: self.provisioning.cluster_creation,
            installation: self.provisioning.installation,
            upgrade: self.provisioning.upgrade,
            cluster_deletion: self.deprovisioning.cluster_deletion,
            waiting_for_cluster_deletion: self.deprovisioning.waiting_for_cluster_deletion,
            hibernation: self.hibernation.waiting_for_hibernation,
            shoot_upgrade: self.shoot_upgrade.shoot_upgrade,
        }
    }
}

/// Access to the cluster provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GardenerConfig {
    /// Provider project; shoots live in namespace `garden-<project>`
    pub project: String,
    pub kubeconfig: Option<PathBuf>,
    pub kubectl: PathBuf,
}

impl Default for GardenerConfig {
    fn default() -> Self {
        Self {
            project: "provisioner".to_string(),
            kubeconfig: None,
            kubectl: PathBuf::from("kubectl"),
        }
    }
}

impl GardenerConfig {
    pub fn namespace(&self) -> String {
        format!("garden-{}", self.project)
    }
}

/// Runtime installation through helm
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallerConfig {
    /// When false, installation stages succeed without touching the cluster
    pub enabled: bool,
    pub helm: PathBuf,
    pub chart: String,
    pub release: String,
    pub namespace: String,
    /// Per-runtime kubeconfigs; defaults to `<state_dir>/kubeconfigs`
    pub kubeconfig_dir: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            helm: PathBuf::from("helm"),
            chart: "kyma/kyma".to_string(),
            release: "kyma".to_string(),
            namespace: "kyma-system".to_string(),
            kubeconfig_dir: None,
        }
    }
}

/// Defaults for new clusters
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShootConfig {
    pub provider: String,
    pub region: String,
    pub machine_type: String,
    pub kubernetes_version: String,
    pub min_workers: u32,
    pub max_workers: u32,
}

impl Default for ShootConfig {
    fn default() -> Self {
        let defaults = ShootDefaults::default();
        Self {
            provider: defaults.provider,
            region: defaults.region,
            machine_type: defaults.machine_type,
            kubernetes_version: defaults.kubernetes_version,
            min_workers: defaults.min_workers,
            max_workers: defaults.max_workers,
        }
    }
}

/// Retry, polling and per-call limits shared by all stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StagesConfig {
    /// First retry delay; doubles per consecutive failure
    #[serde(with = "humantime_serde")]
    pub retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub max_retry_delay: Duration,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub execution_timeout: Duration,
}

impl Default for StagesConfig {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            max_retry_delay: Duration::from_secs(60),
            poll_interval: Duration::from_secs(20),
            execution_timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl Config {
    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, or use defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Resolve the config from the command line argument and environment
    ///
    /// The argument wins over `$PROVISIONER_CONFIG`; `$PROVISIONER_STATE_DIR`
    /// overrides whatever `state_dir` the file sets.
    pub fn resolve(
        arg: Option<PathBuf>,
        env: impl Fn(&str) -> Option<OsString>,
    ) -> Result<Self, ConfigError> {
        let path = arg.or_else(|| env(CONFIG_ENV).map(PathBuf::from));
        let mut config = Self::load(path.as_deref())?;
        if let Some(state_dir) = env(STATE_DIR_ENV) {
            config.state_dir = PathBuf::from(state_dir);
        }
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.recovery.attempts == 0 {
            return Err(ConfigError::Invalid(
                "recovery.attempts must be at least 1".to_string(),
            ));
        }
        if self.shoot.min_workers > self.shoot.max_workers {
            return Err(ConfigError::Invalid(format!(
                "shoot.min_workers ({}) exceeds shoot.max_workers ({})",
                self.shoot.min_workers, self.shoot.max_workers
            )));
        }
        if self.stages.retry_delay > self.stages.max_retry_delay {
            return Err(ConfigError::Invalid(
                "stages.retry_delay exceeds stages.max_retry_delay".to_string(),
            ));
        }
        if self.stages.poll_interval.is_zero() || self.stages.execution_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "stages.poll_interval and stages.execution_timeout must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir.join("provisionerd.pid")
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("provisionerd.log")
    }

    pub fn wal_path(&self) -> PathBuf {
        self.state_dir.join("wal").join("operations.wal")
    }

    pub fn kubeconfig_dir(&self) -> PathBuf {
        self.installer
            .kubeconfig_dir
            .clone()
            .unwrap_or_else(|| self.state_dir.join("kubeconfigs"))
    }

    /// Stage settings derived from `[stages]`, `[timeouts]` and `[shoot]`
    pub fn stage_settings(&self) -> StageSettings {
        StageSettings {
            retry: RetryPolicy::Backoff {
                initial: self.stages.retry_delay,
                max: self.stages.max_retry_delay,
            },
            poll_interval: self.stages.poll_interval,
            execution_timeout: self.stages.execution_timeout,
            dwell: self.timeouts.dwell_limits(),
            shoot_defaults: ShootDefaults {
                provider: self.shoot.provider.clone(),
                region: self.shoot.region.clone(),
                machine_type: self.shoot.machine_type.clone(),
                kubernetes_version: self.shoot.kubernetes_version.clone(),
                min_workers: self.shoot.min_workers,
                max_workers: self.shoot.max_workers,
            },
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

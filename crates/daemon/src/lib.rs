// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pv-daemon: configuration and lifecycle of the provisioner daemon

pub mod config;
pub mod lifecycle;

pub use config::{Config, ConfigError, CONFIG_ENV, STATE_DIR_ENV};
pub use lifecycle::{startup, Daemon, DaemonQueues, LifecycleError};

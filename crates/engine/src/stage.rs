// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stage contract
//!
//! A stage is one named, re-runnable step of an operation. It receives the
//! persisted operation snapshot and reports what should happen next as a
//! [`StageOutcome`]; the executor owns every state change and store write.

use async_trait::async_trait;
use pv_core::Operation;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error reported by a stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct StageError(String);

impl StageError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self(message.to_string())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Result of one stage run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    /// Advance to the next stage, or succeed after the last one
    Finished,
    /// Not done yet; run the same stage again after the delay
    Continue(Duration),
    /// Transient failure; run again after the stage's retry delay
    Retry(StageError),
    /// Fail the operation now
    Fatal(StageError),
}

impl StageOutcome {
    pub fn retry(message: impl fmt::Display) -> Self {
        StageOutcome::Retry(StageError::new(message))
    }

    pub fn fatal(message: impl fmt::Display) -> Self {
        StageOutcome::Fatal(StageError::new(message))
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            StageOutcome::Finished => "finished",
            StageOutcome::Continue(_) => "continue",
            StageOutcome::Retry(_) => "retry",
            StageOutcome::Fatal(_) => "fatal",
        }
    }
}

/// Delay before re-running a stage that returned `Retry`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryPolicy {
    Fixed(Duration),
    /// Doubles per consecutive failure, capped at `max`
    Backoff { initial: Duration, max: Duration },
}

impl RetryPolicy {
    /// Delay after the given number of consecutive failures (1 = first)
    pub fn delay(&self, failures: u32) -> Duration {
        match *self {
            RetryPolicy::Fixed(delay) => delay,
            RetryPolicy::Backoff { initial, max } => {
                let exponent = failures.saturating_sub(1).min(31);
                initial
                    .checked_mul(1u32 << exponent)
                    .unwrap_or(max)
                    .min(max)
            }
        }
    }
}

/// Per-stage execution limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StagePolicy {
    /// Longest a single run may take before it counts as a retry
    pub timeout: Duration,
    pub retry: RetryPolicy,
    /// Longest an operation may stay in this stage before it fails
    pub max_dwell: Duration,
}

impl Default for StagePolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5 * 60),
            retry: RetryPolicy::Fixed(Duration::from_secs(10)),
            max_dwell: Duration::from_secs(60 * 60),
        }
    }
}

/// One unit of work in a stage sequence.
///
/// Capabilities (adapters, settings) are injected at construction. `run`
/// must be safe to call again with the same snapshot: a crash after the
/// stage's side effects but before the store write re-runs it.
#[async_trait]
pub trait Stage: Send + Sync + 'static {
    async fn run(&self, operation: &Operation) -> StageOutcome;
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;

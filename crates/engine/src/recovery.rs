// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Startup recovery
//!
//! Re-adds every in-progress operation to the queue of its kind. The store
//! may still be coming up when the process starts, so listing is retried a
//! bounded number of times with a fixed delay.

use crate::queue::Enqueue;
use pv_storage::{OperationStore, StoreError};
use std::time::Duration;
use thiserror::Error;

/// Errors that abort startup recovery
#[derive(Debug, Error)]
pub enum RecoveryError {
    /// The store did not become available within the retry budget
    #[error("store unavailable after {attempts} attempts: {source}")]
    StartupUnavailable {
        attempts: u32,
        #[source]
        source: StoreError,
    },
    /// The store answered with an error retrying will not fix
    #[error("store failed: {0}")]
    StoreFailed(#[source] StoreError),
}

/// Bounded-retry enqueuer for in-progress operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecoveryEnqueuer {
    attempts: u32,
    delay: Duration,
}

impl RecoveryEnqueuer {
    /// `attempts` below one are treated as one
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// List in-progress operations and enqueue each by kind.
    ///
    /// Returns the number of operations enqueued.
    pub async fn run<S, Q>(&self, store: &S, queues: &Q) -> Result<usize, RecoveryError>
    where
        S: OperationStore + ?Sized,
        Q: Enqueue + ?Sized,
    {
        let mut attempt = 1;
        let operations = loop {
            match store.list_in_progress_operations().await {
                Ok(operations) => break operations,
                Err(e) if !e.is_transient() => return Err(RecoveryError::StoreFailed(e)),
                Err(e) if attempt >= self.attempts => {
                    return Err(RecoveryError::StartupUnavailable {
                        attempts: attempt,
                        source: e,
                    })
                }
                Err(e) => {
                    tracing::warn!(
                        attempt,
                        max_attempts = self.attempts,
                        error = %e,
                        "listing in-progress operations failed, retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.delay).await;
                }
            }
        };

        for operation in &operations {
            tracing::debug!(
                id = %operation.id,
                kind = %operation.kind,
                stage = %operation.stage,
                "recovering"
            );
            queues.enqueue(operation.kind, &operation.id);
        }
        tracing::info!(
            count = operations.len(),
            attempts = attempt,
            "recovered in-progress operations"
        );
        Ok(operations.len())
    }
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;

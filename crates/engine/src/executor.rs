// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation executor
//!
//! One invocation loads an operation, runs its current stage, and persists
//! the resulting state with a single store write.

use crate::sequence::SequenceRegistry;
use crate::stage::StageOutcome;
use crate::transition::{apply_outcome, check_deadline, Transition};
use async_trait::async_trait;
use pv_core::{Clock, Operation, OperationKind};
use pv_storage::{OperationStore, StoreError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;

/// Requeue delay when failing an operation at an unknown stage cannot be persisted
const UNKNOWN_STAGE_RETRY: Duration = Duration::from_secs(10);

/// What the queue should do with an operation ID after an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Run again after the delay; zero means immediately
    Requeue(Duration),
    /// Terminal; release the ID
    Done,
}

/// Errors that can occur during one executor invocation
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("operation not found: {0}")]
    NotFound(String),
    #[error("no stage sequence for {kind} (operation {id})")]
    SequenceNotFound { id: String, kind: OperationKind },
    #[error("failed to load operation {id}: {source}")]
    Load {
        id: String,
        #[source]
        source: StoreError,
    },
    #[error("failed to persist operation {id}: {source}")]
    Persist {
        id: String,
        /// Delay to reuse before re-running the unpersisted stage
        delay: Duration,
        #[source]
        source: StoreError,
    },
}

impl ExecuteError {
    /// Delay after which the ID should be re-added, if the error is retryable
    pub fn requeue_delay(&self) -> Option<Duration> {
        match self {
            ExecuteError::Persist { delay, .. } => Some(*delay),
            _ => None,
        }
    }
}

/// Drives one operation forward by one stage run
#[async_trait]
pub trait Execute: Send + Sync + 'static {
    async fn execute(&self, id: &str) -> Result<Disposition, ExecuteError>;
}

/// Executor backed by an [`OperationStore`] and a [`SequenceRegistry`]
pub struct OperationExecutor<S, C> {
    store: S,
    registry: Arc<SequenceRegistry>,
    clock: C,
}

impl<S, C> OperationExecutor<S, C>
where
    S: OperationStore,
    C: Clock,
{
    pub fn new(store: S, registry: Arc<SequenceRegistry>, clock: C) -> Self {
        Self {
            store,
            registry,
            clock,
        }
    }

    async fn load(&self, id: &str) -> Result<Operation, ExecuteError> {
        self.store.get_operation(id).await.map_err(|e| match e {
            StoreError::NotFound(_) => ExecuteError::NotFound(id.to_string()),
            source => ExecuteError::Load {
                id: id.to_string(),
                source,
            },
        })
    }

    async fn persist(
        &self,
        transition: Transition,
        retry_delay: Duration,
    ) -> Result<Disposition, ExecuteError> {
        let Transition { operation, delay } = transition;

        if let Err(source) = self.store.update_operation(&operation).await {
            // The stored row is still the pre-transition state; re-run it later
            let delay = if delay.is_zero() { retry_delay } else { delay };
            return Err(ExecuteError::Persist {
                id: operation.id,
                delay,
                source,
            });
        }

        if operation.is_terminal() {
            tracing::info!(
                state = %operation.state,
                message = %operation.message,
                "operation finished"
            );
            Ok(Disposition::Done)
        } else {
            Ok(Disposition::Requeue(delay))
        }
    }

    async fn execute_inner(&self, mut operation: Operation) -> Result<Disposition, ExecuteError> {
        let Some(sequence) = self.registry.get(operation.kind) else {
            return Err(ExecuteError::SequenceNotFound {
                id: operation.id,
                kind: operation.kind,
            });
        };

        let entry = match sequence.find(&operation.stage) {
            Some((_, entry)) => entry,
            None => {
                tracing::error!(stage = %operation.stage, "unknown stage");
                operation.fail(
                    format!("unknown stage: {}", operation.stage),
                    self.clock.now(),
                );
                let transition = Transition {
                    operation,
                    delay: Duration::ZERO,
                };
                return self.persist(transition, UNKNOWN_STAGE_RETRY).await;
            }
        };
        let policy = *entry.policy();
        let retry_delay = policy.retry.delay(operation.failures.saturating_add(1));

        if check_deadline(&mut operation, &sequence, self.clock.now()) {
            tracing::warn!(message = %operation.message, "deadline exceeded");
            let transition = Transition {
                operation,
                delay: Duration::ZERO,
            };
            return self.persist(transition, retry_delay).await;
        }

        let start = Instant::now();
        let run = entry.stage().run(&operation);
        let outcome = match tokio::time::timeout(policy.timeout, run).await {
            Ok(outcome) => outcome,
            Err(_) => StageOutcome::retry(format!(
                "stage timed out after {}s",
                policy.timeout.as_secs()
            )),
        };
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            StageOutcome::Finished | StageOutcome::Continue(_) => {
                tracing::info!(outcome = outcome.name(), elapsed_ms, "stage ran")
            }
            StageOutcome::Retry(e) => tracing::warn!(
                outcome = outcome.name(),
                failures = operation.failures.saturating_add(1),
                elapsed_ms,
                error = %e,
                "stage ran"
            ),
            StageOutcome::Fatal(e) => {
                tracing::error!(outcome = outcome.name(), elapsed_ms, error = %e, "stage ran")
            }
        }

        let transition = apply_outcome(operation, &sequence, outcome, self.clock.now());
        self.persist(transition, retry_delay).await
    }
}

#[async_trait]
impl<S, C> Execute for OperationExecutor<S, C>
where
    S: OperationStore,
    C: Clock,
{
    async fn execute(&self, id: &str) -> Result<Disposition, ExecuteError> {
        let operation = self.load(id).await?;

        if operation.is_terminal() {
            tracing::debug!(id, state = %operation.state, "operation already terminal");
            return Ok(Disposition::Done);
        }

        let span = tracing::info_span!(
            "operation",
            id,
            kind = %operation.kind,
            stage = %operation.stage,
            runtime_id = %operation.runtime_id
        );
        self.execute_inner(operation).instrument(span).await
    }
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation intake
//!
//! Creates operation records at the first stage of their kind's sequence and
//! hands them to the queues.

use crate::queue::Enqueue;
use crate::sequence::SequenceRegistry;
use crate::stages::derive_shoot_name;
use crate::stages::inputs::SHOOT_NAME;
use pv_core::{Clock, IdGen, Operation, OperationKind};
use pv_storage::{OperationStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors starting an operation
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("runtime {runtime_id} already has operation {operation_id} in progress")]
    Conflict {
        runtime_id: String,
        operation_id: String,
    },
    #[error("no stage sequence for {0}")]
    UnsupportedKind(OperationKind),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Starts operations and reads their status
pub struct OperationService<S, Q, C, I> {
    store: S,
    registry: Arc<SequenceRegistry>,
    queues: Arc<Q>,
    clock: C,
    ids: I,
}

impl<S, Q, C, I> OperationService<S, Q, C, I>
where
    S: OperationStore,
    Q: Enqueue,
    C: Clock,
    I: IdGen,
{
    pub fn new(
        store: S,
        registry: Arc<SequenceRegistry>,
        queues: Arc<Q>,
        clock: C,
        ids: I,
    ) -> Self {
        Self {
            store,
            registry,
            queues,
            clock,
            ids,
        }
    }

    /// Create, persist and enqueue a new operation for a runtime.
    ///
    /// Refused while the runtime's latest operation is still in progress.
    pub async fn start(
        &self,
        kind: OperationKind,
        runtime_id: &str,
        inputs: HashMap<String, String>,
    ) -> Result<Operation, ServiceError> {
        let sequence = self
            .registry
            .get(kind)
            .ok_or(ServiceError::UnsupportedKind(kind))?;

        let last = match self.store.last_operation(runtime_id).await {
            Ok(last) if !last.is_terminal() => {
                return Err(ServiceError::Conflict {
                    runtime_id: runtime_id.to_string(),
                    operation_id: last.id,
                })
            }
            Ok(last) => Some(last),
            Err(e) if e.is_not_found() => None,
            Err(e) => return Err(e.into()),
        };
        let inputs = pin_shoot_name(inputs, runtime_id, last.as_ref());

        let operation = Operation::new(
            self.ids.next_id(),
            runtime_id,
            kind,
            sequence.first().name(),
            inputs,
            &self.clock,
        );
        self.store.insert_operation(&operation).await?;
        tracing::info!(
            id = %operation.id,
            %kind,
            runtime_id,
            stage = %operation.stage,
            "operation started"
        );

        self.queues.enqueue(kind, &operation.id);
        Ok(operation)
    }

    /// Current state of an operation
    pub async fn operation(&self, id: &str) -> Result<Operation, ServiceError> {
        Ok(self.store.get_operation(id).await?)
    }

    /// Latest operation for a runtime
    pub async fn last_operation(&self, runtime_id: &str) -> Result<Operation, ServiceError> {
        Ok(self.store.last_operation(runtime_id).await?)
    }
}

/// Every operation on a runtime targets the shoot its first operation named
fn pin_shoot_name(
    mut inputs: HashMap<String, String>,
    runtime_id: &str,
    last: Option<&Operation>,
) -> HashMap<String, String> {
    let requested = inputs
        .get(SHOOT_NAME)
        .is_some_and(|name| !name.is_empty());
    if !requested {
        let name = last
            .and_then(|op| op.input(SHOOT_NAME))
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_shoot_name(runtime_id));
        inputs.insert(SHOOT_NAME.to_string(), name);
    }
    inputs
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;

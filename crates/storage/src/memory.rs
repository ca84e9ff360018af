// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Non-durable operation store

use crate::{InProgressCount, MaterializedState, OperationStore, StoreError, WalRecord};
use async_trait::async_trait;
use pv_core::Operation;
use std::sync::{Arc, Mutex};

/// Operation store kept entirely in memory.
///
/// Clones share the same rows, so a test can keep a handle while the engine
/// owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MaterializedState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing rows
    pub fn with_operations(operations: impl IntoIterator<Item = Operation>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap_or_else(|e| e.into_inner());
            for operation in operations {
                state.apply(&WalRecord::OperationInsert { operation });
            }
        }
        store
    }

    /// Snapshot of a row without going through the async interface
    pub fn snapshot(&self, id: &str) -> Option<Operation> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }
}

#[async_trait]
impl OperationStore for MemoryStore {
    async fn insert_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.check_insert(operation)?;
        state.apply(&WalRecord::OperationInsert {
            operation: operation.clone(),
        });
        Ok(())
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, StoreError> {
        self.snapshot(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.check_update(operation)?;
        state.apply(&WalRecord::OperationUpdate {
            operation: operation.clone(),
        });
        Ok(())
    }

    async fn list_in_progress_operations(&self) -> Result<Vec<Operation>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .in_progress())
    }

    async fn last_operation(&self, runtime_id: &str) -> Result<Operation, StoreError> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last_for_runtime(runtime_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(runtime_id.to_string()))
    }

    async fn in_progress_count(&self) -> Result<InProgressCount, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .in_progress_count())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;

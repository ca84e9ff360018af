// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized operation rows, built from WAL replay

use crate::{InProgressCount, StoreError, WalRecord};
use pv_core::{Operation, OperationState};
use std::collections::HashMap;

/// In-memory view of every operation row
#[derive(Debug, Default)]
pub struct MaterializedState {
    pub operations: HashMap<String, Operation>,
}

impl MaterializedState {
    /// Rebuild state from replayed records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a WalRecord>) -> Self {
        let mut state = Self::default();
        for record in records {
            state.apply(record);
        }
        state
    }

    /// Apply a record to update the state
    pub fn apply(&mut self, record: &WalRecord) {
        match record {
            WalRecord::OperationInsert { operation } | WalRecord::OperationUpdate { operation } => {
                self.operations
                    .insert(operation.id.clone(), operation.clone());
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.operations.get(id)
    }

    /// Reject inserting a row that already exists
    pub fn check_insert(&self, operation: &Operation) -> Result<(), StoreError> {
        if self.operations.contains_key(&operation.id) {
            return Err(StoreError::AlreadyExists(operation.id.clone()));
        }
        Ok(())
    }

    /// Reject updating a row that was never inserted
    pub fn check_update(&self, operation: &Operation) -> Result<(), StoreError> {
        if !self.operations.contains_key(&operation.id) {
            return Err(StoreError::NotFound(operation.id.clone()));
        }
        Ok(())
    }

    /// In-progress operations, oldest first (ties broken by ID)
    pub fn in_progress(&self) -> Vec<Operation> {
        let mut ops: Vec<Operation> = self
            .operations
            .values()
            .filter(|op| op.state == OperationState::InProgress)
            .cloned()
            .collect();
        ops.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)));
        ops
    }

    /// Most recently started operation for a cluster
    pub fn last_for_runtime(&self, runtime_id: &str) -> Option<&Operation> {
        self.operations
            .values()
            .filter(|op| op.runtime_id == runtime_id)
            .max_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.id.cmp(&b.id)))
    }

    pub fn in_progress_count(&self) -> InProgressCount {
        let mut count = InProgressCount::default();
        for op in self.operations.values() {
            if op.state == OperationState::InProgress {
                count.record(op.kind);
            }
        }
        count
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;

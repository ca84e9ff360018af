// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable operation store: WAL plus materialized rows

use crate::{InProgressCount, MaterializedState, OperationStore, StoreError, Wal, WalRecord};
use async_trait::async_trait;
use pv_core::Operation;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

struct Inner {
    wal: Wal,
    state: MaterializedState,
}

/// Operation store backed by a write-ahead log.
///
/// A write appends one fsynced record and then applies it to the in-memory
/// rows under the same lock, so a row is either fully updated or untouched.
/// Writes run on the blocking pool so the fsync never stalls a runtime
/// worker; reads only touch memory.
pub struct WalStore {
    path: PathBuf,
    inner: Arc<Mutex<Inner>>,
}

impl WalStore {
    /// Open the log at `path`, replaying it into memory
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(crate::WalError::from)?;
        }

        let wal = Wal::open(path)?;
        let records = Wal::replay(path)?;
        let state = MaterializedState::from_records(&records);

        tracing::info!(
            path = %path.display(),
            records = records.len(),
            operations = state.operations.len(),
            "replayed operation log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            inner: Arc::new(Mutex::new(Inner { wal, state })),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn write(&self, record: WalRecord) -> Result<(), StoreError> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let mut inner = inner.lock().unwrap_or_else(|e| e.into_inner());
            match &record {
                WalRecord::OperationInsert { operation } => inner.state.check_insert(operation)?,
                WalRecord::OperationUpdate { operation } => inner.state.check_update(operation)?,
            }
            inner.wal.append(&record)?;
            inner.state.apply(&record);
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Backend(format!("WAL write task failed: {}", e)))?
    }

    fn read<T>(&self, f: impl FnOnce(&MaterializedState) -> T) -> T {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&inner.state)
    }
}

#[async_trait]
impl OperationStore for WalStore {
    async fn insert_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        self.write(WalRecord::OperationInsert {
            operation: operation.clone(),
        })
        .await
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, StoreError> {
        self.read(|state| state.get(id).cloned())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        self.write(WalRecord::OperationUpdate {
            operation: operation.clone(),
        })
        .await
    }

    async fn list_in_progress_operations(&self) -> Result<Vec<Operation>, StoreError> {
        Ok(self.read(MaterializedState::in_progress))
    }

    async fn last_operation(&self, runtime_id: &str) -> Result<Operation, StoreError> {
        self.read(|state| state.last_for_runtime(runtime_id).cloned())
            .ok_or_else(|| StoreError::NotFound(runtime_id.to_string()))
    }

    async fn in_progress_count(&self) -> Result<InProgressCount, StoreError> {
        Ok(self.read(MaterializedState::in_progress_count))
    }
}

#[cfg(test)]
#[path = "wal_store_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operation record store interface

use crate::WalError;
use async_trait::async_trait;
use pv_core::{Operation, OperationKind};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by an [`OperationStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("operation not found: {0}")]
    NotFound(String),
    #[error("operation already exists: {0}")]
    AlreadyExists(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("store backend error: {0}")]
    Backend(String),
    #[error("WAL error: {0}")]
    Wal(#[from] WalError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }

    /// Whether retrying the same call later may succeed.
    ///
    /// A corrupt log or a missing/duplicate row will not fix itself; an
    /// unreachable backend or an I/O hiccup might.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Unavailable(_) => true,
            StoreError::Wal(WalError::Io(_)) => true,
            StoreError::Wal(_) => false,
            StoreError::NotFound(_) | StoreError::AlreadyExists(_) | StoreError::Backend(_) => {
                false
            }
        }
    }
}

/// Number of in-progress operations per kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InProgressCount {
    by_kind: BTreeMap<OperationKind, usize>,
}

impl InProgressCount {
    pub fn record(&mut self, kind: OperationKind) {
        *self.by_kind.entry(kind).or_default() += 1;
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.by_kind.values().sum()
    }
}

/// Durable read/write access to operation records.
///
/// Implementations must allow concurrent readers and make each single-row
/// write atomic. Writers to the same operation are serialized by the queue's
/// in-flight guard, so no cross-row transactions are needed.
#[async_trait]
pub trait OperationStore: Send + Sync + 'static {
    /// Persist a newly created operation
    async fn insert_operation(&self, operation: &Operation) -> Result<(), StoreError>;

    /// Load an operation; `StoreError::NotFound` if it does not exist
    async fn get_operation(&self, id: &str) -> Result<Operation, StoreError>;

    /// Replace an existing operation row
    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError>;

    /// All operations whose state is `InProgress`, oldest first
    async fn list_in_progress_operations(&self) -> Result<Vec<Operation>, StoreError>;

    /// Most recently started operation for a cluster
    async fn last_operation(&self, runtime_id: &str) -> Result<Operation, StoreError>;

    async fn in_progress_count(&self) -> Result<InProgressCount, StoreError>;
}

#[async_trait]
impl<S: OperationStore + ?Sized> OperationStore for Arc<S> {
    async fn insert_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        (**self).insert_operation(operation).await
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, StoreError> {
        (**self).get_operation(id).await
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        (**self).update_operation(operation).await
    }

    async fn list_in_progress_operations(&self) -> Result<Vec<Operation>, StoreError> {
        (**self).list_in_progress_operations().await
    }

    async fn last_operation(&self, runtime_id: &str) -> Result<Operation, StoreError> {
        (**self).last_operation(runtime_id).await
    }

    async fn in_progress_count(&self) -> Result<InProgressCount, StoreError> {
        (**self).in_progress_count().await
    }
}

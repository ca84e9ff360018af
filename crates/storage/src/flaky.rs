// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failure-injecting store wrapper for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use crate::{InProgressCount, OperationStore, StoreError};
use async_trait::async_trait;
use pv_core::Operation;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Faults {
    failing_updates: AtomicU32,
    failing_lists: AtomicU32,
    failing_gets: AtomicU32,
    lists_broken: AtomicBool,
    updates: AtomicU32,
    lists: AtomicU32,
}

fn take(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

/// Wraps a store, failing a configurable number of upcoming calls and
/// counting writes
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    faults: Arc<Faults>,
}

impl<S: OperationStore> FlakyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Arc::new(Faults::default()),
        }
    }

    /// Fail the next `n` updates with `StoreError::Unavailable`
    pub fn fail_updates(&self, n: u32) {
        self.faults.failing_updates.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` in-progress listings with `StoreError::Unavailable`
    pub fn fail_lists(&self, n: u32) {
        self.faults.failing_lists.store(n, Ordering::SeqCst);
    }

    /// Fail the next `n` reads with `StoreError::Unavailable`
    pub fn fail_gets(&self, n: u32) {
        self.faults.failing_gets.store(n, Ordering::SeqCst);
    }

    /// Make every listing fail with a non-transient error
    pub fn break_lists(&self) {
        self.faults.lists_broken.store(true, Ordering::SeqCst);
    }

    /// Successful updates so far
    pub fn update_count(&self) -> u32 {
        self.faults.updates.load(Ordering::SeqCst)
    }

    /// Listing attempts so far, including failed ones
    pub fn list_attempts(&self) -> u32 {
        self.faults.lists.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: OperationStore> OperationStore for FlakyStore<S> {
    async fn insert_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        self.inner.insert_operation(operation).await
    }

    async fn get_operation(&self, id: &str) -> Result<Operation, StoreError> {
        if take(&self.faults.failing_gets) {
            return Err(StoreError::Unavailable("injected read failure".to_string()));
        }
        self.inner.get_operation(id).await
    }

    async fn update_operation(&self, operation: &Operation) -> Result<(), StoreError> {
        if take(&self.faults.failing_updates) {
            return Err(StoreError::Unavailable("injected write failure".to_string()));
        }
        self.inner.update_operation(operation).await?;
        self.faults.updates.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn list_in_progress_operations(&self) -> Result<Vec<Operation>, StoreError> {
        self.faults.lists.fetch_add(1, Ordering::SeqCst);
        if self.faults.lists_broken.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("injected permanent failure".to_string()));
        }
        if take(&self.faults.failing_lists) {
            return Err(StoreError::Unavailable("schema not initialized".to_string()));
        }
        self.inner.list_in_progress_operations().await
    }

    async fn last_operation(&self, runtime_id: &str) -> Result<Operation, StoreError> {
        self.inner.last_operation(runtime_id).await
    }

    async fn in_progress_count(&self) -> Result<InProgressCount, StoreError> {
        self.inner.in_progress_count().await
    }
}

#[cfg(test)]
#[path = "flaky_tests.rs"]
mod tests;

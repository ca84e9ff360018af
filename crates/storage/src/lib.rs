// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Storage layer for operation records

mod memory;
mod state;
mod store;
mod wal;
mod wal_store;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod flaky;

pub use memory::MemoryStore;
pub use state::MaterializedState;
pub use store::{InProgressCount, OperationStore, StoreError};
pub use wal::{Wal, WalError, WalRecord};
pub use wal_store::WalStore;

#[cfg(any(test, feature = "test-support"))]
pub use flaky::FlakyStore;

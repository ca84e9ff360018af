// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pv-core: domain types for the cluster provisioner
//!
//! This crate provides:
//! - The persisted [`Operation`] record and its kind/state enums
//! - Clock and ID abstractions so time and identity are injectable in tests

pub mod clock;
pub mod id;
pub mod operation;

pub use clock::{elapsed_between, Clock, FakeClock, SystemClock};
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use operation::{Operation, OperationKind, OperationState, ParseKindError};

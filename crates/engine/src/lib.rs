// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Operation queue and stage execution engine

mod executor;
mod queue;
mod queue_set;
mod recovery;
mod sequence;
mod service;
mod stage;
pub mod stages;
mod transition;

#[cfg(test)]
mod testing;

pub use executor::{Disposition, Execute, ExecuteError, OperationExecutor};
pub use queue::{Enqueue, OperationQueue, QueueHandle};
pub use queue_set::{QueueSet, QueueSetHandle};
pub use recovery::{RecoveryEnqueuer, RecoveryError};
pub use sequence::{SequenceBuilder, SequenceError, SequenceRegistry, StageEntry, StageSequence};
pub use service::{OperationService, ServiceError};
pub use stage::{RetryPolicy, Stage, StageError, StageOutcome, StagePolicy};
pub use stages::{default_sequences, DwellLimits, ShootDefaults, StageSettings};
pub use transition::{apply_outcome, check_deadline, Transition};

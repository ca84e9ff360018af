// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure mapping from a stage outcome to the next operation state

use crate::sequence::StageSequence;
use crate::stage::StageOutcome;
use chrono::{DateTime, Utc};
use pv_core::Operation;
use std::time::Duration;

/// The operation to persist and when to run it again
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub operation: Operation,
    /// Delay before the next run; zero means run the next stage now.
    /// Meaningless once the operation is terminal.
    pub delay: Duration,
}

impl Transition {
    fn terminal(operation: Operation) -> Self {
        Self {
            operation,
            delay: Duration::ZERO,
        }
    }
}

/// Apply the outcome of the operation's current stage.
///
/// `now` is read after the stage returned, so dwell time includes the run.
pub fn apply_outcome(
    mut operation: Operation,
    sequence: &StageSequence,
    outcome: StageOutcome,
    now: DateTime<Utc>,
) -> Transition {
    let stage = operation.stage.clone();
    let (index, policy) = match sequence.find(&stage) {
        Some((index, entry)) => (index, *entry.policy()),
        None => {
            operation.fail(format!("unknown stage: {}", stage), now);
            return Transition::terminal(operation);
        }
    };

    match outcome {
        StageOutcome::Finished => match sequence.next_after(index) {
            Some(next) => {
                operation.message = format!("stage {} finished", stage);
                operation.enter_stage(next.name(), now);
                Transition {
                    operation,
                    delay: Duration::ZERO,
                }
            }
            None => {
                operation.succeed("operation succeeded", now);
                Transition::terminal(operation)
            }
        },
        StageOutcome::Continue(delay) => {
            operation.failures = 0;
            if operation.dwell(now) >= policy.max_dwell {
                operation.fail(
                    format!(
                        "stage {} did not complete within {}s",
                        stage,
                        policy.max_dwell.as_secs()
                    ),
                    now,
                );
                return Transition::terminal(operation);
            }
            Transition { operation, delay }
        }
        StageOutcome::Retry(error) => {
            operation.failures = operation.failures.saturating_add(1);
            if operation.dwell(now) >= policy.max_dwell {
                operation.fail(
                    format!(
                        "stage {} timed out after {} attempts: {}",
                        stage, operation.failures, error
                    ),
                    now,
                );
                return Transition::terminal(operation);
            }
            operation.message = error.to_string();
            let delay = policy.retry.delay(operation.failures);
            Transition { operation, delay }
        }
        StageOutcome::Fatal(error) => {
            operation.fail(error.to_string(), now);
            Transition::terminal(operation)
        }
    }
}

/// Fail `operation` if it has outlived the sequence deadline
pub fn check_deadline(
    operation: &mut Operation,
    sequence: &StageSequence,
    now: DateTime<Utc>,
) -> bool {
    let Some(deadline) = sequence.deadline() else {
        return false;
    };
    if operation.age(now) < deadline {
        return false;
    }
    operation.fail(
        format!(
            "operation exceeded its deadline of {}s in stage {}",
            deadline.as_secs(),
            operation.stage
        ),
        now,
    );
    true
}

#[cfg(test)]
#[path = "transition_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::stage::{RetryPolicy, StagePolicy};
use crate::testing::ScriptedStage;
use pv_core::{Clock, FakeClock, OperationKind, OperationState};
use std::collections::HashMap;

const SECOND: Duration = Duration::from_secs(1);
const MINUTE: Duration = Duration::from_secs(60);

fn policy() -> StagePolicy {
    StagePolicy {
        timeout: MINUTE,
        retry: RetryPolicy::Backoff {
            initial: 5 * SECOND,
            max: MINUTE,
        },
        max_dwell: 10 * MINUTE,
    }
}

fn sequence() -> StageSequence {
    StageSequence::builder(OperationKind::Provision)
        .stage("create-shoot", policy(), ScriptedStage::finishing())
        .stage("install-runtime", policy(), ScriptedStage::finishing())
        .deadline(60 * MINUTE)
        .build()
        .unwrap()
}

fn operation(clock: &FakeClock) -> Operation {
    Operation::new(
        "op-1",
        "runtime-1",
        OperationKind::Provision,
        "create-shoot",
        HashMap::new(),
        clock,
    )
}

#[test]
fn finished_advances_to_next_stage() {
    let clock = FakeClock::new();
    let op = operation(&clock);
    clock.advance(30 * SECOND);

    let t = apply_outcome(op, &sequence(), StageOutcome::Finished, clock.now());

    assert_eq!(t.operation.stage, "install-runtime");
    assert_eq!(t.operation.state, OperationState::InProgress);
    assert_eq!(t.operation.stage_entered_at, clock.now());
    assert_eq!(t.delay, Duration::ZERO);
}

#[test]
fn finished_last_stage_succeeds() {
    let clock = FakeClock::new();
    let mut op = operation(&clock);
    op.enter_stage("install-runtime", clock.now());

    let t = apply_outcome(op, &sequence(), StageOutcome::Finished, clock.now());

    assert_eq!(t.operation.state, OperationState::Succeeded);
    assert_eq!(t.operation.finished_at, Some(clock.now()));
}

#[test]
fn continue_keeps_stage_and_uses_requested_delay() {
    let clock = FakeClock::new();
    let mut op = operation(&clock);
    op.failures = 2;

    let t = apply_outcome(op, &sequence(), StageOutcome::Continue(5 * SECOND), clock.now());

    assert_eq!(t.operation.stage, "create-shoot");
    assert_eq!(t.operation.state, OperationState::InProgress);
    assert_eq!(t.operation.failures, 0);
    assert_eq!(t.delay, 5 * SECOND);
}

#[test]
fn retry_counts_failures_and_backs_off() {
    let clock = FakeClock::new();
    let op = operation(&clock);

    let t = apply_outcome(op, &sequence(), StageOutcome::retry("503"), clock.now());
    assert_eq!(t.operation.failures, 1);
    assert_eq!(t.operation.message, "503");
    assert_eq!(t.delay, 5 * SECOND);

    let t = apply_outcome(t.operation, &sequence(), StageOutcome::retry("503"), clock.now());
    assert_eq!(t.operation.failures, 2);
    assert_eq!(t.delay, 10 * SECOND);
}

#[test]
fn retry_past_max_dwell_fails() {
    let clock = FakeClock::new();
    let op = operation(&clock);
    clock.advance(10 * MINUTE);

    let t = apply_outcome(op, &sequence(), StageOutcome::retry("503"), clock.now());

    assert_eq!(t.operation.state, OperationState::Failed);
    assert!(t.operation.message.contains("create-shoot"));
    assert!(t.operation.message.contains("503"));
}

#[test]
fn continue_past_max_dwell_fails() {
    let clock = FakeClock::new();
    let op = operation(&clock);
    clock.advance(11 * MINUTE);

    let t = apply_outcome(op, &sequence(), StageOutcome::Continue(SECOND), clock.now());

    assert_eq!(t.operation.state, OperationState::Failed);
}

#[test]
fn dwell_restarts_on_stage_entry() {
    let clock = FakeClock::new();
    let op = operation(&clock);
    clock.advance(9 * MINUTE);
    let t = apply_outcome(op, &sequence(), StageOutcome::Finished, clock.now());
    clock.advance(9 * MINUTE);

    let t = apply_outcome(t.operation, &sequence(), StageOutcome::retry("x"), clock.now());

    assert_eq!(t.operation.state, OperationState::InProgress);
}

#[test]
fn fatal_fails_with_message() {
    let clock = FakeClock::new();
    let op = operation(&clock);

    let t = apply_outcome(op, &sequence(), StageOutcome::fatal("quota exceeded"), clock.now());

    assert_eq!(t.operation.state, OperationState::Failed);
    assert_eq!(t.operation.message, "quota exceeded");
}

#[test]
fn unknown_stage_fails() {
    let clock = FakeClock::new();
    let mut op = operation(&clock);
    op.stage = "removed-stage".to_string();

    let t = apply_outcome(op, &sequence(), StageOutcome::Finished, clock.now());

    assert_eq!(t.operation.state, OperationState::Failed);
    assert!(t.operation.message.contains("removed-stage"));
}

#[test]
fn deadline_fails_old_operations() {
    let clock = FakeClock::new();
    let mut op = operation(&clock);

    clock.advance(59 * MINUTE);
    assert!(!check_deadline(&mut op, &sequence(), clock.now()));
    assert_eq!(op.state, OperationState::InProgress);

    clock.advance(MINUTE);
    assert!(check_deadline(&mut op, &sequence(), clock.now()));
    assert_eq!(op.state, OperationState::Failed);
    assert!(op.message.contains("deadline"));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn uuid_ids_are_unique() {
    let ids = UuidIdGen;
    let first = ids.next_id();
    let second = ids.next_id();
    assert_ne!(first, second);
    assert!(uuid::Uuid::parse_str(&first).is_ok());
}

#[test]
fn sequential_ids_default_to_op_prefix() {
    let ids = SequentialIdGen::default();
    assert_eq!(ids.next_id(), "op-1");
    assert_eq!(ids.next_id(), "op-2");
}

#[test]
fn sequential_counter_is_shared_between_clones() {
    let a = SequentialIdGen::new("shared");
    let b = a.clone();
    assert_eq!(a.next_id(), "shared-1");
    assert_eq!(b.next_id(), "shared-2");
    assert_eq!(a.next_id(), "shared-3");
}

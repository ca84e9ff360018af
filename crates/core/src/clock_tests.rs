// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::TimeZone;

#[test]
fn system_clock_does_not_go_backwards() {
    let clock = SystemClock;
    let t1 = clock.now();
    std::thread::sleep(Duration::from_millis(1));
    let t2 = clock.now();
    assert!(t2 >= t1);
}

#[test]
fn fake_clock_can_be_advanced() {
    let clock = FakeClock::new();
    let t1 = clock.now();
    clock.advance(Duration::from_secs(60));
    let t2 = clock.now();
    assert_eq!(elapsed_between(t1, t2), Duration::from_secs(60));
}

#[test]
fn fake_clock_is_cloneable_and_shared() {
    let clock1 = FakeClock::new();
    let clock2 = clock1.clone();
    let t1 = clock1.now();
    clock2.advance(Duration::from_secs(30));
    let t2 = clock1.now();
    assert_eq!(elapsed_between(t1, t2), Duration::from_secs(30));
}

#[test]
fn fake_clock_set_pins_time() {
    let pinned = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
    let clock = FakeClock::new();
    clock.set(pinned);
    assert_eq!(clock.now(), pinned);
}

#[test]
fn elapsed_saturates_for_future_timestamps() {
    let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
    let later = now + chrono::Duration::minutes(5);
    assert_eq!(elapsed_between(later, now), Duration::ZERO);
}

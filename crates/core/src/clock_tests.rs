// SPDX-License-Identifier: MIT

use super::*;

#[test]
fn fake_clock_starts_at_given_epoch() {
    let clock = FakeClock::new(1_000);
    assert_eq!(clock.epoch_ms(), 1_000);
}

#[test]
fn fake_clock_advance_moves_both_wall_and_monotonic_time() {
    let clock = FakeClock::new(0);
    let t0 = clock.monotonic_now();
    clock.advance(Duration::from_millis(500));
    assert_eq!(clock.epoch_ms(), 500);
    assert_eq!(clock.monotonic_now().duration_since(t0), Duration::from_millis(500));
}

#[test]
fn system_clock_monotonic_is_non_decreasing() {
    let clock = SystemClock;
    let a = clock.monotonic_now();
    let b = clock.monotonic_now();
    assert!(b >= a);
}

#[test]
fn fake_clock_clones_share_state() {
    let clock = FakeClock::new(0);
    let clone = clock.clone();
    clock.advance(Duration::from_millis(10));
    assert_eq!(clone.epoch_ms(), 10);
}

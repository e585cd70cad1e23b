// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn system_clock_epoch_is_nonzero() {
    let clock = SystemClock;
    assert!(clock.epoch_ms() > 0);
}

#[test]
fn fake_clock_starts_at_base() {
    let clock = FakeClock::new();
    assert_eq!(clock.epoch_ms(), FakeClock::EPOCH_BASE_MS);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    let before = clock.now();
    clock.advance(Duration::from_secs(5));
    assert_eq!(clock.epoch_ms(), FakeClock::EPOCH_BASE_MS + 5_000);
    assert_eq!(clock.now() - before, Duration::from_secs(5));
}

#[test]
fn fake_clock_clones_share_time() {
    let clock = FakeClock::new();
    let other = clock.clone();
    clock.advance_ms(250);
    assert_eq!(other.epoch_ms(), FakeClock::EPOCH_BASE_MS + 250);
}

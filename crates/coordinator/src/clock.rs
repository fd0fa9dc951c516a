// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer helpers shared by the autonomy state machine, batcher, and engine.
//!
//! Production code calls `tokio::time::{interval, sleep}` directly. Tests get
//! a controllable clock for free via `#[tokio::test(start_paused = true)]` +
//! `tokio::time::advance(..)` — no bespoke clock trait needed, since tokio's
//! paused-time test mode already gives deterministic control over every
//! timer in this crate.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Build a fixed-period ticker that skips missed ticks instead of bursting,
/// matching `upstream/poller.rs`'s interval setup.
pub fn interval(period: Duration) -> Interval {
    let mut timer = tokio::time::interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    timer
}

/// A one-shot deadline that can be replaced (cancel-and-reschedule) by simply
/// dropping the previous `Sleep` future, matching how `autonomy::engine`
/// reschedules the vibe timer on every fire.
pub fn deadline(from: Instant, delay: Duration) -> Instant {
    from + delay
}

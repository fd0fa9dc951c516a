// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sleep/idle/active state machine. A plain state record mutated only by the
//! coordinator's own task; it owns no timers itself -- the coordinator actor
//! drives a periodic ticker and calls [`StateMachine::tick`] on it. See
//! `DESIGN.md` for the full sleep/idle/active transition table and the
//! rationale for keeping this a plain record rather than a class hierarchy.

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    Sleep,
    Idle,
    Active,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sleep => "sleep",
            Self::Idle => "idle",
            Self::Active => "active",
        }
    }
}

/// A state transition with a monotonic sequence number, broadcast to status
/// subscribers.
#[derive(Debug, Clone)]
pub struct StateChangeEvent {
    pub prev: CoordinatorState,
    pub next: CoordinatorState,
    pub seq: u64,
}

/// What the coordinator actor should do as a result of a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    None,
    StartTimers,
    StopTimers,
    StopTimersAndCompact,
}

pub struct StateMachine {
    state: CoordinatorState,
    last_activity_at: Instant,
    idle_since: Option<Instant>,
    seq: u64,
}

impl StateMachine {
    pub fn new(now: Instant) -> Self {
        Self { state: CoordinatorState::Sleep, last_activity_at: now, idle_since: None, seq: 0 }
    }

    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    pub fn last_activity_at(&self) -> Instant {
        self.last_activity_at
    }

    /// Chat ingress, successful vibe execution, or explicit speech. Refreshes
    /// activity and wakes from sleep if necessary.
    pub fn on_activity(&mut self, now: Instant) -> (Option<StateChangeEvent>, SideEffect) {
        self.last_activity_at = now;
        self.idle_since = None;
        if self.state == CoordinatorState::Sleep {
            return self.transition(CoordinatorState::Active, SideEffect::StartTimers);
        }
        if self.state == CoordinatorState::Idle {
            return self.transition(CoordinatorState::Active, SideEffect::None);
        }
        (None, SideEffect::None)
    }

    /// Explicit `wake` -- same effect as activity but callable even when no
    /// message/speech accompanies it.
    pub fn wake(&mut self, now: Instant) -> (Option<StateChangeEvent>, SideEffect) {
        self.on_activity(now)
    }

    /// Sleep-check ticker fire (10s cadence). Evaluates the active->idle and
    /// idle->sleep thresholds.
    pub fn tick(
        &mut self,
        now: Instant,
        idle_after: std::time::Duration,
        sleep_after_idle: std::time::Duration,
    ) -> (Option<StateChangeEvent>, SideEffect) {
        match self.state {
            CoordinatorState::Active => {
                if now.saturating_duration_since(self.last_activity_at) >= idle_after {
                    self.idle_since = Some(now);
                    return self.transition(CoordinatorState::Idle, SideEffect::None);
                }
                (None, SideEffect::None)
            }
            CoordinatorState::Idle => {
                let since = self.idle_since.unwrap_or(now);
                if now.saturating_duration_since(since) >= sleep_after_idle {
                    return self.transition(CoordinatorState::Sleep, SideEffect::StopTimersAndCompact);
                }
                (None, SideEffect::None)
            }
            CoordinatorState::Sleep => (None, SideEffect::None),
        }
    }

    /// `stop()` -- force sleep without compacting. Cancels all timers and
    /// marks state sleep, but does not abort an in-flight gateway call. This
    /// is the external halt, distinct from [`Self::sleep_now`].
    pub fn stop(&mut self) -> (Option<StateChangeEvent>, SideEffect) {
        if self.state == CoordinatorState::Sleep {
            return (None, SideEffect::None);
        }
        self.transition(CoordinatorState::Sleep, SideEffect::StopTimers)
    }

    /// Force sleep because the autonomy engine itself decided to go quiet
    /// (e.g. a vibe turn replying `NO_REPLY`), compacting first -- entering
    /// sleep always attempts a context-compaction call on the gateway first.
    /// Every other path into sleep goes through here or through
    /// [`Self::tick`], never through `stop()`.
    pub fn sleep_now(&mut self) -> (Option<StateChangeEvent>, SideEffect) {
        if self.state == CoordinatorState::Sleep {
            return (None, SideEffect::None);
        }
        self.transition(CoordinatorState::Sleep, SideEffect::StopTimersAndCompact)
    }

    fn transition(
        &mut self,
        next: CoordinatorState,
        effect: SideEffect,
    ) -> (Option<StateChangeEvent>, SideEffect) {
        if next == self.state {
            return (None, SideEffect::None);
        }
        let prev = self.state;
        self.state = next;
        self.seq += 1;
        (Some(StateChangeEvent { prev, next, seq: self.seq }), effect)
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;

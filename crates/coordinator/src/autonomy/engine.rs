// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomy engine: the pluggable {vibe, plan, none} policy that keeps the
//! agent occupied between chat bursts. A pure state-and-logic struct -- the
//! coordinator actor owns the actual `tokio::time::sleep` deadlines and calls
//! back into this struct to decide what to do, keeping the single-writer
//! rule intact. Nudge-payload framing follows a delay-then-send encoder
//! pattern, and the "skip if busy" check reads the dispatcher's `busy` flag
//! without holding any lock across the read, the same snapshot/iterate
//! discipline a background health checker would use.

use std::time::Duration;

use tokio::time::Instant;

use crate::autonomy::state_machine::CoordinatorState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutonomyMode {
    Vibe,
    Plan,
    None,
}

impl AutonomyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vibe => "vibe",
            Self::Plan => "plan",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Done,
}

#[derive(Debug, Clone)]
pub struct Step {
    pub description: String,
    pub status: StepStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanStatus {
    Active,
    Completed,
    Abandoned,
}

#[derive(Debug, Clone)]
pub struct Plan {
    pub id: String,
    pub goal: String,
    pub steps: Vec<Step>,
    pub status: PlanStatus,
}

impl Plan {
    fn new(id: String, goal: String, steps: Vec<String>) -> Self {
        Self {
            id,
            goal,
            steps: steps
                .into_iter()
                .map(|description| Step { description, status: StepStatus::Pending })
                .collect(),
            status: PlanStatus::Active,
        }
    }

    fn all_done(&self) -> bool {
        self.steps.iter().all(|s| s.status == StepStatus::Done)
    }
}

#[derive(Debug)]
pub enum PlanError {
    NoActivePlan,
    StepOutOfRange,
}

impl std::fmt::Display for PlanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoActivePlan => write!(f, "no active plan"),
            Self::StepOutOfRange => write!(f, "step index out of range"),
        }
    }
}

impl std::error::Error for PlanError {}

/// Why a vibe or plan nudge didn't fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Sleeping,
    Busy,
    NoActivePlan,
}

/// Outcome of a vibe timer fire.
pub enum VibeOutcome {
    Skipped { reason: SkipReason, reschedule: bool },
    Fire { prompt: String },
}

/// Outcome of a plan-nudge deadline fire.
pub enum PlanNudgeOutcome {
    Skipped { reason: SkipReason },
    Fire { prompt: String },
}

/// What happened after a vibe or correction-eligible reply came back.
pub enum ReplyOutcome {
    Sleep,
    Misaligned { prompt: String },
    Reschedule,
}

const DEFAULT_VIBE_PROMPT: &str =
    "[CRAWD:VIBE] You are on a livestream … Respond with LIVESTREAM_REPLIED after using a tool, or NO_REPLY";

pub struct AutonomyEngine {
    mode: AutonomyMode,
    vibe_interval: Duration,
    plan_nudge_delay: Duration,
    vibe_prompt: String,
    plan: Option<Plan>,
    next_plan_id: u64,
}

impl AutonomyEngine {
    pub fn new(vibe_interval: Duration, plan_nudge_delay: Duration) -> Self {
        Self {
            mode: AutonomyMode::None,
            vibe_interval,
            plan_nudge_delay,
            vibe_prompt: DEFAULT_VIBE_PROMPT.to_owned(),
            plan: None,
            next_plan_id: 1,
        }
    }

    pub fn mode(&self) -> AutonomyMode {
        self.mode
    }

    /// Switch modes. The caller must cancel any pending timer of the
    /// outgoing mode before calling this; this call only updates
    /// engine-owned state, never double-schedules the old mode's timer.
    pub fn set_mode(&mut self, mode: AutonomyMode) {
        self.mode = mode;
    }

    pub fn set_vibe_prompt(&mut self, prompt: String) {
        self.vibe_prompt = prompt;
    }

    /// Apply a live config update to the vibe-timer cadence. Takes effect on
    /// the next `next_vibe_deadline` call; an already-armed deadline is not
    /// retroactively moved -- the caller reschedules it if needed.
    pub fn set_vibe_interval(&mut self, interval: Duration) {
        self.vibe_interval = interval;
    }

    /// Apply a live config update to the plan-nudge delay. Takes effect on
    /// the next deadline computed from `now`.
    pub fn set_plan_nudge_delay(&mut self, delay: Duration) {
        self.plan_nudge_delay = delay;
    }

    pub fn next_vibe_deadline(&self, now: Instant) -> Instant {
        now + self.vibe_interval
    }

    /// Evaluate a vibe-timer fire: skip while asleep or while the dispatcher
    /// is already busy with another turn, otherwise produce the vibe prompt.
    pub fn on_vibe_fire(&self, state: CoordinatorState, dispatcher_busy: bool) -> VibeOutcome {
        if state == CoordinatorState::Sleep {
            return VibeOutcome::Skipped { reason: SkipReason::Sleeping, reschedule: false };
        }
        if dispatcher_busy {
            return VibeOutcome::Skipped { reason: SkipReason::Busy, reschedule: true };
        }
        VibeOutcome::Fire { prompt: self.vibe_prompt.clone() }
    }

    /// Evaluate a vibe reply. `quiet` is true if any reply string classified
    /// as `quietAck` ("NO_REPLY"); `misaligned` carries the subset of
    /// replies that classified as non-protocol text.
    pub fn on_vibe_reply(&self, quiet: bool, misaligned: &[String]) -> ReplyOutcome {
        if quiet {
            return ReplyOutcome::Sleep;
        }
        if let Some(prompt) = render_misalignment_correction(misaligned) {
            return ReplyOutcome::Misaligned { prompt };
        }
        ReplyOutcome::Reschedule
    }

    /// `setPlan`. Returns the id of the plan abandoned to make room, if any,
    /// and the deadline for the first nudge.
    pub fn set_plan(&mut self, goal: String, steps: Vec<String>, now: Instant) -> (Option<String>, Instant) {
        let abandoned = self.plan.take().and_then(|mut old| {
            if old.status == PlanStatus::Active {
                old.status = PlanStatus::Abandoned;
                Some(old.id)
            } else {
                None
            }
        });

        let id = format!("plan-{}", self.next_plan_id);
        self.next_plan_id += 1;
        self.plan = Some(Plan::new(id, goal, steps));

        (abandoned, now + self.plan_nudge_delay)
    }

    /// `markStepDone`. Returns the deadline for the follow-up nudge unless
    /// the plan just completed.
    pub fn mark_step_done(&mut self, index: usize, now: Instant) -> Result<Option<Instant>, PlanError> {
        let plan = self.plan.as_mut().ok_or(PlanError::NoActivePlan)?;
        if plan.status != PlanStatus::Active {
            return Err(PlanError::NoActivePlan);
        }
        let step = plan.steps.get_mut(index).ok_or(PlanError::StepOutOfRange)?;
        step.status = StepStatus::Done;

        if plan.all_done() {
            plan.status = PlanStatus::Completed;
            return Ok(None);
        }
        Ok(Some(now + self.plan_nudge_delay))
    }

    pub fn abandon_plan(&mut self) {
        if let Some(plan) = self.plan.as_mut() {
            if plan.status == PlanStatus::Active {
                plan.status = PlanStatus::Abandoned;
            }
        }
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Evaluate a plan-nudge deadline fire. Nudges are skipped when the
    /// dispatcher is busy, the plan is no longer active, or state is sleep.
    pub fn on_plan_nudge_fire(
        &self,
        state: CoordinatorState,
        dispatcher_busy: bool,
    ) -> PlanNudgeOutcome {
        if state == CoordinatorState::Sleep {
            return PlanNudgeOutcome::Skipped { reason: SkipReason::Sleeping };
        }
        if dispatcher_busy {
            return PlanNudgeOutcome::Skipped { reason: SkipReason::Busy };
        }
        let Some(plan) = &self.plan else {
            return PlanNudgeOutcome::Skipped { reason: SkipReason::NoActivePlan };
        };
        if plan.status != PlanStatus::Active {
            return PlanNudgeOutcome::Skipped { reason: SkipReason::NoActivePlan };
        }
        PlanNudgeOutcome::Fire { prompt: render_plan_nudge(plan) }
    }
}

/// Render the `[CRAWD:PLAN]` nudge payload.
pub fn render_plan_nudge(plan: &Plan) -> String {
    let mut lines = vec!["[CRAWD:PLAN]".to_owned(), format!("Goal: {}", plan.goal)];
    let first_pending = plan.steps.iter().position(|s| s.status == StepStatus::Pending);
    for (i, step) in plan.steps.iter().enumerate() {
        let marker = match step.status {
            StepStatus::Done => "[x]",
            StepStatus::Pending if Some(i) == first_pending => "[-]",
            StepStatus::Pending => "[ ]",
        };
        let mut line = format!("{marker} {i}. {}", step.description);
        if Some(i) == first_pending {
            line.push_str("   <-- next");
        }
        lines.push(line);
    }
    lines.join("\n")
}

/// Render a `[CRAWD:MISALIGNED]` correction quoting up to 80 chars of each
/// bad reply. Returns `None` if nothing was misaligned.
pub fn render_misalignment_correction(misaligned: &[String]) -> Option<String> {
    if misaligned.is_empty() {
        return None;
    }
    let mut lines = vec!["[CRAWD:MISALIGNED]".to_owned()];
    for reply in misaligned {
        let quoted: String = reply.chars().take(80).collect();
        lines.push(format!("\"{quoted}\""));
    }
    Some(lines.join("\n"))
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;

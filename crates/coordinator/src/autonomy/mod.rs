// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Autonomy subsystem: the sleep/idle/active state machine (C3), the chat
//! batcher (C4), and the vibe/plan policy engine (C5).

pub mod batcher;
pub mod engine;
pub mod state_machine;

pub use batcher::{render_batch, Batch, ChatBatcher};
pub use engine::{AutonomyEngine, AutonomyMode, Plan, PlanError, Step, StepStatus};
pub use state_machine::{CoordinatorState, SideEffect, StateChangeEvent, StateMachine};

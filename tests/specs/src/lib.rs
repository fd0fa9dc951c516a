// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for the black-box scenario tests in `tests/scenarios.rs`.
//!
//! Builds a coordinator the same way `crates/coordinator/tests/http.rs`
//! does (`state::spawn` + `build_router` + `axum_test::TestServer`, no real
//! TCP) and adds a [`RecordingGateway`] test double that records every
//! prompt it was asked to trigger, so a scenario can assert on prompt
//! content (the `[CRAWD:CHAT]`/`[CRAWD:PLAN]`/`[CRAWD:MISALIGNED]` framing)
//! instead of only on coordinator state.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use tokio_util::sync::CancellationToken;

use crawd_coordinator::chat::{short_id_from, ChatMessage, ChatMultiplexer, Platform, PlatformMeta};
use crawd_coordinator::config::CoordinatorConfig;
use crawd_coordinator::gateway::{AgentReply, GatewayError, TriggerAgent};
use crawd_coordinator::state::{self, CoordinatorHandle};
use crawd_coordinator::transport::build_router;

/// Build a chat message arriving at `arrived_at_ms`, for scenarios that need
/// precise control over `render_batch`'s age computation.
pub fn test_message(label: &str, arrived_at_ms: u64) -> ChatMessage {
    let id = format!("test-{label}");
    let short_id = short_id_from(&id);
    ChatMessage {
        id,
        short_id,
        platform: Platform::Pumpfun,
        username: "scenario".to_owned(),
        body: label.to_owned(),
        arrived_at_ms,
        meta: PlatformMeta::default(),
    }
}

/// A gateway that records every prompt it's asked to trigger and always
/// replies with an empty turn, unless [`CoordinatorHandle::mock_turn`] has
/// scripted something first (that scripting happens in front of this
/// gateway, via the coordinator's own `MockGateway` wrapper).
pub struct RecordingGateway {
    prompts: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self { prompts: Mutex::new(Vec::new()) }
    }

    /// Prompts passed to `trigger`, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TriggerAgent for RecordingGateway {
    async fn trigger(&self, message: &str) -> Result<AgentReply, GatewayError> {
        self.prompts.lock().unwrap().push(message.to_owned());
        Ok(Vec::new())
    }
}

/// A config with every timer pushed out to an hour, for scenarios that
/// drive specific timers explicitly via `tokio::time::advance` and don't
/// want an unrelated one racing their assertions.
pub fn quiet_config() -> CoordinatorConfig {
    CoordinatorConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
        batch_window_ms: 3_600_000,
        startup_grace_ms: 0,
        vibe_interval_ms: 3_600_000,
        plan_nudge_delay_ms: 3_600_000,
        sleep_check_ms: 3_600_000,
        idle_after_ms: 3_600_000,
        sleep_after_idle_ms: 3_600_000,
        ack_timeout_ms: 3_600_000,
        ..CoordinatorConfig::default()
    }
}

/// A running coordinator plus the two ways a scenario can observe it: the
/// HTTP/WS surface (`server`) and the raw prompts its gateway received
/// (`gateway`). `handle` gives direct access to the tool-call surface
/// (`talk`, `set_plan`, ...) that has no HTTP equivalent -- plan operations
/// are agent tool calls, serialized with state transitions, not
/// control-plane HTTP routes.
pub struct Scenario {
    pub handle: CoordinatorHandle,
    pub server: TestServer,
    pub gateway: Arc<RecordingGateway>,
}

/// Stand up a coordinator with `config`, wiring a [`RecordingGateway`] in
/// behind the scenes so tests can inspect what prompts were sent.
pub fn start(config: CoordinatorConfig) -> Scenario {
    let gateway = Arc::new(RecordingGateway::new());
    let multiplexer = Arc::new(ChatMultiplexer::new());
    let handle = state::spawn(
        config,
        Arc::clone(&gateway) as Arc<dyn TriggerAgent>,
        multiplexer,
        CancellationToken::new(),
    );
    let server = TestServer::new(build_router(handle.clone())).expect("create test server");
    Scenario { handle, server, gateway }
}

/// Poll `GET /coordinator/status` until `state` matches `want`, or panic
/// after `attempts` tries spaced `step_ms` apart. Mirrors
/// `crates/coordinator/tests/http.rs`'s own poll-for-state-transition style.
pub async fn wait_for_state(server: &TestServer, want: &str, attempts: u32, step_ms: u64) {
    for _ in 0..attempts {
        let status: serde_json::Value = server.get("/coordinator/status").await.json();
        if status["state"] == want {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(step_ms)).await;
    }
    panic!("coordinator state never reached {want:?}");
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Black-box scenario tests covering the coordinator's end-to-end behaviors.
//!
//! Each test drives the coordinator only through its public surfaces
//! (`CoordinatorHandle`, the HTTP router) and asserts on observable output:
//! `GET /coordinator/status`, the prompts a [`coordinator_specs::RecordingGateway`]
//! recorded, and `SpeechGate::pending_count`. None of them reach into actor-
//! internal state.

use std::time::Duration;

use axum::http::StatusCode;
use crawd_coordinator::autonomy::AutonomyMode;
use crawd_coordinator::state;

use coordinator_specs::{quiet_config, start, test_message, wait_for_state};

/// S1 - Leading-edge batch: `m1(t=0), m2(t=5s), m3(t=18s)` with a 20s window
/// dispatches `B1=[m1]` immediately and `B2=[m2,m3]` at t=20000.
///
/// The batcher's window deadline runs on tokio's virtual clock (driven here
/// with `start_paused` + `advance`), but `render_batch`'s rendered age comes
/// from wall-clock `arrived_at_ms`, which a paused virtual clock does not
/// move. So messages are timestamped relative to the real `epoch_ms()`
/// captured at the top of the test, backdated by the age the scenario
/// wants rendered, rather than forward from a virtual `t=0`.
#[tokio::test(start_paused = true)]
async fn s1_leading_edge_batch() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        batch_window_ms: 20_000,
        startup_grace_ms: 3_600_000,
        ..quiet_config()
    };
    let scenario = start(config);
    let base = state::epoch_ms();

    // m1: leading-edge dispatch, age ~0s.
    scenario.handle.ingest_chat(test_message("m1", base));
    tokio::time::advance(Duration::from_millis(1)).await;

    let prompts = scenario.gateway.prompts();
    assert_eq!(prompts.len(), 1, "m1 should dispatch immediately as B1");
    assert!(
        prompts[0].starts_with("[CRAWD:CHAT - 1 message]"),
        "unexpected B1 header: {}",
        prompts[0]
    );

    // m2 arrives 5s into the window (backdated 15s from "now" by the time
    // the window flushes at t=20s); m3 arrives at t=18s (backdated ~2s).
    scenario.handle.ingest_chat(test_message("m2", base.saturating_sub(15_000)));
    scenario.handle.ingest_chat(test_message("m3", base.saturating_sub(2_000)));

    // Advance past the 20s window deadline opened by m1.
    tokio::time::advance(Duration::from_millis(20_100)).await;

    let prompts = scenario.gateway.prompts();
    assert_eq!(prompts.len(), 2, "m2+m3 should flush together as B2");
    assert!(
        prompts[1].starts_with("[CRAWD:CHAT - 2 messages, 15s]"),
        "unexpected B2 header: {}",
        prompts[1]
    );
    assert!(prompts[1].contains("m2"));
    assert!(prompts[1].contains("m3"));
}

/// S2 - Wake on chat: starting asleep, one chat message wakes the
/// coordinator and dispatches exactly one batch; nothing else gets
/// triggered alongside it (autonomy mode defaults to `none`, so no vibe
/// turn is ever armed by the wake).
#[tokio::test]
async fn s2_wake_on_chat() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        batch_window_ms: 30,
        startup_grace_ms: 0,
        ..quiet_config()
    };
    let scenario = start(config);

    let status = scenario.server.get("/coordinator/status").await;
    assert_eq!(status.json::<serde_json::Value>()["state"], "sleep");

    scenario.handle.ingest_chat(test_message("hello", state::epoch_ms()));
    wait_for_state(&scenario.server, "active", 50, 20).await;

    // Give the (already-flushed leading-edge) batch plenty of time to settle
    // and confirm no second invocation rides along with the wake.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(scenario.gateway.prompts().len(), 1, "wake should dispatch exactly one batch");
}

/// S3 - Idle then sleep: with short idle/sleep thresholds, activity decays
/// active -> idle -> sleep on schedule, and the sleep transition enqueues a
/// `/compact` turn.
#[tokio::test(start_paused = true)]
async fn s3_idle_then_sleep() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        idle_after_ms: 100,
        sleep_after_idle_ms: 100,
        sleep_check_ms: 20,
        ..quiet_config()
    };
    let scenario = start(config);

    scenario.handle.ingest_chat(test_message("hi", state::epoch_ms()));
    wait_for_state(&scenario.server, "active", 50, 5).await;

    tokio::time::advance(Duration::from_millis(150)).await;
    wait_for_state(&scenario.server, "idle", 50, 5).await;

    tokio::time::advance(Duration::from_millis(150)).await;
    wait_for_state(&scenario.server, "sleep", 50, 5).await;

    assert!(
        scenario.gateway.prompts().iter().any(|p| p == "/compact"),
        "sleep transition should enqueue a /compact turn"
    );
}

/// S4 - Plan nudge loop: setting a plan and marking a step done produces a
/// `[CRAWD:PLAN]` nudge within the configured delay, reflecting the
/// just-updated step statuses.
#[tokio::test]
async fn s4_plan_nudge_loop() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        plan_nudge_delay_ms: 30,
        ..quiet_config()
    };
    let scenario = start(config);

    scenario
        .handle
        .set_plan("Check BTC".to_owned(), vec!["A".to_owned(), "B".to_owned(), "C".to_owned()])
        .await;
    scenario.handle.mark_step_done(0).await.expect("step 0 exists");

    tokio::time::sleep(Duration::from_millis(200)).await;

    let prompts = scenario.gateway.prompts();
    let nudge = prompts.last().expect("a plan nudge should have been sent");
    assert!(nudge.starts_with("[CRAWD:PLAN]"));
    assert!(nudge.contains("Check BTC"));
    assert!(nudge.contains("[x] 0. A"));
    assert!(nudge.contains("[-] 1. B"));
    assert!(nudge.contains("<-- next"));
    assert!(nudge.contains("[ ] 2. C"));
}

/// S5 - Ack gate: a `talk` call that never receives an overlay ack still
/// resolves, fail-open, once the ack timeout elapses, and its pending-ack
/// entry is gone afterward.
#[tokio::test(start_paused = true)]
async fn s5_ack_gate_fails_open_on_timeout() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        ack_timeout_ms: 200,
        ..quiet_config()
    };
    let scenario = start(config);

    let handle = scenario.handle.clone();
    let talk = tokio::spawn(async move { handle.talk("hello chat").await });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(scenario.handle.speech.pending_count().await, 1);

    tokio::time::advance(Duration::from_millis(250)).await;
    let result = talk.await.expect("talk task should not panic");
    assert!(result.spoken, "fail-open timeout should still report spoken:true");
    assert_eq!(scenario.handle.speech.pending_count().await, 0);
}

/// S6 - Misalignment correction: a scripted non-protocol reply to a chat
/// batch produces a `[CRAWD:MISALIGNED]` correction quoting it, and the
/// coordinator stays active throughout.
#[tokio::test]
async fn s6_misalignment_correction() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        batch_window_ms: 30,
        startup_grace_ms: 0,
        ..quiet_config()
    };
    let scenario = start(config);

    let resp = scenario
        .server
        .post("/mock/turn")
        .json(&serde_json::json!({
            "username": "viewer1",
            "message": "are you there?",
            "response": ["sure thing!"],
        }))
        .await;
    resp.assert_status(StatusCode::OK);

    wait_for_state(&scenario.server, "active", 50, 20).await;

    let mut found = false;
    for _ in 0..50 {
        if scenario
            .gateway
            .prompts()
            .iter()
            .any(|p| p.starts_with("[CRAWD:MISALIGNED]") && p.contains("sure thing!"))
        {
            found = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(found, "expected a misalignment correction quoting the scripted reply");

    let status = scenario.server.get("/coordinator/status").await;
    assert_eq!(status.json::<serde_json::Value>()["state"], "active");
}

/// S7 - NO_REPLY sleeps the bot: a vibe turn answered with `NO_REPLY` puts
/// the coordinator to sleep and enqueues a `/compact`; a following chat
/// message wakes it back up.
#[tokio::test]
async fn s7_no_reply_sleeps_the_bot() {
    let config = crawd_coordinator::config::CoordinatorConfig {
        vibe_interval_ms: 30,
        batch_window_ms: 30,
        startup_grace_ms: 0,
        ..quiet_config()
    };
    let scenario = start(config);

    scenario.handle.ingest_chat(test_message("hi", state::epoch_ms()));
    wait_for_state(&scenario.server, "active", 50, 20).await;

    scenario.handle.set_mode(AutonomyMode::Vibe);
    scenario.handle.mock_gateway.push_scripted(vec!["NO_REPLY".to_owned()]).await;

    wait_for_state(&scenario.server, "sleep", 50, 20).await;

    assert!(
        scenario.gateway.prompts().iter().any(|p| p == "/compact"),
        "NO_REPLY sleep transition should enqueue a /compact turn"
    );

    scenario.handle.ingest_chat(test_message("you there?", state::epoch_ms()));
    wait_for_state(&scenario.server, "active", 50, 20).await;
}

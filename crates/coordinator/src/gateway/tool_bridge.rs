// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-invoke bridge (`node.invoke.request`/`node.invoke.result`). The
//! agent's tool surface (talk, reply, plan management) arrives as inbound
//! gateway events rather than HTTP, since the gateway connection is the
//! agent's only channel back to the coordinator.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use super::persistent::PersistentGateway;
use crate::autonomy::engine::PlanError;
use crate::error::CoordinatorError;
use crate::overlay::ChatRef;
use crate::state::CoordinatorHandle;

/// Spawn the bridge task. No-op if `gateway` is not a [`PersistentGateway`];
/// the one-shot transport has no inbound port to take invokes from.
pub fn spawn(gateway: Arc<PersistentGateway>, handle: CoordinatorHandle) {
    tokio::spawn(async move {
        let Some(mut invokes) = gateway.take_invokes().await else {
            return;
        };
        while let Some(req) = invokes.recv().await {
            let gateway = Arc::clone(&gateway);
            let handle = handle.clone();
            tokio::spawn(async move {
                let result = dispatch(&handle, &req.command, &req.params_json).await;
                if let Err(ref err) = result {
                    warn!(command = %req.command, error = %err, "tool invoke failed");
                }
                gateway.reply_invoke(req.id, req.node_id, result).await;
            });
        }
    });
}

#[derive(Deserialize)]
struct TalkParams {
    message: String,
}

#[derive(Deserialize)]
struct ReplyParams {
    message: String,
    username: String,
    chat_message: String,
}

#[derive(Deserialize)]
struct SetPlanParams {
    goal: String,
    steps: Vec<String>,
}

#[derive(Deserialize)]
struct MarkStepDoneParams {
    index: usize,
}

fn plan_error_body(err: PlanError) -> String {
    let coord_err = match err {
        PlanError::NoActivePlan => CoordinatorError::PlanNotFound,
        PlanError::StepOutOfRange => CoordinatorError::StepOutOfRange,
    };
    json!(coord_err.to_error_body(err.to_string())).to_string()
}

async fn dispatch(
    handle: &CoordinatorHandle,
    command: &str,
    params_json: &str,
) -> Result<String, String> {
    match command {
        "talk" => {
            let params: TalkParams = parse(params_json)?;
            let result = handle.talk(&params.message).await;
            Ok(json!(result).to_string())
        }
        "reply" => {
            let params: ReplyParams = parse(params_json)?;
            let chat = ChatRef { username: params.username, message: params.chat_message };
            let result = handle.reply(&params.message, chat).await;
            Ok(json!(result).to_string())
        }
        "setPlan" => {
            let params: SetPlanParams = parse(params_json)?;
            let plan = handle.set_plan(params.goal, params.steps).await;
            Ok(json!(plan).to_string())
        }
        "markStepDone" => {
            let params: MarkStepDoneParams = parse(params_json)?;
            match handle.mark_step_done(params.index).await {
                Ok(plan) => Ok(json!(plan).to_string()),
                Err(err) => Err(plan_error_body(err)),
            }
        }
        "abandonPlan" => {
            handle.abandon_plan();
            Ok(json!({"ok": true}).to_string())
        }
        "getPlan" => Ok(json!(handle.get_plan().await).to_string()),
        other => Err(format!("unknown tool command: {other}")),
    }
}

fn parse<T: for<'de> Deserialize<'de>>(params_json: &str) -> Result<T, String> {
    serde_json::from_str(params_json).map_err(|err| format!("invalid tool params: {err}"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::chat::ChatMultiplexer;
    use crate::config::CoordinatorConfig;
    use crate::gateway::{GatewayError, TriggerAgent};
    use crate::state;

    struct StubGateway;

    #[async_trait::async_trait]
    impl TriggerAgent for StubGateway {
        async fn trigger(&self, _message: &str) -> Result<AgentReply, GatewayError> {
            Ok(vec!["NO_REPLY".to_owned()])
        }
    }

    fn test_handle() -> CoordinatorHandle {
        let gateway: Arc<dyn TriggerAgent> = Arc::new(StubGateway);
        let multiplexer = Arc::new(ChatMultiplexer::new());
        state::spawn(CoordinatorConfig::default(), gateway, multiplexer, CancellationToken::new())
    }

    #[tokio::test]
    async fn set_plan_then_get_plan_round_trips_through_dispatch() {
        let handle = test_handle();
        let params = serde_json::json!({ "goal": "win the stream", "steps": ["a", "b"] }).to_string();
        let created = dispatch(&handle, "setPlan", &params).await.expect("setPlan succeeds");
        assert!(created.contains("win the stream"));

        let fetched = dispatch(&handle, "getPlan", "{}").await.expect("getPlan succeeds");
        assert!(fetched.contains("win the stream"));
    }

    #[tokio::test]
    async fn mark_step_done_out_of_range_surfaces_as_error_payload() {
        let handle = test_handle();
        let params = serde_json::json!({ "goal": "g", "steps": ["only-step"] }).to_string();
        dispatch(&handle, "setPlan", &params).await.expect("setPlan succeeds");

        let err = dispatch(&handle, "markStepDone", &serde_json::json!({ "index": 9 }).to_string())
            .await
            .expect_err("out-of-range index should error");
        assert!(err.contains("step index out of range"));
    }

    #[tokio::test]
    async fn unknown_command_is_rejected() {
        let handle = test_handle();
        let err = dispatch(&handle, "doTheDishes", "{}").await.expect_err("unknown command errors");
        assert!(err.contains("doTheDishes"));
    }
}

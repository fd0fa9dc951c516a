// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP handlers for the coordinator's control surface.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::chat::{AdapterStatus, ChatMessage, Platform, PlatformMeta};
use crate::config::PartialCoordinatorConfig;
use crate::error::{CoordinatorError, ErrorResponse};
use crate::overlay::OverlayEvent;
use crate::state::{epoch_ms, ConfigSnapshot, CoordinatorHandle, PlanSnapshot, StatusSnapshot};

type ApiResult<T> = Result<Json<T>, (axum::http::StatusCode, Json<ErrorResponse>)>;

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub ok: bool,
}

const OK: Json<OkResponse> = Json(OkResponse { ok: true });

#[derive(Debug, Deserialize)]
pub struct TalkRequest {
    pub message: String,
}

/// `POST /crawd/talk`.
pub async fn talk(
    State(handle): State<CoordinatorHandle>,
    Json(body): Json<TalkRequest>,
) -> ApiResult<OkResponse> {
    if body.message.trim().is_empty() {
        return Err(CoordinatorError::BadRequest.to_http_response("message must not be empty"));
    }
    handle.talk(&body.message).await;
    Ok(OK)
}

#[derive(Debug, Serialize)]
pub struct ChatStatusResponse {
    pub connected: Vec<String>,
    pub adapters: Vec<AdapterStatusResponse>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStatusResponse {
    pub key: String,
    pub connected: bool,
    pub attempts: u32,
}

impl From<(String, AdapterStatus)> for AdapterStatusResponse {
    fn from((key, status): (String, AdapterStatus)) -> Self {
        Self { key, connected: status.connected, attempts: status.attempts }
    }
}

/// `GET /chat/status`: per-adapter backoff attempt counts alongside the
/// connected-keys list.
pub async fn chat_status(State(handle): State<CoordinatorHandle>) -> Json<ChatStatusResponse> {
    Json(ChatStatusResponse {
        connected: handle.connected_adapters(),
        adapters: handle.adapter_statuses().into_iter().map(AdapterStatusResponse::from).collect(),
    })
}

/// `GET /coordinator/status`.
pub async fn coordinator_status(State(handle): State<CoordinatorHandle>) -> Json<StatusSnapshot> {
    Json(handle.status().await)
}

#[derive(Debug, Serialize)]
pub struct EventsResponse {
    pub events: Vec<OverlayEvent>,
}

/// `GET /coordinator/events`: a debug-only snapshot of recent lifecycle
/// events, not a substitute for `/ws/overlay`.
pub async fn coordinator_events(State(handle): State<CoordinatorHandle>) -> Json<EventsResponse> {
    Json(EventsResponse { events: handle.overlay.recent_events() })
}

/// `POST /coordinator/config`.
pub async fn update_config(
    State(handle): State<CoordinatorHandle>,
    Json(partial): Json<PartialCoordinatorConfig>,
) -> Json<ConfigSnapshot> {
    Json(handle.update_config(partial).await)
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub plan: Option<PlanSnapshot>,
}

/// `GET /plan`. `null` when no plan has been set -- a normal idle state,
/// not an error.
pub async fn get_plan(State(handle): State<CoordinatorHandle>) -> Json<PlanResponse> {
    Json(PlanResponse { plan: handle.get_plan().await })
}

#[derive(Debug, Deserialize)]
pub struct MockChatRequest {
    pub username: String,
    pub message: String,
}

/// `POST /mock/chat`: ingest a fixture chat message through the same path a
/// real adapter uses.
pub async fn mock_chat(
    State(handle): State<CoordinatorHandle>,
    Json(body): Json<MockChatRequest>,
) -> ApiResult<OkResponse> {
    if body.message.trim().is_empty() {
        return Err(CoordinatorError::BadRequest.to_http_response("message must not be empty"));
    }
    handle.ingest_chat(mock_message(body.username, body.message));
    Ok(OK)
}

#[derive(Debug, Deserialize)]
pub struct MockTurnRequest {
    pub username: String,
    pub message: String,
    pub response: Vec<String>,
}

/// `POST /mock/turn`: script the gateway's next reply before ingesting the
/// fixture chat message meant to trigger it.
pub async fn mock_turn(
    State(handle): State<CoordinatorHandle>,
    Json(body): Json<MockTurnRequest>,
) -> ApiResult<OkResponse> {
    if body.message.trim().is_empty() {
        return Err(CoordinatorError::BadRequest.to_http_response("message must not be empty"));
    }
    handle.mock_turn(mock_message(body.username, body.message), body.response).await;
    Ok(OK)
}

fn mock_message(username: String, body: String) -> ChatMessage {
    let id = uuid::Uuid::new_v4().to_string();
    let short_id = crate::chat::short_id_from(&id);
    ChatMessage {
        id,
        short_id,
        platform: Platform::Pumpfun,
        username,
        body,
        arrived_at_ms: epoch_ms(),
        meta: PlatformMeta::default(),
    }
}

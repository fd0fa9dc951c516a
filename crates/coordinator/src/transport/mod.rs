// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP + WebSocket transport for the coordinator.

pub mod http;
pub mod ws;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::CoordinatorHandle;

/// Build the axum `Router` exposing the coordinator's HTTP and `/ws/overlay`
/// surfaces, sharing one [`CoordinatorHandle`] as state.
pub fn build_router(handle: CoordinatorHandle) -> Router {
    Router::new()
        .route("/crawd/talk", post(http::talk))
        .route("/chat/status", get(http::chat_status))
        .route("/coordinator/status", get(http::coordinator_status))
        .route("/coordinator/config", post(http::update_config))
        .route("/coordinator/events", get(http::coordinator_events))
        .route("/plan", get(http::get_plan))
        .route("/mock/chat", post(http::mock_chat))
        .route("/mock/turn", post(http::mock_turn))
        .route("/ws/overlay", get(ws::ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(handle)
}

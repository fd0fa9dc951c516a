// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `GET /ws/overlay`: fan out [`OverlayEvent`]s to every connected overlay
//! client and accept the two inbound frames it sends back (`crawd:talk:done`,
//! `crawd:mock-chat`). A per-connection select loop (server -> client,
//! client -> server), using a `broadcast::Receiver` rather than a per-client
//! mpsc since every overlay client sees the same event stream.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::overlay::OverlayInbound;
use crate::state::CoordinatorHandle;

pub async fn ws_handler(
    State(handle): State<CoordinatorHandle>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, handle))
}

async fn handle_ws(socket: WebSocket, handle: CoordinatorHandle) {
    let mut events = handle.overlay.subscribe();
    let (mut tx, mut rx) = socket.split();

    loop {
        tokio::select! {
            _ = handle.shutdown.cancelled() => break,

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(text) = serde_json::to_string(&event) else { continue };
                        if tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => handle_inbound(&handle, &text).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    debug!("overlay client disconnected");
}

async fn handle_inbound(handle: &CoordinatorHandle, text: &str) {
    let Ok(inbound) = serde_json::from_str::<OverlayInbound>(text) else {
        return;
    };
    match inbound {
        OverlayInbound::TalkDone { id } => {
            handle.speech.ack(&id).await;
        }
        OverlayInbound::MockChat { username, message } => {
            handle.ingest_chat(mock_chat_message(username, message));
        }
    }
}

fn mock_chat_message(username: String, body: String) -> crate::chat::ChatMessage {
    let id = uuid::Uuid::new_v4().to_string();
    let short_id = crate::chat::short_id_from(&id);
    crate::chat::ChatMessage {
        id,
        short_id,
        platform: crate::chat::Platform::Pumpfun,
        username,
        body,
        arrived_at_ms: crate::state::epoch_ms(),
        meta: crate::chat::PlatformMeta::default(),
    }
}

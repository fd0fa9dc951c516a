// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent WS transport for the agent gateway.
//!
//! One long-lived connection, reconnected with exponential backoff on
//! disconnect: `tokio_tungstenite::connect_async` + `tokio::select!` over
//! cancel/read/write, with `backoff_ms = (backoff_ms * 2).min(max)` doubling,
//! same shape as the reconnect loop in `chat::multiplexer`, but holding a
//! single outstanding request rather than a per-client pending-request map
//! since there's only ever one caller here: the dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{AgentReply, GatewayError, TriggerAgent};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);
const PROTOCOL_VERSION: u32 = 3;

/// Client identity sent in the handshake.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    pub id: String,
    pub version: String,
}

/// An inbound `node.invoke.request` for the `talk` command. The persistent
/// variant additionally exposes this inbound-event port, used only by the
/// tool-invoke bridge; the one-shot transport has no equivalent since it
/// never stays connected long enough to receive one.
#[derive(Debug, Clone)]
pub struct ToolInvokeRequest {
    pub id: String,
    pub node_id: String,
    pub command: String,
    pub params_json: String,
}

/// Persistent WS client talking to the agent gateway.
pub struct PersistentGateway {
    url: String,
    auth_token: Option<String>,
    identity: ClientIdentity,
    session_key: String,
    outbound: tokio::sync::mpsc::UnboundedSender<OutboundCall>,
    invokes_tx: tokio::sync::mpsc::UnboundedSender<ToolInvokeRequest>,
    invokes_rx: Mutex<Option<tokio::sync::mpsc::UnboundedReceiver<ToolInvokeRequest>>>,
    cancel: CancellationToken,
}

struct OutboundCall {
    message: String,
    /// Present for calls that expect a correlated `result` frame back (i.e.
    /// `trigger`); absent for fire-and-forget frames like
    /// `node.invoke.result`, which carry their own correlation id but never
    /// get a reply of their own.
    pending: Option<(String, oneshot::Sender<Result<AgentReply, GatewayError>>)>,
}

impl PersistentGateway {
    pub fn connect(
        url: String,
        auth_token: Option<String>,
        identity: ClientIdentity,
        session_key: String,
    ) -> Arc<Self> {
        let cancel = CancellationToken::new();
        let (outbound_tx, outbound_rx) = tokio::sync::mpsc::unbounded_channel();
        let (invokes_tx, invokes_rx) = tokio::sync::mpsc::unbounded_channel();

        let gateway = Arc::new(Self {
            url,
            auth_token,
            identity,
            session_key,
            outbound: outbound_tx,
            invokes_tx,
            invokes_rx: Mutex::new(Some(invokes_rx)),
            cancel: cancel.clone(),
        });

        tokio::spawn(run_loop(Arc::clone(&gateway), cancel, outbound_rx));
        gateway
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Take the inbound `node.invoke.request` stream. Call once; the
    /// tool-invoke bridge task owns the receiver afterwards.
    pub async fn take_invokes(
        &self,
    ) -> Option<tokio::sync::mpsc::UnboundedReceiver<ToolInvokeRequest>> {
        self.invokes_rx.lock().await.take()
    }

    /// Reply to a `node.invoke.request` with `node.invoke.result`.
    pub async fn reply_invoke(&self, id: String, node_id: String, result: Result<String, String>) {
        let frame = match result {
            Ok(payload) => json!({
                "type": "node.invoke.result",
                "id": id,
                "nodeId": node_id,
                "ok": true,
                "payload": payload,
            }),
            Err(error) => json!({
                "type": "node.invoke.result",
                "id": id,
                "nodeId": node_id,
                "ok": false,
                "error": error,
            }),
        };
        let _ = self.outbound.send(OutboundCall { message: frame.to_string(), pending: None });
    }

    fn handshake_frame(&self) -> serde_json::Value {
        json!({
            "type": "handshake",
            "protocolVersion": {"min": PROTOCOL_VERSION, "max": PROTOCOL_VERSION},
            "client": {
                "id": self.identity.id,
                "version": self.identity.version,
                "platform": "node",
                "mode": "backend",
            },
            "commands": ["talk"],
            "auth": {"token": self.auth_token},
        })
    }
}

#[async_trait]
impl TriggerAgent for PersistentGateway {
    async fn trigger(&self, message: &str) -> Result<AgentReply, GatewayError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let idempotency_key = uuid::Uuid::new_v4().to_string();
        let frame = json!({
            "type": "req",
            "id": idempotency_key,
            "method": "agent",
            "params": {
                "message": message,
                "idempotencyKey": idempotency_key,
                "sessionKey": self.session_key,
            },
        });

        self.outbound
            .send(OutboundCall {
                message: frame.to_string(),
                pending: Some((idempotency_key, reply_tx)),
            })
            .map_err(|_| GatewayError::Transport("gateway connection task is gone".into()))?;

        reply_rx
            .await
            .map_err(|_| GatewayError::Transport("gateway reply channel dropped".into()))?
    }
}

#[derive(Deserialize)]
struct IncomingFrame {
    #[serde(default)]
    r#type: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "nodeId")]
    node_id: Option<String>,
    #[serde(default)]
    command: Option<String>,
    #[serde(default, rename = "paramsJSON")]
    params_json: Option<serde_json::Value>,
    #[serde(default)]
    payload: Option<PayloadEnvelope>,
    #[serde(default)]
    result: Option<ResultEnvelope>,
}

#[derive(Deserialize)]
struct PayloadEnvelope {
    #[serde(default)]
    status: Option<String>,
}

#[derive(Deserialize)]
struct ResultEnvelope {
    #[serde(default)]
    payloads: Vec<TextPayload>,
}

#[derive(Deserialize)]
struct TextPayload {
    text: String,
}

async fn run_loop(
    gateway: Arc<PersistentGateway>,
    cancel: CancellationToken,
    mut outbound_rx: tokio::sync::mpsc::UnboundedReceiver<OutboundCall>,
) {
    let mut backoff = INITIAL_BACKOFF;
    // A call waiting for its response is parked here, keyed by request id.
    // Mutex only because reconnect and the read loop both touch it; there's
    // never contention since the gateway serializes one call at a time.
    let pending: Arc<Mutex<HashMap<String, oneshot::Sender<Result<AgentReply, GatewayError>>>>> =
        Arc::new(Mutex::new(HashMap::new()));

    loop {
        if cancel.is_cancelled() {
            return;
        }

        match tokio_tungstenite::connect_async(&gateway.url).await {
            Ok((ws, _)) => {
                backoff = INITIAL_BACKOFF;
                debug!("persistent gateway connected");
                let (mut write, mut read) = ws.split();

                if write
                    .send(Message::Text(gateway.handshake_frame().to_string().into()))
                    .await
                    .is_err()
                {
                    continue;
                }

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        call = outbound_rx.recv() => {
                            match call {
                                Some(call) => {
                                    if let Some((id, reply_tx)) = call.pending {
                                        pending.lock().await.insert(id, reply_tx);
                                    }
                                    if write.send(Message::Text(call.message.into())).await.is_err() {
                                        warn!("persistent gateway write failed");
                                        break;
                                    }
                                }
                                None => return,
                            }
                        }
                        msg = read.next() => {
                            match msg {
                                Some(Ok(Message::Text(text))) => {
                                    handle_frame(&text, &pending, &gateway.invokes_tx).await;
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    debug!("persistent gateway closed");
                                    break;
                                }
                                Some(Err(err)) => {
                                    warn!(error = %err, "persistent gateway read error");
                                    break;
                                }
                                _ => {}
                            }
                        }
                    }
                }

                fail_all_pending(&pending).await;
            }
            Err(err) => {
                warn!(error = %err, backoff_secs = backoff.as_secs(), "gateway connect failed, retrying");
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

async fn handle_frame(
    text: &str,
    pending: &Arc<Mutex<HashMap<String, oneshot::Sender<Result<AgentReply, GatewayError>>>>>,
    invokes_tx: &tokio::sync::mpsc::UnboundedSender<ToolInvokeRequest>,
) {
    let Ok(frame) = serde_json::from_str::<IncomingFrame>(text) else {
        return;
    };

    if frame.r#type.as_deref() == Some("node.invoke.request") {
        if let (Some(id), Some(node_id), Some(command)) =
            (frame.id, frame.node_id, frame.command)
        {
            let params_json = frame.params_json.map(|v| v.to_string()).unwrap_or_default();
            let _ = invokes_tx.send(ToolInvokeRequest { id, node_id, command, params_json });
        }
        return;
    }

    let Some(id) = frame.id else { return };

    if let Some(payload) = &frame.payload {
        if payload.status.as_deref() == Some("accepted") {
            // Still running; keep waiting.
            return;
        }
    }

    let Some(result) = frame.result else { return };
    let mut guard = pending.lock().await;
    if let Some(sender) = guard.remove(&id) {
        let texts = result.payloads.into_iter().map(|p| p.text).collect();
        let _ = sender.send(Ok(texts));
    }
}

async fn fail_all_pending(
    pending: &Arc<Mutex<HashMap<String, oneshot::Sender<Result<AgentReply, GatewayError>>>>>,
) {
    let mut guard = pending.lock().await;
    for (_, sender) in guard.drain() {
        let _ = sender.send(Err(GatewayError::Transport("connection lost".into())));
    }
}

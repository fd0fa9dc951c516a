// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot WS transport for the agent gateway: a fresh connection per call,
//! closed after the final payload arrives. Shares the handshake/connect
//! logic of the persistent transport minus its reconnect loop, with a
//! short-lived client built fresh for every call instead of one long-lived
//! connection.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

use super::persistent::ClientIdentity;
use super::{AgentReply, GatewayError, TriggerAgent};

const PROTOCOL_VERSION: u32 = 3;

pub struct OneshotGateway {
    url: String,
    auth_token: Option<String>,
    identity: ClientIdentity,
    session_key: String,
    hard_timeout: Duration,
}

impl OneshotGateway {
    pub fn new(
        url: String,
        auth_token: Option<String>,
        identity: ClientIdentity,
        session_key: String,
        hard_timeout: Duration,
    ) -> Self {
        Self { url, auth_token, identity, session_key, hard_timeout }
    }
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum IncomingEvent {
    #[serde(rename = "connect.challenge")]
    ConnectChallenge { nonce: String },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ResponseFrame {
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

#[async_trait]
impl TriggerAgent for OneshotGateway {
    async fn trigger(&self, message: &str) -> Result<AgentReply, GatewayError> {
        tokio::time::timeout(self.hard_timeout, self.trigger_inner(message))
            .await
            .map_err(|_| GatewayError::Timeout)?
    }
}

impl OneshotGateway {
    async fn trigger_inner(&self, message: &str) -> Result<AgentReply, GatewayError> {
        let (ws, _) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;
        let (mut write, mut read) = ws.split();

        // Optional challenge handshake before the real one: some deployments
        // send `connect.challenge` first and expect it echoed back.
        let mut auth_token = self.auth_token.clone();
        if let Some(Ok(Message::Text(text))) =
            tokio::time::timeout(Duration::from_secs(5), read.next()).await.ok().flatten()
        {
            if let Ok(IncomingEvent::ConnectChallenge { nonce }) =
                serde_json::from_str::<IncomingEvent>(&text)
            {
                auth_token = Some(format!("{}:{nonce}", auth_token.unwrap_or_default()));
            }
        }

        let handshake = json!({
            "type": "handshake",
            "protocolVersion": {"min": PROTOCOL_VERSION, "max": PROTOCOL_VERSION},
            "client": {
                "id": self.identity.id,
                "version": self.identity.version,
                "platform": "node",
                "mode": "backend",
            },
            "commands": ["talk"],
            "auth": {"token": auth_token},
        });
        write
            .send(Message::Text(handshake.to_string().into()))
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let idempotency_key = uuid::Uuid::new_v4().to_string();
        let request = json!({
            "type": "req",
            "id": idempotency_key,
            "method": "agent",
            "params": {
                "message": message,
                "idempotencyKey": idempotency_key,
                "sessionKey": self.session_key,
            },
        });
        write
            .send(Message::Text(request.to_string().into()))
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        loop {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let Ok(frame) = serde_json::from_str::<ResponseFrame>(&text) else {
                        continue;
                    };
                    if let Some(payload) = &frame.payload {
                        if payload.status.as_deref() == Some("accepted") {
                            continue;
                        }
                    }
                    if let Some(result) = frame.result {
                        let _ = write.send(Message::Close(None)).await;
                        return Ok(result.payloads.into_iter().map(|p| p.text).collect());
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    return Err(GatewayError::Transport("connection closed before a result arrived".into()));
                }
                Some(Err(err)) => {
                    return Err(GatewayError::Transport(err.to_string()));
                }
                _ => {}
            }
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Overlay bus: broadcast hub for `crawd:*` channels plus the
//! `crawd:talk:done` / `crawd:mock-chat` inbound frames. A `broadcast::Sender`
//! with `subscribe`-per-connection fan-out, the same shape a status
//! aggregator uses to push live updates to many listeners at once.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::chat::ChatMessage;

/// How many recent events `GET /coordinator/events` can replay.
const EVENT_LOG_CAP: usize = 100;

/// Server -> subscriber frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload")]
pub enum OverlayEvent {
    #[serde(rename = "crawd:talk")]
    Talk { id: String, message: String },
    #[serde(rename = "crawd:reply-turn")]
    ReplyTurn { id: String, chat: ChatRef, bot_message: String },
    #[serde(rename = "crawd:chat")]
    Chat(ChatMessage),
    #[serde(rename = "crawd:status")]
    Status { status: String },
    #[serde(rename = "crawd:mcap")]
    Mcap { mcap: f64 },
    #[serde(rename = "crawd:plan")]
    Plan { r#type: String, plan_id: String, #[serde(skip_serializing_if = "Option::is_none")] goal: Option<String> },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRef {
    pub username: String,
    pub message: String,
}

/// Subscriber -> server frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "channel", content = "payload")]
pub enum OverlayInbound {
    #[serde(rename = "crawd:talk:done")]
    TalkDone { id: String },
    #[serde(rename = "crawd:mock-chat")]
    MockChat { username: String, message: String },
}

/// Fan-out hub for overlay events. One coordinator owns one hub; every
/// `/ws/overlay` connection subscribes to it. Also keeps a bounded log of
/// the most recent events for `GET /coordinator/events`, a debug snapshot
/// for a client that missed the live socket, not a replacement for it.
pub struct OverlayHub {
    tx: broadcast::Sender<OverlayEvent>,
    log: Mutex<VecDeque<OverlayEvent>>,
}

impl OverlayHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx, log: Mutex::new(VecDeque::with_capacity(EVENT_LOG_CAP)) }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OverlayEvent> {
        self.tx.subscribe()
    }

    /// Best-effort broadcast; no per-subscriber queueing beyond what the
    /// channel provides.
    pub fn emit(&self, event: OverlayEvent) {
        let mut log = self.log.lock().unwrap();
        if log.len() == EVENT_LOG_CAP {
            log.pop_front();
        }
        log.push_back(event.clone());
        drop(log);
        let _ = self.tx.send(event);
    }

    /// Snapshot of the most recent events, oldest first, for
    /// `GET /coordinator/events` (debug-only).
    pub fn recent_events(&self) -> Vec<OverlayEvent> {
        self.log.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for OverlayHub {
    fn default() -> Self {
        Self::new()
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Speech turn gate. Grounded on a correlation-id pending-request map
//! (`HashMap<String, PendingRequest>`, insert-on-send/remove-on-response) of
//! the kind an upstream WS bridge uses, generalized here to resolve a
//! `oneshot` completion handle instead of routing a response string, and its
//! orphaned-request handling adapted into the hard-timeout fail-open path.
//! `uuid::Uuid::new_v4()` for correlation ids, the same call-site style used
//! for session ids elsewhere in this crate.
//!
//! This gate holds no reference back to the coordinator: it only emits onto
//! the overlay port it's given and returns a result to its caller, who is
//! responsible for the activity refresh before calling in.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Mutex};
use tracing::warn;

use crate::overlay::{ChatRef, OverlayEvent, OverlayHub};

/// Result of a `talk`/`reply` tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct SpokenResult {
    pub spoken: bool,
}

pub struct SpeechGate {
    overlay: Arc<OverlayHub>,
    ack_timeout_ms: AtomicU64,
    pending: Arc<Mutex<HashMap<String, oneshot::Sender<()>>>>,
}

impl SpeechGate {
    pub fn new(overlay: Arc<OverlayHub>, ack_timeout: Duration) -> Self {
        Self {
            overlay,
            ack_timeout_ms: AtomicU64::new(ack_timeout.as_millis() as u64),
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Apply a live config update to the ack fail-open timeout. Stored as an
    /// atomic so this can be called through a shared `Arc<SpeechGate>`
    /// without a coordinator-side lock; only future `register` calls pick up
    /// the new value, an already-armed timer keeps its old deadline.
    pub fn set_ack_timeout(&self, timeout: Duration) {
        self.ack_timeout_ms.store(timeout.as_millis() as u64, Ordering::Relaxed);
    }

    fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms.load(Ordering::Relaxed))
    }

    /// `talk(text)`. Rejects empty text with `{spoken:false}` and otherwise
    /// suspends until ack or the hard timeout.
    pub async fn talk(&self, text: &str) -> SpokenResult {
        if text.trim().is_empty() {
            return SpokenResult { spoken: false };
        }
        let id = uuid::Uuid::new_v4().to_string();
        let rx = self.register(id.clone()).await;
        self.overlay.emit(OverlayEvent::Talk { id, message: text.to_owned() });
        let _ = rx.await;
        SpokenResult { spoken: true }
    }

    /// `reply(text, {username, message})`.
    pub async fn reply(&self, text: &str, chat: ChatRef) -> SpokenResult {
        if text.trim().is_empty() {
            return SpokenResult { spoken: false };
        }
        let id = uuid::Uuid::new_v4().to_string();
        let rx = self.register(id.clone()).await;
        self.overlay.emit(OverlayEvent::ReplyTurn { id, chat, bot_message: text.to_owned() });
        let _ = rx.await;
        SpokenResult { spoken: true }
    }

    /// Register a pending ack and arm its fail-open timer. Returns the
    /// receiver the caller suspends on.
    async fn register(&self, id: String) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id.clone(), tx);

        let pending = Arc::clone(&self.pending);
        let ack_timeout = self.ack_timeout();
        tokio::spawn(async move {
            tokio::time::sleep(ack_timeout).await;
            if let Some(tx) = pending.lock().await.remove(&id) {
                warn!(utterance_id = %id, "overlay ack timed out, resolving fail-open");
                let _ = tx.send(());
            }
        });

        rx
    }

    /// Resolve a pending ack from `crawd:talk:done {id}`. Returns `true` if
    /// an entry was still pending; an entry is resolved exactly once, by
    /// either this ack or the fail-open timer, never both.
    pub async fn ack(&self, id: &str) -> bool {
        match self.pending.lock().await.remove(id) {
            Some(tx) => {
                let _ = tx.send(());
                true
            }
            None => false,
        }
    }

    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }
}

#[cfg(test)]
#[path = "speech_tests.rs"]
mod tests;

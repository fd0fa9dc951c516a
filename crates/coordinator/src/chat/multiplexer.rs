// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Adapter registry and reconnect supervisor.
//!
//! Each registered adapter gets its own supervising task. A dropped
//! connection (an `Err` from `connect`, or an `AdapterEvent::Disconnected`)
//! triggers a reconnect with exponential backoff starting at 5s, doubling,
//! capped at 60s, giving up silently after 5 consecutive failures. A
//! `Connected` event resets the backoff state for that adapter. The backoff
//! update (`backoff = (backoff * 2).min(MAX_BACKOFF)`) and the
//! snapshot-then-iterate discipline for never holding a lock across an
//! `.await` follow the same pattern as an upstream WS reconnect loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::adapter::{AdapterEvent, ChatAdapter};
use super::message::ChatMessage;

const INITIAL_BACKOFF: Duration = Duration::from_secs(5);
const MAX_BACKOFF: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 5;

/// Normalized fan-in event delivered to the coordinator for every adapter.
#[derive(Debug, Clone)]
pub enum ChatEvent {
    Message(ChatMessage),
    AdapterUp(String),
    AdapterDown(String),
}

/// Per-adapter connection state exposed to `GET /chat/status`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdapterStatus {
    pub connected: bool,
    pub attempts: u32,
}

/// Owns a set of named adapters and runs one reconnect-supervised task per
/// adapter once [`ChatMultiplexer::connect_all`] is called.
pub struct ChatMultiplexer {
    adapters: HashMap<String, Arc<dyn ChatAdapter>>,
    shutdown: CancellationToken,
    connected: Arc<Mutex<HashMap<String, AdapterStatus>>>,
}

impl ChatMultiplexer {
    pub fn new() -> Self {
        Self {
            adapters: HashMap::new(),
            shutdown: CancellationToken::new(),
            connected: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn register_adapter(&mut self, key: impl Into<String>, adapter: Arc<dyn ChatAdapter>) {
        self.adapters.insert(key.into(), adapter);
    }

    /// Spawn a supervisor task per adapter. Every normalized event, across
    /// every adapter, is forwarded onto `out` from whichever task produced it
    /// -- callers never block waiting on a specific adapter.
    pub fn connect_all(&self, out: mpsc::UnboundedSender<ChatEvent>) {
        for (key, adapter) in &self.adapters {
            let key = key.clone();
            self.connected.lock().unwrap().insert(key.clone(), AdapterStatus::default());
            let adapter = Arc::clone(adapter);
            let out = out.clone();
            let shutdown = self.shutdown.clone();
            let connected = Arc::clone(&self.connected);
            tokio::spawn(async move { supervise(key, adapter, out, shutdown, connected).await });
        }
    }

    pub async fn disconnect_all(&self) {
        self.shutdown.cancel();
        for adapter in self.adapters.values() {
            adapter.disconnect().await;
        }
    }

    /// Keys of adapters currently connected, for `GET /chat/status`.
    pub fn connected_keys(&self) -> Vec<String> {
        self.connected
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, status)| status.connected)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Per-adapter connection state, for the richer `GET /chat/status` shape.
    pub fn adapter_statuses(&self) -> Vec<(String, AdapterStatus)> {
        self.connected
            .lock()
            .unwrap()
            .iter()
            .map(|(key, status)| (key.clone(), *status))
            .collect()
    }
}

impl Default for ChatMultiplexer {
    fn default() -> Self {
        Self::new()
    }
}

fn mark_down(connected: &Mutex<HashMap<String, AdapterStatus>>, key: &str) {
    if let Some(status) = connected.lock().unwrap().get_mut(key) {
        status.connected = false;
    }
}

async fn supervise(
    key: String,
    adapter: Arc<dyn ChatAdapter>,
    out: mpsc::UnboundedSender<ChatEvent>,
    shutdown: CancellationToken,
    connected: Arc<Mutex<HashMap<String, AdapterStatus>>>,
) {
    let mut backoff = INITIAL_BACKOFF;
    let mut attempts = 0u32;

    loop {
        if shutdown.is_cancelled() {
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let connect_key = key.clone();
        let connect_adapter = Arc::clone(&adapter);
        let connect = tokio::spawn(async move { connect_adapter.connect(tx).await });

        let mut saw_connected = false;
        let mut down_reported = false;
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                event = rx.recv() => {
                    match event {
                        Some(AdapterEvent::Connected) => {
                            saw_connected = true;
                            backoff = INITIAL_BACKOFF;
                            attempts = 0;
                            info!(adapter = %key, "chat adapter connected");
                            connected.lock().unwrap().insert(key.clone(), AdapterStatus { connected: true, attempts: 0 });
                            let _ = out.send(ChatEvent::AdapterUp(key.clone()));
                        }
                        Some(AdapterEvent::Message(msg)) => {
                            let _ = out.send(ChatEvent::Message(msg));
                        }
                        Some(AdapterEvent::Disconnected) => {
                            warn!(adapter = %key, "chat adapter disconnected");
                            mark_down(&connected, &key);
                            let _ = out.send(ChatEvent::AdapterDown(key.clone()));
                            down_reported = true;
                            break;
                        }
                        Some(AdapterEvent::Error(err)) => {
                            warn!(adapter = %key, error = %err, "chat adapter error");
                        }
                        None => break,
                    }
                }
            }
        }

        if saw_connected && !down_reported {
            mark_down(&connected, &key);
            let _ = out.send(ChatEvent::AdapterDown(key.clone()));
        }

        match connect.await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => warn!(adapter = %key, error = %err, "chat adapter connect failed"),
            Err(err) => warn!(adapter = %key, error = %err, "chat adapter task panicked"),
        }

        attempts += 1;
        connected.lock().unwrap().entry(key.clone()).or_default().attempts = attempts;
        if attempts >= MAX_ATTEMPTS {
            warn!(adapter = %key, attempts, "chat adapter giving up after repeated failures");
            return;
        }

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }
        backoff = (backoff * 2).min(MAX_BACKOFF);
    }
}

#[cfg(test)]
#[path = "multiplexer_tests.rs"]
mod tests;

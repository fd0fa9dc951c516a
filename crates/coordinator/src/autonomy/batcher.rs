// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Leading-edge chat batcher. A single-writer struct mutated only from the
//! coordinator task; its cooldown ticker follows the same
//! `tokio::time::interval` + `MissedTickBehavior` discipline used elsewhere
//! in this crate, here realized as an explicit deadline the coordinator actor
//! awaits, since the window needs to be cancelable/restartable rather than
//! fixed-period.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use crate::chat::ChatMessage;

/// A dispatched batch, ready to be rendered into an agent-facing prompt.
#[derive(Debug, Clone)]
pub struct Batch {
    pub messages: Vec<ChatMessage>,
}

/// Leading-edge throttle: the first message in a quiet period dispatches
/// immediately and opens a cooldown window; messages arriving inside the
/// window accumulate; on expiry a non-empty buffer flushes and restarts the
/// window. This can make one late message wait up to `2 * batchWindowMs`
/// before it's flushed -- intentional, not a bug to be fixed.
pub struct ChatBatcher {
    batch_window: Duration,
    startup_grace_ms: u64,
    recent_cap: usize,
    started_at_ms: u64,
    buffer: Vec<ChatMessage>,
    window_deadline: Option<Instant>,
    recent_messages: VecDeque<String>,
}

impl ChatBatcher {
    /// `started_at_ms` is wall-clock epoch milliseconds at coordinator
    /// startup, matching [`ChatMessage::arrived_at_ms`]'s units; window
    /// scheduling uses tokio's own monotonic clock via `Instant::now()`
    /// internally, so tests control it with `#[tokio::test(start_paused =
    /// true)]` + `tokio::time::advance`.
    pub fn new(
        batch_window: Duration,
        startup_grace: Duration,
        recent_cap: usize,
        started_at_ms: u64,
    ) -> Self {
        Self {
            batch_window,
            startup_grace_ms: startup_grace.as_millis() as u64,
            recent_cap,
            started_at_ms,
            buffer: Vec::new(),
            window_deadline: None,
            recent_messages: VecDeque::new(),
        }
    }

    /// Deadline the coordinator actor should await for cooldown expiry, if a
    /// window is currently open.
    pub fn window_deadline(&self) -> Option<Instant> {
        self.window_deadline
    }

    /// Apply a live config update to the batch window. Takes effect the next
    /// time a window is opened; a window already counting down keeps its old
    /// deadline.
    pub fn set_batch_window(&mut self, window: Duration) {
        self.batch_window = window;
    }

    /// Apply a live config update to the short-id recency cap, trimming the
    /// buffer immediately if it now exceeds the new cap.
    pub fn set_recent_cap(&mut self, cap: usize) {
        self.recent_cap = cap;
        while self.recent_messages.len() > self.recent_cap {
            self.recent_messages.pop_front();
        }
    }

    /// Ingest one message. Returns `Some(Batch)` if this message triggers an
    /// immediate leading-edge dispatch (i.e. no window was open).
    ///
    /// Messages older than `started_at_ms - startup_grace` are dropped.
    pub fn ingest(&mut self, message: ChatMessage) -> Option<Batch> {
        let age_cutoff = self.started_at_ms.saturating_sub(self.startup_grace_ms);
        if message.arrived_at_ms < age_cutoff {
            return None;
        }

        self.index_short_id(&message.short_id);

        if self.window_deadline.is_none() {
            self.window_deadline = Some(Instant::now() + self.batch_window);
            return Some(Batch { messages: vec![message] });
        }

        self.buffer.push(message);
        None
    }

    /// Called when `window_deadline` elapses. Flushes the buffer if
    /// non-empty and re-opens the window; otherwise closes it.
    pub fn on_window_expiry(&mut self) -> Option<Batch> {
        if self.buffer.is_empty() {
            self.window_deadline = None;
            return None;
        }
        let messages = std::mem::take(&mut self.buffer);
        self.window_deadline = Some(Instant::now() + self.batch_window);
        Some(Batch { messages })
    }

    fn index_short_id(&mut self, short_id: &str) {
        self.recent_messages.push_back(short_id.to_owned());
        while self.recent_messages.len() > self.recent_cap {
            self.recent_messages.pop_front();
        }
    }

    pub fn recent_messages(&self) -> impl Iterator<Item = &str> {
        self.recent_messages.iter().map(String::as_str)
    }
}

/// Render a batch into the stable, agent-facing format.
pub fn render_batch(batch: &Batch, now_ms: u64) -> String {
    let n = batch.messages.len();
    let noun = if n == 1 { "message" } else { "messages" };
    let oldest_age_s = batch
        .messages
        .iter()
        .map(|m| now_ms.saturating_sub(m.arrived_at_ms))
        .max()
        .map(|ms| (ms as f64 / 1000.0).round() as u64);

    let mut header = format!("[CRAWD:CHAT - {n} {noun}");
    if let Some(age) = oldest_age_s {
        if age > 0 {
            header.push_str(&format!(", {age}s"));
        }
    }
    header.push(']');

    let mut lines = vec![header];
    for msg in &batch.messages {
        let platform_tag = match msg.platform.tag() {
            Some(tag) => format!("[{tag}] "),
            None => String::new(),
        };
        lines.push(format!(
            "[{}] {}{}: {}",
            msg.short_id, platform_tag, msg.username, msg.body
        ));
    }
    if n > 1 {
        lines.push(
            "(To reply to a specific message, prefix with its ID: [msgId] your reply)".to_owned(),
        );
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "batcher_tests.rs"]
mod tests;

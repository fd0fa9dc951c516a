// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Chat adapter capability set.
//!
//! An adapter is a capability set rather than a base class: `connect`,
//! `disconnect`, `is_connected`, plus a normalized event stream, the same
//! shape as a WS bridge where one task drives the connection and events are
//! pushed onto a channel rather than returned from a blocking call.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::message::ChatMessage;

/// Events a [`ChatAdapter`] emits onto its normalized channel.
#[derive(Debug, Clone)]
pub enum AdapterEvent {
    Message(ChatMessage),
    Connected,
    Disconnected,
    Error(String),
}

/// A single chat source. Implementations own their own reconnect-free
/// connection lifecycle; the multiplexer (C1) owns backoff and retry.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    /// Establish the connection and spawn whatever background task(s) are
    /// needed to forward events on `events` until `disconnect` is called.
    async fn connect(&self, events: mpsc::UnboundedSender<AdapterEvent>) -> anyhow::Result<()>;

    /// Tear down the connection. Idempotent.
    async fn disconnect(&self);

    fn is_connected(&self) -> bool;
}

#[cfg(test)]
#[path = "adapter_tests.rs"]
pub(crate) mod tests;

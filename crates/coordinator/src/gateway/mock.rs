// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scriptable gateway wrapper backing `POST /mock/turn` and scenario tests
//! that need a specific reply on the next turn (e.g. `["sure thing!"]`,
//! `["NO_REPLY"]`). Every real deployment still wraps a concrete
//! [`super::TriggerAgent`]; when the script queue is empty calls fall
//! straight through.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{AgentReply, GatewayError, TriggerAgent};

pub struct MockGateway {
    inner: Arc<dyn TriggerAgent>,
    scripted: Mutex<VecDeque<AgentReply>>,
}

impl MockGateway {
    pub fn new(inner: Arc<dyn TriggerAgent>) -> Self {
        Self { inner, scripted: Mutex::new(VecDeque::new()) }
    }

    /// Queue a reply to be returned by the next `trigger` call instead of
    /// reaching the real gateway.
    pub async fn push_scripted(&self, response: AgentReply) {
        self.scripted.lock().await.push_back(response);
    }
}

#[async_trait]
impl TriggerAgent for MockGateway {
    async fn trigger(&self, message: &str) -> Result<AgentReply, GatewayError> {
        if let Some(reply) = self.scripted.lock().await.pop_front() {
            return Ok(reply);
        }
        self.inner.trigger(message).await
    }
}

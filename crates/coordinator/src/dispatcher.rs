// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent-turn dispatcher: the single queue every component funnels agent
//! invocations through, so at most one turn is ever in flight and ordering
//! is deterministic. The same serialize-everything-through-one-`run_loop`
//! shape as a single upstream connection handling one client request at a
//! time, generalized from "one request awaiting one response" to "one
//! thunk in flight at a time".

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::gateway::{AgentReply, GatewayError};

/// A single queued agent invocation. `run` is the thunk; `reply_tx`, if
/// present, is signaled with the `AgentReply` once the thunk resolves
/// successfully. A thunk that fails is logged and discarded -- the queue
/// moves on to the next entry.
pub struct DispatchJob {
    pub label: &'static str,
    pub run: Pin<Box<dyn Future<Output = Result<AgentReply, GatewayError>> + Send>>,
    pub reply_tx: Option<oneshot::Sender<AgentReply>>,
}

impl DispatchJob {
    pub fn new<F>(label: &'static str, run: F) -> Self
    where
        F: Future<Output = Result<AgentReply, GatewayError>> + Send + 'static,
    {
        Self { label, run: Box::pin(run), reply_tx: None }
    }

    /// Attach a completion channel so the caller can observe the reply
    /// without blocking the dispatcher's own consumer loop.
    pub fn with_reply(mut self, reply_tx: oneshot::Sender<AgentReply>) -> Self {
        self.reply_tx = Some(reply_tx);
        self
    }
}

/// Handle used by every component that wants to trigger the agent. Cheap to
/// clone; all clones share the same underlying queue and busy flag.
#[derive(Clone)]
pub struct Dispatcher {
    jobs: mpsc::UnboundedSender<DispatchJob>,
    busy: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Spawn the single consumer task and return a handle to submit jobs.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let busy = Arc::new(AtomicBool::new(false));
        tokio::spawn(run_loop(rx, Arc::clone(&busy)));
        Self { jobs: tx, busy }
    }

    /// Enqueue a job. Never blocks; the consumer drains the queue
    /// sequentially in arrival order.
    pub fn submit(&self, job: DispatchJob) {
        let _ = self.jobs.send(job);
    }

    /// True while a job is being awaited by the consumer. Read by the
    /// autonomy engine to skip nudges that would otherwise queue behind a
    /// slow chat turn.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

async fn run_loop(mut jobs: mpsc::UnboundedReceiver<DispatchJob>, busy: Arc<AtomicBool>) {
    while let Some(job) = jobs.recv().await {
        busy.store(true, Ordering::Release);
        match job.run.await {
            Ok(reply) => {
                if let Some(reply_tx) = job.reply_tx {
                    let _ = reply_tx.send(reply);
                }
            }
            Err(err) => {
                warn!(job = job.label, error = %err, "dispatcher job failed, dropping");
            }
        }
        busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

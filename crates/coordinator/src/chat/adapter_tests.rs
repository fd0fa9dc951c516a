use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

use super::*;
use crate::chat::message::{short_id_from, ChatMessage, Platform, PlatformMeta};

/// Test double that immediately emits a fixed set of messages on `connect`
/// and can be told to fail, for exercising multiplexer reconnect behavior.
pub struct MockAdapter {
    connected: Arc<AtomicBool>,
    pub fail_connects: Arc<AtomicBool>,
    pub emit_disconnect: Arc<AtomicBool>,
    pub messages: Vec<ChatMessage>,
}

impl MockAdapter {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(false)),
            fail_connects: Arc::new(AtomicBool::new(false)),
            emit_disconnect: Arc::new(AtomicBool::new(false)),
            messages,
        }
    }
}

#[async_trait]
impl ChatAdapter for MockAdapter {
    async fn connect(&self, events: mpsc::UnboundedSender<AdapterEvent>) -> anyhow::Result<()> {
        if self.fail_connects.load(Ordering::Relaxed) {
            anyhow::bail!("mock connect failure");
        }
        self.connected.store(true, Ordering::Relaxed);
        let _ = events.send(AdapterEvent::Connected);
        for msg in &self.messages {
            let _ = events.send(AdapterEvent::Message(msg.clone()));
        }
        if self.emit_disconnect.load(Ordering::Relaxed) {
            self.connected.store(false, Ordering::Relaxed);
            let _ = events.send(AdapterEvent::Disconnected);
        }
        Ok(())
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}

fn sample_message(id: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_owned(),
        short_id: short_id_from(id),
        platform: Platform::Youtube,
        username: "viewer".into(),
        body: "hello".into(),
        arrived_at_ms: 0,
        meta: PlatformMeta::default(),
    }
}

#[tokio::test]
async fn connect_emits_connected_then_messages() {
    let adapter = MockAdapter::new(vec![sample_message("m1"), sample_message("m2")]);
    let (tx, mut rx) = mpsc::unbounded_channel();
    adapter.connect(tx).await.unwrap();

    assert!(matches!(rx.recv().await, Some(AdapterEvent::Connected)));
    assert!(matches!(rx.recv().await, Some(AdapterEvent::Message(_))));
    assert!(matches!(rx.recv().await, Some(AdapterEvent::Message(_))));
    assert!(adapter.is_connected());
}

#[tokio::test]
async fn failing_connect_returns_err_without_connected_event() {
    let adapter = MockAdapter::new(vec![]);
    adapter.fail_connects.store(true, Ordering::Relaxed);
    let (tx, _rx) = mpsc::unbounded_channel();
    assert!(adapter.connect(tx).await.is_err());
    assert!(!adapter.is_connected());
}

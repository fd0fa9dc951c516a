use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use super::*;
use crate::chat::adapter::tests::MockAdapter;
use crate::chat::message::{short_id_from, ChatMessage, Platform, PlatformMeta};

fn sample_message(id: &str) -> ChatMessage {
    ChatMessage {
        id: id.to_owned(),
        short_id: short_id_from(id),
        platform: Platform::Twitch,
        username: "viewer".into(),
        body: "gm".into(),
        arrived_at_ms: 0,
        meta: PlatformMeta::default(),
    }
}

#[tokio::test]
async fn healthy_adapter_forwards_up_and_messages() {
    let mut mux = ChatMultiplexer::new();
    let adapter = Arc::new(MockAdapter::new(vec![sample_message("a"), sample_message("b")]));
    mux.register_adapter("twitch", adapter);

    let (tx, mut rx) = mpsc::unbounded_channel();
    mux.connect_all(tx);

    assert!(matches!(rx.recv().await, Some(ChatEvent::AdapterUp(k)) if k == "twitch"));
    assert!(matches!(rx.recv().await, Some(ChatEvent::Message(_))));
    assert!(matches!(rx.recv().await, Some(ChatEvent::Message(_))));

    mux.disconnect_all().await;
}

#[tokio::test]
async fn explicit_disconnect_after_connect_emits_adapter_down_exactly_once() {
    let mut mux = ChatMultiplexer::new();
    let adapter = Arc::new(MockAdapter::new(vec![sample_message("a")]));
    adapter.emit_disconnect.store(true, Ordering::Relaxed);
    mux.register_adapter("twitch", Arc::clone(&adapter));

    let (tx, mut rx) = mpsc::unbounded_channel();
    mux.connect_all(tx);

    assert!(matches!(rx.recv().await, Some(ChatEvent::AdapterUp(k)) if k == "twitch"));
    assert!(matches!(rx.recv().await, Some(ChatEvent::Message(_))));
    assert!(matches!(rx.recv().await, Some(ChatEvent::AdapterDown(k)) if k == "twitch"));

    // The explicit `Disconnected` event above must not also trigger the
    // post-loop `saw_connected` fallback emission.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rx.try_recv().is_err());

    mux.disconnect_all().await;
}

#[tokio::test(start_paused = true)]
async fn failing_adapter_retries_with_backoff_then_gives_up() {
    let mut mux = ChatMultiplexer::new();
    let adapter = Arc::new(MockAdapter::new(vec![]));
    adapter.fail_connects.store(true, Ordering::Relaxed);
    mux.register_adapter("youtube", adapter);

    let (tx, mut rx) = mpsc::unbounded_channel();
    mux.connect_all(tx);

    // No AdapterUp/Down events should ever be emitted for a connect that
    // always errors before reaching the event channel.
    tokio::time::advance(Duration::from_secs(5 * 6)).await;
    tokio::time::advance(MAX_BACKOFF * 4).await;
    assert!(rx.try_recv().is_err());

    mux.disconnect_all().await;
}

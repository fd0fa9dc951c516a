use std::time::Duration;

use super::*;

#[tokio::test]
async fn empty_text_is_rejected_without_emitting() {
    let overlay = Arc::new(OverlayHub::new());
    let mut subscriber = overlay.subscribe();
    let gate = SpeechGate::new(Arc::clone(&overlay), Duration::from_secs(60));

    let result = gate.talk("   ").await;
    assert_eq!(result, SpokenResult { spoken: false });
    assert!(subscriber.try_recv().is_err());
}

#[tokio::test]
async fn ack_resolves_pending_talk_immediately() {
    let overlay = Arc::new(OverlayHub::new());
    let mut subscriber = overlay.subscribe();
    let gate = Arc::new(SpeechGate::new(Arc::clone(&overlay), Duration::from_secs(60)));

    let gate2 = Arc::clone(&gate);
    let handle = tokio::spawn(async move { gate2.talk("hi chat").await });

    let event = subscriber.recv().await.unwrap();
    let OverlayEvent::Talk { id, .. } = event else { panic!("expected talk event") };

    assert!(gate.ack(&id).await);
    let result = handle.await.unwrap();
    assert_eq!(result, SpokenResult { spoken: true });
    assert_eq!(gate.pending_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn ack_timeout_resolves_fail_open() {
    let overlay = Arc::new(OverlayHub::new());
    let gate = Arc::new(SpeechGate::new(Arc::clone(&overlay), Duration::from_millis(100)));

    let gate2 = Arc::clone(&gate);
    let handle = tokio::spawn(async move { gate2.talk("hello").await });

    tokio::time::advance(Duration::from_millis(200)).await;
    let result = handle.await.unwrap();
    assert_eq!(result, SpokenResult { spoken: true });
}

#[tokio::test]
async fn unknown_ack_id_returns_false() {
    let overlay = Arc::new(OverlayHub::new());
    let gate = SpeechGate::new(overlay, Duration::from_secs(60));
    assert!(!gate.ack("nonexistent").await);
}

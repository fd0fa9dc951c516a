use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::oneshot;

use super::*;

#[tokio::test]
async fn jobs_run_sequentially_in_arrival_order() {
    let dispatcher = Dispatcher::spawn();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for i in 0..3u8 {
        let order = Arc::clone(&order);
        dispatcher.submit(DispatchJob::new("test", async move {
            order.lock().unwrap().push(i);
            Ok(vec![format!("job-{i}")])
        }));
    }

    // Give the consumer time to drain; a real caller would await replies
    // instead, shown in the next test.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn failed_job_is_dropped_without_stalling_queue() {
    let dispatcher = Dispatcher::spawn();
    let ran = Arc::new(AtomicUsize::new(0));

    dispatcher.submit(DispatchJob::new("failing", async {
        Err(GatewayError::Transport("boom".into()))
    }));

    let ran2 = Arc::clone(&ran);
    let (tx, rx) = oneshot::channel();
    dispatcher.submit(
        DispatchJob::new("follow-up", async move {
            ran2.fetch_add(1, Ordering::Relaxed);
            Ok(vec!["ok".into()])
        })
        .with_reply(tx),
    );

    let reply = rx.await.unwrap();
    assert_eq!(reply, vec!["ok".to_string()]);
    assert_eq!(ran.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn busy_flag_reflects_in_flight_job() {
    let dispatcher = Dispatcher::spawn();
    assert!(!dispatcher.is_busy());

    let (unblock_tx, unblock_rx) = oneshot::channel::<()>();
    dispatcher.submit(DispatchJob::new("slow", async move {
        let _ = unblock_rx.await;
        Ok(vec![])
    }));

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(dispatcher.is_busy());

    let _ = unblock_tx.send(());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!dispatcher.is_busy());
}

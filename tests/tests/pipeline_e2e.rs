//! Producer to consumer through the in-memory channel.

use api::response::SessionResponse;
use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use std::time::Duration;
use tokio::sync::watch;
use worker::read_log;

#[tokio::test]
async fn test_forced_automation_session_reaches_the_log() {
    let ctx = TestContext::new(fixtures::forced_automation(5));
    let server = ctx.server();
    let mut worker = ctx.worker();

    let before = worker.aggregator().snapshot();

    let body: SessionResponse = server.get("/session").await.json();
    assert_eq!(ctx.channel.published_count(), 5);

    let outcome = ctx.drain(&mut worker).await.unwrap();
    assert_eq!(outcome.accepted, 5);
    assert_eq!(outcome.duplicates, 0);
    assert_eq!(ctx.channel.committed(), 5);

    let after = worker.aggregator().snapshot();
    assert_eq!(after.unique_sessions, before.unique_sessions + 1);
    assert_eq!(after.total_events, before.total_events + 5);
    assert_eq!(after.automated_events, before.automated_events + 5);
    assert_eq!(worker.aggregator().session_events(&body.session_id), 5);

    let published = ctx.channel.published();
    let kind = &published[0].automation_kind;
    assert!(published.iter().all(|r| &r.automation_kind == kind));
    assert_eq!(
        after.by_automation_kind.get(kind).copied().unwrap_or(0),
        before.by_automation_kind.get(kind).copied().unwrap_or(0) + 5
    );

    let path = worker.log().path().to_path_buf();
    assert_eq!(worker.log().rows(), 5);
    let persisted = read_log(&path).unwrap();
    assert_eq!(persisted, published);
}

#[tokio::test]
async fn test_mixed_traffic_counts_add_up() {
    let ctx = TestContext::new(fixtures::seeded_config(99));
    let server = ctx.server();
    let mut worker = ctx.worker();

    for _ in 0..10 {
        server.get("/event").await.assert_status_ok();
    }
    for _ in 0..3 {
        server.get("/session").await.assert_status_ok();
    }

    let published = ctx.channel.published().len() as u64;
    ctx.drain(&mut worker).await.unwrap();

    let snapshot = worker.aggregator().snapshot();
    assert_eq!(snapshot.total_events, published);
    assert_eq!(snapshot.automated_events + snapshot.human_events, published);
    assert_eq!(snapshot.by_action.values().sum::<u64>(), published);
    assert_eq!(snapshot.by_device.values().sum::<u64>(), published);
}

#[tokio::test]
async fn test_run_loop_persists_then_stops_on_shutdown() {
    let ctx = TestContext::new(fixtures::forced_automation(4));
    let server = ctx.server();
    server.get("/session").await.assert_status_ok();

    let worker = ctx.worker();
    let log_path = worker.log().path().to_path_buf();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(worker.run(shutdown_rx));

    // Wait for the batch to be committed before stopping.
    for _ in 0..100 {
        if ctx.channel.committed() == 4 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(ctx.channel.committed(), 4);

    shutdown_tx.send(true).unwrap();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("worker stops after shutdown")
        .unwrap()
        .unwrap();

    assert_eq!(snapshot.total_events, 4);
    assert_eq!(snapshot.unique_sessions, 1);
    assert_eq!(read_log(&log_path).unwrap().len(), 4);
}

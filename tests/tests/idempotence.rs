//! At-least-once delivery: redelivered records never reach the log twice.

use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use worker::read_log;

#[tokio::test]
async fn test_redelivery_leaves_log_unchanged() {
    let ctx = TestContext::new(fixtures::forced_automation(5));
    let server = ctx.server();
    let mut worker = ctx.worker();

    server.get("/session").await.assert_status_ok();
    ctx.drain(&mut worker).await.unwrap();

    let path = worker.log().path().to_path_buf();
    let before = read_log(&path).unwrap();
    let snapshot = worker.aggregator().snapshot();

    // Replay everything from the start, as after a restart before commit.
    ctx.channel.rewind(0);
    let outcome = ctx.drain(&mut worker).await.unwrap();
    assert_eq!(outcome.accepted, 0);
    assert_eq!(outcome.duplicates, 5);

    assert_eq!(read_log(&path).unwrap(), before);
    assert_eq!(worker.log().rows(), 5);

    let replayed = worker.aggregator().snapshot();
    assert_eq!(replayed.total_events, snapshot.total_events);
    assert_eq!(replayed.unique_sessions, snapshot.unique_sessions);
}

#[tokio::test]
async fn test_partial_replay_only_adds_new_records() {
    let ctx = TestContext::new(fixtures::forced_automation(3));
    let server = ctx.server();
    let mut worker = ctx.worker();

    server.get("/session").await.assert_status_ok();
    ctx.drain(&mut worker).await.unwrap();

    server.get("/session").await.assert_status_ok();
    ctx.channel.rewind(1);

    let outcome = ctx.drain(&mut worker).await.unwrap();
    assert_eq!(outcome.accepted, 3);
    assert_eq!(outcome.duplicates, 2);
    assert_eq!(worker.aggregator().total_events(), 6);

    let persisted = read_log(worker.log().path()).unwrap();
    assert_eq!(persisted, ctx.channel.published());
}

#[tokio::test]
async fn test_duplicate_ids_within_a_batch() {
    let ctx = TestContext::new(fixtures::seeded_config(5));
    let mut worker = ctx.worker();

    let record = fixtures::record("evt-1", "sess-1");
    let outcome = worker
        .ingest(&[record.clone(), record, fixtures::record("evt-2", "sess-1")])
        .unwrap();

    assert_eq!(outcome.accepted, 2);
    assert_eq!(outcome.duplicates, 1);
    assert_eq!(worker.aggregator().unique_sessions(), 1);
    assert_eq!(worker.log().rows(), 2);
}

#[tokio::test]
async fn test_malformed_payloads_do_not_stop_ingest() {
    let ctx = TestContext::new(fixtures::forced_automation(2));
    let server = ctx.server();
    let mut worker = ctx.worker();

    ctx.channel.push_raw(b"not json");
    server.get("/session").await.assert_status_ok();
    ctx.channel.push_raw(b"\"just a string\"");

    let outcome = ctx.drain(&mut worker).await.unwrap();
    assert_eq!(outcome.accepted, 2);
    assert_eq!(ctx.channel.committed(), 4);
    assert_eq!(worker.log().rows(), 2);
}

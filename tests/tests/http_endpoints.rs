//! HTTP surface tests against the in-memory channel.

use api::response::{ErrorResponse, SessionResponse};
use axum::http::StatusCode;
use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use serde_json::Value;
use stream_core::COLUMNS;

#[tokio::test]
async fn test_event_publishes_one_record() {
    let ctx = TestContext::new(fixtures::seeded_config(7));
    let server = ctx.server();

    let response = server.get("/event").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let object = body.as_object().expect("record object");
    for column in COLUMNS {
        assert!(object.contains_key(column), "missing column {column}");
    }

    let published = ctx.channel.published();
    assert_eq!(published.len(), 1);
    assert_eq!(body["event_id"], published[0].record_id.as_str());
    assert_eq!(body["session_id"], published[0].session_id.as_str());
}

#[tokio::test]
async fn test_event_alias() {
    let ctx = TestContext::new(fixtures::seeded_config(7));
    let server = ctx.server();

    server.get("/bot_event").await.assert_status_ok();
    server.get("/event").await.assert_status_ok();

    assert_eq!(ctx.channel.published_count(), 2);
}

#[tokio::test]
async fn test_session_publishes_whole_burst() {
    let ctx = TestContext::new(fixtures::forced_automation(5));
    let server = ctx.server();

    let response = server.get("/session").await;
    response.assert_status_ok();

    let body: SessionResponse = response.json();
    assert_eq!(body.status, "success");
    assert!(body.is_automated);
    assert_eq!(body.record_count, 5);

    let published = ctx.channel.published();
    assert_eq!(published.len(), 5);
    assert!(published.iter().all(|r| r.session_id == body.session_id));
    assert!(published.iter().all(|r| r.source_address == body.source_address));
    assert!(published.iter().all(|r| r.is_automated && r.automation_kind != "none"));
}

#[tokio::test]
async fn test_session_alias() {
    let ctx = TestContext::new(fixtures::forced_automation(3));
    let server = ctx.server();

    let first: SessionResponse = server.get("/generate_session").await.json();
    assert_eq!(first.record_count, 3);

    // One burst resolves one session once.
    let stats: Value = server.get("/sessions").await.json();
    assert_eq!(stats["total_active_sessions"], 1);
    assert_eq!(stats["total_actions"], 1);
}

#[tokio::test]
async fn test_sessions_stats_shape() {
    let ctx = TestContext::new(fixtures::seeded_config(11));
    let server = ctx.server();

    let empty: Value = server.get("/sessions").await.json();
    assert_eq!(empty["total_active_sessions"], 0);
    assert_eq!(empty["avg_actions_per_session"], 0.0);
    assert_eq!(empty["session_sample"].as_array().map(Vec::len), Some(0));

    for _ in 0..3 {
        server.get("/event").await.assert_status_ok();
    }

    let response = server.get("/sessions_info").await;
    response.assert_status_ok();
    let stats: Value = response.json();

    let active = stats["total_active_sessions"].as_u64().expect("count");
    assert!((1..=3).contains(&active));
    assert_eq!(stats["total_actions"], 3);

    let sample = stats["session_sample"].as_array().expect("sample");
    assert_eq!(sample.len() as u64, active);
    for entry in sample {
        assert!(entry["session_id"].as_str().is_some());
        assert!(entry["ip"].as_str().is_some());
        assert!(entry["actions"].as_u64().is_some());
    }
}

#[tokio::test]
async fn test_publish_failure_is_bad_gateway() {
    let ctx = TestContext::new(fixtures::seeded_config(3));
    ctx.channel.set_fail_publish(true);
    let server = ctx.server();

    for path in ["/event", "/session"] {
        let response = server.get(path).await;
        response.assert_status(StatusCode::BAD_GATEWAY);

        let body: ErrorResponse = response.json();
        assert_eq!(body.code, "STREAM_001");
        assert!(!body.error.is_empty());
    }

    assert_eq!(ctx.channel.published_count(), 0);
}

#[tokio::test]
async fn test_unknown_route_is_json_not_found() {
    let ctx = TestContext::new(fixtures::seeded_config(1));
    let server = ctx.server();

    let response = server.get("/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: ErrorResponse = response.json();
    assert_eq!(body.code, "NOT_FOUND");
    assert!(body.error.contains("/nope"));
}

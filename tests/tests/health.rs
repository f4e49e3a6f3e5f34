//! Health endpoint tests.

use api::response::HealthResponse;
use axum::http::StatusCode;
use integration_tests::fixtures;
use integration_tests::setup::TestContext;
use telemetry::health;

#[tokio::test]
async fn test_health_endpoint() {
    let ctx = TestContext::new(fixtures::seeded_config(1));
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: HealthResponse = response.json();
    assert!(["healthy", "degraded", "unhealthy"].contains(&body.status.as_str()));
    assert!(body.producer_connected);
}

#[tokio::test]
async fn test_health_reports_producer_state() {
    let ctx = TestContext::new(fixtures::seeded_config(1));
    ctx.channel.set_fail_publish(true);
    let server = ctx.server();

    let body: HealthResponse = server.get("/health").await.json();
    assert!(!body.producer_connected);
}

#[tokio::test]
async fn test_health_counts_published_records() {
    let ctx = TestContext::new(fixtures::forced_automation(2));
    let server = ctx.server();

    server.get("/session").await.assert_status_ok();

    let body: HealthResponse = server.get("/health").await.json();
    assert!(body.metrics.records_synthesized >= 2);
}

#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new(fixtures::seeded_config(1));
    let server = ctx.server();

    // The global registry is shared with the other tests in this binary.
    let response = server.get("/health/ready").await;
    let status = response.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "unexpected status {status}"
    );
    assert_eq!(status == StatusCode::OK, health().is_ready());
}

#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new(fixtures::seeded_config(1));
    let server = ctx.server();

    let response = server.get("/health/live").await;
    response.assert_status_ok();
}

//! Synthesis endpoints.
//!
//! Every request resolves sessions through the shared tracker and publishes
//! the resulting records before responding.

use std::time::Instant;

use axum::{extract::State, Json};
use stream_core::{ActivityRecord, ResolutionKind, TrackerStats, SESSION_SAMPLE_SIZE};
use telemetry::metrics;
use tracing::{debug, error, info};

use crate::response::{ApiError, SessionResponse};
use crate::state::AppState;

/// GET /event - One synthesized record, published and echoed back.
pub async fn event_handler(State(state): State<AppState>) -> Result<Json<ActivityRecord>, ApiError> {
    let event = state.synthesizer.single_event();
    metrics().records_synthesized.inc();
    update_session_gauge(&state);

    log_resolution(&event.source_key, &event.resolution.session_id, event.resolution.kind);
    if event.ambiguous {
        debug!(record_id = %event.record.record_id, "Ambiguous provenance applied");
    }

    state
        .producer
        .publish(std::slice::from_ref(&event.record))
        .await
        .map_err(|e| {
            error!(record_id = %event.record.record_id, error = %e, "Failed to publish record");
            ApiError::from(e)
        })?;

    debug!(
        record_id = %event.record.record_id,
        session_id = %event.record.session_id,
        is_automated = event.record.is_automated,
        action = %event.record.action_kind,
        "Record published"
    );

    Ok(Json(event.record))
}

/// GET /session - A burst of records sharing one session.
pub async fn session_handler(State(state): State<AppState>) -> Result<Json<SessionResponse>, ApiError> {
    let burst = state.synthesizer.burst();
    metrics().records_synthesized.inc_by(burst.records.len() as u64);
    update_session_gauge(&state);

    log_resolution(&burst.source_address, &burst.session_id, burst.resolution.kind);

    state.producer.publish(&burst.records).await.map_err(|e| {
        error!(session_id = %burst.session_id, error = %e, "Failed to publish session");
        ApiError::from(e)
    })?;

    info!(
        session_id = %burst.session_id,
        records = burst.records.len(),
        is_automated = burst.is_automated,
        "Session published"
    );

    Ok(Json(SessionResponse {
        status: "success".to_string(),
        session_id: burst.session_id,
        is_automated: burst.is_automated,
        record_count: burst.records.len(),
        source_address: burst.source_address,
    }))
}

/// GET /sessions - Tracker introspection.
pub async fn sessions_handler(State(state): State<AppState>) -> Json<TrackerStats> {
    Json(state.tracker().stats(Instant::now(), SESSION_SAMPLE_SIZE))
}

fn update_session_gauge(state: &AppState) {
    metrics().tracked_sessions.set(state.tracker().len() as u64);
}

fn log_resolution(source_key: &str, session_id: &str, kind: ResolutionKind) {
    match kind {
        ResolutionKind::Created => debug!(source_key, session_id, "New session"),
        ResolutionKind::Reused(actions) => debug!(source_key, session_id, actions, "Session reused"),
        ResolutionKind::Rotated(reason) => {
            info!(source_key, session_id, reason = ?reason, "Session rotated")
        }
    }
}

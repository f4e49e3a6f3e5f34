//! Redpanda health checks.

use stream_core::{Error, Result, StreamErrorCode};
use telemetry::health;
use tracing::{debug, warn};

use crate::client;
use crate::config::RedpandaConfig;

/// Connects and verifies that the configured topic and partition exist.
pub async fn check_connection(config: &RedpandaConfig) -> Result<()> {
    let client = client::connect(config, StreamErrorCode::SubscribeFailed).await?;

    let topics = client.list_topics().await.map_err(|e| {
        Error::stream(StreamErrorCode::SubscribeFailed, format!("failed to list topics: {e}"))
    })?;

    let topic = topics
        .iter()
        .find(|t| t.name == config.topic)
        .ok_or_else(|| {
            Error::stream(
                StreamErrorCode::SubscribeFailed,
                format!("topic {} does not exist", config.topic),
            )
        })?;

    if !topic.partitions.contains(&config.partition) {
        return Err(Error::stream(
            StreamErrorCode::SubscribeFailed,
            format!("topic {} has no partition {}", config.topic, config.partition),
        ));
    }

    debug!(topic = %config.topic, partitions = topic.partitions.len(), "Redpanda connection healthy");
    Ok(())
}

/// Runs [`check_connection`] and records the outcome in the health registry.
pub async fn refresh(config: &RedpandaConfig) -> bool {
    match check_connection(config).await {
        Ok(()) => {
            health().redpanda.set_healthy();
            true
        }
        Err(e) => {
            warn!(error = %e, "Redpanda health check failed");
            health().redpanda.set_unhealthy(e.to_string());
            false
        }
    }
}

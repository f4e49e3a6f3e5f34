//! Background task scheduling.

use std::sync::Arc;
use std::time::Duration;

use redpanda::RedpandaConfig;
use serde::{Deserialize, Serialize};
use stream_core::{Result, SessionTracker};
use telemetry::metrics;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info};

use crate::aggregate::AggregateSnapshot;
use crate::consumer::{ConsumerWorker, ConsumerWorkerConfig};

/// Worker section of the service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Directory holding the record logs
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
    /// Seconds between broker health probes
    #[serde(default = "default_health_interval_secs")]
    pub health_interval_secs: u64,
    #[serde(default)]
    pub consumer: ConsumerWorkerConfig,
}

fn default_log_dir() -> String {
    "data".to_string()
}

fn default_health_interval_secs() -> u64 {
    30
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            health_interval_secs: default_health_interval_secs(),
            consumer: ConsumerWorkerConfig::default(),
        }
    }
}

/// Spawns background tasks that stop on one shared shutdown signal.
pub struct WorkerScheduler {
    config: WorkerConfig,
    shutdown: watch::Receiver<bool>,
}

impl WorkerScheduler {
    pub fn new(config: WorkerConfig, shutdown: watch::Receiver<bool>) -> Self {
        Self { config, shutdown }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Starts the ingest loop. The handle yields the final statistics.
    pub fn spawn_consumer(&self, worker: ConsumerWorker) -> JoinHandle<Result<AggregateSnapshot>> {
        let shutdown = self.shutdown.clone();
        info!("Consumer worker scheduled");
        tokio::spawn(worker.run(shutdown))
    }

    /// Periodically probes the broker and publishes the tracker size.
    pub fn spawn_monitor(
        &self,
        redpanda: RedpandaConfig,
        tracker: Option<Arc<SessionTracker>>,
    ) -> JoinHandle<()> {
        let mut shutdown = self.shutdown.clone();
        let period = Duration::from_secs(self.config.health_interval_secs.max(1));

        tokio::spawn(async move {
            let mut ticker = interval(period);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }

                redpanda::health::refresh(&redpanda).await;
                if let Some(tracker) = &tracker {
                    metrics().tracked_sessions.set(tracker.len() as u64);
                }

                let snapshot = metrics().snapshot();
                debug!(
                    published = snapshot.records_published,
                    publish_errors = snapshot.publish_errors,
                    persisted = snapshot.records_persisted,
                    duplicates = snapshot.duplicates_discarded,
                    tracked_sessions = snapshot.tracked_sessions,
                    "Pipeline metrics"
                );
            }
            debug!("Monitor stopped");
        })
    }
}

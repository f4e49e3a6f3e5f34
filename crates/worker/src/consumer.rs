//! Consumer worker: the idempotent ingest loop.
//!
//! Each iteration fetches a batch, then for every record in delivery order:
//! 1. Skip it if its ID was already accepted
//! 2. Append it to the record log
//! 3. Update the aggregates
//!
//! The log is flushed before the batch offset is committed, so a crash
//! between the two leads to redelivery, which step 1 absorbs.

use std::sync::Arc;
use std::time::{Duration, Instant};

use redpanda::RecordSource;
use serde::{Deserialize, Serialize};
use stream_core::{ActivityRecord, Result};
use telemetry::{health, metrics};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::aggregate::{AggregateSnapshot, Aggregator};
use crate::store::RecordLog;

/// Consumer worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerWorkerConfig {
    /// Log a progress line every N accepted records
    #[serde(default = "default_progress_every")]
    pub progress_every: u64,
    /// Seconds between full statistics reports
    #[serde(default = "default_report_interval_secs")]
    pub report_interval_secs: u64,
    /// Pause after a failed fetch before reconnecting
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
}

fn default_progress_every() -> u64 {
    10
}

fn default_report_interval_secs() -> u64 {
    30
}

fn default_error_backoff_ms() -> u64 {
    1000
}

impl Default for ConsumerWorkerConfig {
    fn default() -> Self {
        Self {
            progress_every: default_progress_every(),
            report_interval_secs: default_report_interval_secs(),
            error_backoff_ms: default_error_backoff_ms(),
        }
    }
}

/// Outcome of ingesting one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub accepted: usize,
    pub duplicates: usize,
}

/// Reads the stream, deduplicates, persists and aggregates.
pub struct ConsumerWorker {
    source: Arc<dyn RecordSource>,
    log: RecordLog,
    aggregator: Aggregator,
    config: ConsumerWorkerConfig,
}

impl ConsumerWorker {
    pub fn new(source: Arc<dyn RecordSource>, log: RecordLog, config: ConsumerWorkerConfig) -> Self {
        Self {
            source,
            log,
            aggregator: Aggregator::new(Instant::now()),
            config,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn log(&self) -> &RecordLog {
        &self.log
    }

    /// Runs until `shutdown` flips to `true` (or its sender is dropped).
    ///
    /// A pending fetch is abandoned on shutdown; a batch already fetched is
    /// always finished. Returns the final snapshot. A record log failure
    /// ends the loop with that error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<AggregateSnapshot> {
        info!(
            log = %self.log.path().display(),
            progress_every = self.config.progress_every,
            report_interval_secs = self.config.report_interval_secs,
            "Consumer worker starting"
        );
        health().record_store.set_healthy();

        let backoff = Duration::from_millis(self.config.error_backoff_ms);

        while !*shutdown.borrow() {
            let fetched = tokio::select! {
                _ = shutdown.changed() => break,
                fetched = self.source.fetch_batch() => fetched,
            };

            match fetched {
                Ok((records, offset)) => {
                    health().redpanda.set_healthy();

                    if let Err(e) = self.ingest(&records) {
                        error!(error = %e, "Record log write failed, stopping consumer");
                        health().record_store.set_unhealthy(e.to_string());
                        self.report("final");
                        return Err(e);
                    }

                    if let Some(offset) = offset {
                        if let Err(e) = self.source.commit(offset).await {
                            warn!(error = %e, offset = offset.offset, "Offset commit failed");
                            self.source.reset_connection().await;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Fetch failed");
                    health().redpanda.set_unhealthy(e.to_string());

                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                    self.source.reset_connection().await;
                }
            }

            self.maybe_report(Instant::now());
        }

        info!("Consumer worker stopping");
        let snapshot = self.report("final");
        match self.log.close() {
            Ok(path) => info!(path = %path.display(), "Record log closed"),
            Err(e) => {
                health().record_store.set_unhealthy(e.to_string());
                return Err(e);
            }
        }
        Ok(snapshot)
    }

    /// Ingests a batch in order and flushes the log.
    pub fn ingest(&mut self, records: &[ActivityRecord]) -> Result<BatchOutcome> {
        let mut outcome = BatchOutcome::default();

        for record in records {
            if self.aggregator.is_duplicate(&record.record_id) {
                outcome.duplicates += 1;
                debug!(record_id = %record.record_id, "Duplicate discarded");
                continue;
            }

            self.log.append(record)?;
            self.aggregator.record(record);
            outcome.accepted += 1;

            if self.aggregator.progress_due(self.config.progress_every) {
                info!(
                    processed = self.aggregator.total_events(),
                    sessions = self.aggregator.unique_sessions(),
                    automated = self.aggregator.automated_events(),
                    "Progress"
                );
            }
        }

        if outcome.accepted > 0 {
            self.log.flush()?;
        }

        metrics().records_persisted.inc_by(outcome.accepted as u64);
        metrics().duplicates_discarded.inc_by(outcome.duplicates as u64);
        Ok(outcome)
    }

    fn maybe_report(&mut self, now: Instant) {
        let interval = Duration::from_secs(self.config.report_interval_secs);
        if self.aggregator.report_due(now, interval) {
            self.report("periodic");
            self.aggregator.mark_reported(now);
        }
    }

    fn report(&self, kind: &str) -> AggregateSnapshot {
        let snapshot = self.aggregator.snapshot();
        info!(
            report = kind,
            total_events = snapshot.total_events,
            unique_sessions = snapshot.unique_sessions,
            "Consumer statistics\n{snapshot}"
        );
        snapshot
    }
}

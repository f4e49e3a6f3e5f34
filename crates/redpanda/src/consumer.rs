//! Subscribe side of the stream channel.
//!
//! - Offsets are tracked in-process and advanced only by [`RecordSource::commit`]
//! - A fetch after a reset re-reads everything past the last commit
//! - Payloads that are not JSON objects are logged, counted and skipped

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use rskafka::client::partition::{OffsetAt, PartitionClient};
use stream_core::{ActivityRecord, Error, Result, StreamErrorCode};
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client;
use crate::config::{RedpandaConfig, StartOffset};

/// Position to resume from after a batch is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Offset {
    pub partition: i32,
    pub offset: i64,
}

/// Records from one fetch plus the offset to commit once they are persisted.
pub type FetchedBatch = (Vec<ActivityRecord>, Option<Offset>);

/// Ordered, at-least-once record stream.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Fetches the next batch. An empty batch means nothing arrived in time.
    async fn fetch_batch(&self) -> Result<FetchedBatch>;

    /// Marks everything before `offset` as processed.
    async fn commit(&self, offset: Offset) -> Result<()>;

    /// Drops the connection; uncommitted records will be fetched again.
    async fn reset_connection(&self);
}

/// rskafka-backed consumer for one topic partition.
pub struct Consumer {
    config: RedpandaConfig,
    client: RwLock<Option<Arc<PartitionClient>>>,
    /// Next offset to read; -1 until the start offset is resolved
    committed: AtomicI64,
}

impl Consumer {
    /// Connects and resolves the start offset. Fails if the broker or the
    /// topic is unreachable.
    pub async fn subscribe(config: RedpandaConfig) -> Result<Self> {
        info!(
            group_id = %config.consumer.group_id,
            topic = %config.topic,
            start_offset = ?config.consumer.start_offset,
            "Subscribing"
        );

        let consumer = Self {
            config,
            client: RwLock::new(None),
            committed: AtomicI64::new(-1),
        };
        consumer.ensure_connected().await?;
        Ok(consumer)
    }

    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = client::partition_client(&self.config, StreamErrorCode::SubscribeFailed).await?;

        if self.committed.load(Ordering::SeqCst) < 0 {
            let at = match self.config.consumer.start_offset {
                StartOffset::Earliest => OffsetAt::Earliest,
                StartOffset::Latest => OffsetAt::Latest,
            };
            let offset = client.get_offset(at).await.map_err(|e| {
                Error::stream(StreamErrorCode::SubscribeFailed, format!("failed to resolve start offset: {e}"))
            })?;
            self.committed.store(offset, Ordering::SeqCst);

            info!(topic = %self.config.topic, partition = self.config.partition, offset, "Consumer positioned");
        }

        *slot = Some(client.clone());
        Ok(client)
    }
}

#[async_trait]
impl RecordSource for Consumer {
    async fn fetch_batch(&self) -> Result<FetchedBatch> {
        let client = self.ensure_connected().await?;
        let settings = &self.config.consumer;

        let start = Instant::now();
        let from = self.committed.load(Ordering::SeqCst);
        let max_bytes = (settings.batch_size.max(1) * 8 * 1024).min(i32::MAX as usize) as i32;

        let (fetched, high_watermark) = client
            .fetch_records(from, 1..max_bytes, settings.batch_timeout_ms as i32)
            .await
            .map_err(|e| {
                Error::stream(StreamErrorCode::SubscribeFailed, format!("fetch from offset {from} failed: {e}"))
            })?;

        let mut records = Vec::with_capacity(fetched.len());
        let mut next = from;
        let mut malformed = 0u64;

        for item in fetched.into_iter().take(settings.batch_size.max(1)) {
            next = next.max(item.offset + 1);

            let Some(payload) = item.record.value else {
                malformed += 1;
                warn!(offset = item.offset, "Skipping record without payload");
                continue;
            };

            match ActivityRecord::from_wire(&payload) {
                Ok(record) => records.push(record),
                Err(e) => {
                    malformed += 1;
                    warn!(offset = item.offset, error = %e, "Skipping malformed payload");
                }
            }
        }

        metrics().records_consumed.inc_by(records.len() as u64);
        metrics().malformed_payloads.inc_by(malformed);

        if next > from {
            debug!(
                records = records.len(),
                malformed,
                offset_start = from,
                offset_end = next - 1,
                high_watermark,
                latency_ms = %start.elapsed().as_millis(),
                "Fetched batch"
            );
        }

        let commit = (next > from).then_some(Offset {
            partition: self.config.partition,
            offset: next,
        });
        Ok((records, commit))
    }

    async fn commit(&self, offset: Offset) -> Result<()> {
        let prev = self.committed.fetch_max(offset.offset, Ordering::SeqCst);
        debug!(partition = offset.partition, prev_offset = prev, new_offset = offset.offset, "Committed offset");
        Ok(())
    }

    async fn reset_connection(&self) {
        *self.client.write().await = None;
        info!("Consumer connection reset");
    }
}

//! Publish side of the stream channel.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use rskafka::client::partition::PartitionClient;
use rskafka::record::Record;
use stream_core::{ActivityRecord, Error, Result, StreamErrorCode};
use telemetry::metrics;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::client;
use crate::config::RedpandaConfig;
use crate::partitioner::partition_key;

/// Result of publishing records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    pub records_sent: usize,
    /// Offset of the first record, when the channel reports one
    pub first_offset: Option<i64>,
}

/// Publishes activity records onto the stream.
///
/// Records passed in one call are appended in order, so a burst arrives at
/// the consumer in timestamp order.
#[async_trait]
pub trait EventProducer: Send + Sync {
    async fn publish(&self, records: &[ActivityRecord]) -> Result<SendResult>;

    fn is_healthy(&self) -> bool;
}

/// rskafka-backed producer.
pub struct Producer {
    config: RedpandaConfig,
    client: RwLock<Option<Arc<PartitionClient>>>,
    healthy: AtomicBool,
}

impl Producer {
    /// Creates a producer; the connection is opened on first publish.
    pub fn new(config: RedpandaConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
            healthy: AtomicBool::new(false),
        }
    }

    /// Creates a producer and opens the connection now.
    pub async fn connect(config: RedpandaConfig) -> Result<Self> {
        let producer = Self::new(config);
        producer.ensure_connected().await?;
        Ok(producer)
    }

    pub fn config(&self) -> &RedpandaConfig {
        &self.config
    }

    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        if let Some(client) = self.client.read().await.as_ref() {
            return Ok(client.clone());
        }

        let mut slot = self.client.write().await;
        if let Some(client) = slot.as_ref() {
            return Ok(client.clone());
        }

        let client = client::partition_client(&self.config, StreamErrorCode::PublishFailed).await?;
        info!(
            brokers = %self.config.broker_string(),
            topic = %self.config.topic,
            partition = self.config.partition,
            "Producer connected"
        );

        self.healthy.store(true, Ordering::Relaxed);
        *slot = Some(client.clone());
        Ok(client)
    }

    async fn reset_connection(&self) {
        *self.client.write().await = None;
        self.healthy.store(false, Ordering::Relaxed);
    }

    fn to_stream_record(&self, record: &ActivityRecord) -> Result<Record> {
        Ok(Record {
            key: partition_key(self.config.partition_strategy, record).map(String::into_bytes),
            value: Some(record.to_wire()?),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        })
    }
}

#[async_trait]
impl EventProducer for Producer {
    async fn publish(&self, records: &[ActivityRecord]) -> Result<SendResult> {
        if records.is_empty() {
            return Ok(SendResult {
                records_sent: 0,
                first_offset: None,
            });
        }

        let batch = records
            .iter()
            .map(|r| self.to_stream_record(r))
            .collect::<Result<Vec<_>>>()?;
        let count = batch.len();

        let client = match self.ensure_connected().await {
            Ok(client) => client,
            Err(e) => {
                metrics().publish_errors.inc_by(count as u64);
                return Err(e);
            }
        };

        let start = Instant::now();
        match client
            .produce(batch, client::compression(&self.config.compression))
            .await
        {
            Ok(offsets) => {
                let elapsed = start.elapsed();
                metrics().records_published.inc_by(count as u64);
                metrics().publish_latency_ms.observe(elapsed.as_millis() as u64);

                debug!(
                    topic = %self.config.topic,
                    count,
                    first_offset = ?offsets.first(),
                    latency_ms = %elapsed.as_millis(),
                    "Published records"
                );

                Ok(SendResult {
                    records_sent: count,
                    first_offset: offsets.first().copied(),
                })
            }
            Err(e) => {
                error!(topic = %self.config.topic, count, error = %e, "Failed to publish records");
                metrics().publish_errors.inc_by(count as u64);
                self.reset_connection().await;
                Err(Error::stream(
                    StreamErrorCode::PublishFailed,
                    format!("failed to produce to {}: {e}", self.config.topic),
                ))
            }
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }
}

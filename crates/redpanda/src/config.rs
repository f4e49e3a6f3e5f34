//! Redpanda configuration.

use serde::{Deserialize, Serialize};

use crate::partitioner::PartitionStrategy;

/// Default topic for activity records.
pub const DEFAULT_TOPIC: &str = "bot_events";

/// Default consumer group.
pub const DEFAULT_GROUP_ID: &str = "bot_detection_consumer_v2";

/// Connection and producer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    #[serde(default = "default_brokers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_topic")]
    pub topic: String,
    /// Partition records are produced to and consumed from
    #[serde(default)]
    pub partition: i32,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Connect and request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Record key strategy
    #[serde(default)]
    pub partition_strategy: PartitionStrategy,
    /// SASL username; enables TLS + SCRAM when set with a password
    #[serde(default)]
    pub sasl_username: Option<String>,
    #[serde(default)]
    pub sasl_password: Option<String>,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

fn default_brokers() -> Vec<String> {
    vec!["localhost:9092".to_string()]
}

fn default_topic() -> String {
    DEFAULT_TOPIC.to_string()
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: default_brokers(),
            topic: default_topic(),
            partition: 0,
            compression: default_compression(),
            request_timeout_ms: default_request_timeout_ms(),
            partition_strategy: PartitionStrategy::default(),
            sasl_username: None,
            sasl_password: None,
            consumer: ConsumerConfig::default(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// SASL credentials, if both parts are configured.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.sasl_username, &self.sasl_password) {
            (Some(user), Some(pass)) if !user.is_empty() => Some((user, pass)),
            _ => None,
        }
    }
}

/// Where a fresh consumer starts reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    Earliest,
    #[default]
    Latest,
}

/// Consumer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    #[serde(default = "default_group_id")]
    pub group_id: String,
    /// Upper bound on records handled per fetch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum broker wait per fetch in milliseconds
    #[serde(default = "default_batch_timeout_ms")]
    pub batch_timeout_ms: u64,
    #[serde(default)]
    pub start_offset: StartOffset,
}

fn default_group_id() -> String {
    DEFAULT_GROUP_ID.to_string()
}

fn default_batch_size() -> usize {
    500
}

fn default_batch_timeout_ms() -> u64 {
    1000
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            group_id: default_group_id(),
            batch_size: default_batch_size(),
            batch_timeout_ms: default_batch_timeout_ms(),
            start_offset: StartOffset::default(),
        }
    }
}

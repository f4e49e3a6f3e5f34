//! Record key selection.
//!
//! The key travels with each stream record so that brokers and downstream
//! readers can group a session's (or a source's) records together.

use serde::{Deserialize, Serialize};
use stream_core::ActivityRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// Key by session ID (keeps a session's records together)
    #[default]
    BySession,
    /// Key by source address
    BySource,
    /// No key
    RoundRobin,
}

/// Returns the record key for `record` under `strategy`.
pub fn partition_key(strategy: PartitionStrategy, record: &ActivityRecord) -> Option<String> {
    match strategy {
        PartitionStrategy::BySession => Some(record.session_id.clone()),
        PartitionStrategy::BySource => Some(record.source_address.clone()),
        PartitionStrategy::RoundRobin => None,
    }
}

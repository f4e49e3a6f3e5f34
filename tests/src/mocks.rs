//! In-memory stream channel.

use async_trait::async_trait;
use parking_lot::Mutex;
use redpanda::{EventProducer, FetchedBatch, Offset, RecordSource, SendResult};
use std::sync::Arc;
use std::time::Duration;
use stream_core::{ActivityRecord, Error, Result, StreamErrorCode};

const IDLE_WAIT: Duration = Duration::from_millis(5);

#[derive(Default)]
struct ChannelState {
    /// Encoded payloads, index = offset
    payloads: Vec<Vec<u8>>,
    committed: i64,
    resets: usize,
    fail_publish: bool,
}

/// Implements both sides of the channel over one shared in-memory log.
///
/// Records go through the same JSON encoding as the real channel, and a
/// fetch always starts at the last committed offset, so rewinding the
/// offset reproduces at-least-once redelivery.
#[derive(Clone)]
pub struct MockChannel {
    state: Arc<Mutex<ChannelState>>,
    batch_size: usize,
}

impl MockChannel {
    pub fn new() -> Self {
        Self::with_batch_size(100)
    }

    pub fn with_batch_size(batch_size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(ChannelState::default())),
            batch_size,
        }
    }

    /// Decoded copy of everything published so far.
    pub fn published(&self) -> Vec<ActivityRecord> {
        self.state
            .lock()
            .payloads
            .iter()
            .filter_map(|p| ActivityRecord::from_wire(p).ok())
            .collect()
    }

    pub fn published_count(&self) -> usize {
        self.state.lock().payloads.len()
    }

    /// Appends a raw payload, bypassing encoding.
    pub fn push_raw(&self, payload: &[u8]) {
        self.state.lock().payloads.push(payload.to_vec());
    }

    pub fn committed(&self) -> i64 {
        self.state.lock().committed
    }

    /// Moves the committed offset back, as after a consumer restart.
    pub fn rewind(&self, offset: i64) {
        self.state.lock().committed = offset;
    }

    pub fn resets(&self) -> usize {
        self.state.lock().resets
    }

    pub fn set_fail_publish(&self, fail: bool) {
        self.state.lock().fail_publish = fail;
    }
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventProducer for MockChannel {
    async fn publish(&self, records: &[ActivityRecord]) -> Result<SendResult> {
        let mut state = self.state.lock();
        if state.fail_publish {
            return Err(Error::stream(StreamErrorCode::PublishFailed, "mock channel rejected publish"));
        }

        let first_offset = state.payloads.len() as i64;
        for record in records {
            let payload = record.to_wire()?;
            state.payloads.push(payload);
        }

        Ok(SendResult {
            records_sent: records.len(),
            first_offset: (!records.is_empty()).then_some(first_offset),
        })
    }

    fn is_healthy(&self) -> bool {
        !self.state.lock().fail_publish
    }
}

#[async_trait]
impl RecordSource for MockChannel {
    async fn fetch_batch(&self) -> Result<FetchedBatch> {
        let fetched = {
            let state = self.state.lock();
            let from = state.committed.max(0) as usize;
            let to = (from + self.batch_size).min(state.payloads.len());
            (from < to).then(|| {
                let records = state.payloads[from..to]
                    .iter()
                    .filter_map(|p| ActivityRecord::from_wire(p).ok())
                    .collect::<Vec<_>>();
                (records, to as i64)
            })
        };

        match fetched {
            Some((records, offset)) => Ok((records, Some(Offset { partition: 0, offset }))),
            None => {
                // An empty fetch waits like a broker long-poll.
                tokio::time::sleep(IDLE_WAIT).await;
                Ok((Vec::new(), None))
            }
        }
    }

    async fn commit(&self, offset: Offset) -> Result<()> {
        let mut state = self.state.lock();
        state.committed = state.committed.max(offset.offset);
        Ok(())
    }

    async fn reset_connection(&self) {
        self.state.lock().resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_publish_then_fetch_in_order() {
        let channel = MockChannel::with_batch_size(2);
        let records = vec![
            fixtures::record("a", "s1"),
            fixtures::record("b", "s1"),
            fixtures::record("c", "s2"),
        ];

        let sent = channel.publish(&records).await.unwrap();
        assert_eq!(sent.records_sent, 3);
        assert_eq!(sent.first_offset, Some(0));

        let (first, offset) = channel.fetch_batch().await.unwrap();
        assert_eq!(first, records[..2].to_vec());

        // Not committed yet, so the same batch comes back.
        let (again, _) = channel.fetch_batch().await.unwrap();
        assert_eq!(again, first);

        channel.commit(offset.unwrap()).await.unwrap();
        let (rest, offset) = channel.fetch_batch().await.unwrap();
        assert_eq!(rest, records[2..].to_vec());
        assert_eq!(offset.unwrap().offset, 3);
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let channel = MockChannel::new();
        channel.set_fail_publish(true);

        let err = channel.publish(&[fixtures::record("a", "s1")]).await.unwrap_err();
        assert_eq!(err.error_code(), Some("STREAM_001"));
        assert!(!channel.is_healthy());
        assert_eq!(channel.published_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_payloads_are_skipped_but_consumed() {
        let channel = MockChannel::new();
        channel.push_raw(b"[1,2,3]");
        channel.publish(&[fixtures::record("a", "s1")]).await.unwrap();

        let (records, offset) = channel.fetch_batch().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(offset.unwrap().offset, 2);
    }
}

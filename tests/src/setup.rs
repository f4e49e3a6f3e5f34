//! Common test setup.

use api::{router, AppState};
use axum::Router;
use axum_test::TestServer;
use redpanda::{EventProducer, RecordSource};
use std::sync::Arc;
use stream_core::{Result, SessionConfig, SessionTracker, SynthConfig, Synthesizer};
use tempfile::TempDir;
use worker::{BatchOutcome, ConsumerWorker, ConsumerWorkerConfig, RecordLog};

use crate::mocks::MockChannel;

/// Router and consumer wired to one [`MockChannel`].
///
/// Runs the production handlers and ingest logic; only the broker is
/// replaced.
pub struct TestContext {
    pub channel: Arc<MockChannel>,
    pub synthesizer: Arc<Synthesizer>,
    pub router: Router,
    pub log_dir: TempDir,
}

impl TestContext {
    pub fn new(synth: SynthConfig) -> Self {
        Self::with_sessions(synth, SessionConfig::default())
    }

    pub fn with_sessions(synth: SynthConfig, sessions: SessionConfig) -> Self {
        let channel = Arc::new(MockChannel::new());
        let tracker = Arc::new(SessionTracker::new(sessions));
        let synthesizer =
            Arc::new(Synthesizer::new(synth, tracker).expect("valid synthesizer config"));

        let state = AppState::new(channel.clone() as Arc<dyn EventProducer>, synthesizer.clone());

        Self {
            channel,
            synthesizer,
            router: router(state),
            log_dir: tempfile::tempdir().expect("temp dir"),
        }
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("test server")
    }

    /// A consumer worker writing into this context's log directory.
    pub fn worker(&self) -> ConsumerWorker {
        let log = RecordLog::create(self.log_dir.path()).expect("record log");
        ConsumerWorker::new(
            self.channel.clone() as Arc<dyn RecordSource>,
            log,
            ConsumerWorkerConfig::default(),
        )
    }

    /// Fetches, ingests and commits until the channel is drained.
    pub async fn drain(&self, worker: &mut ConsumerWorker) -> Result<BatchOutcome> {
        let mut total = BatchOutcome::default();
        loop {
            let (records, offset) = self.channel.fetch_batch().await?;
            let Some(offset) = offset else {
                return Ok(total);
            };

            let outcome = worker.ingest(&records)?;
            total.accepted += outcome.accepted;
            total.duplicates += outcome.duplicates;
            self.channel.commit(offset).await?;
        }
    }
}

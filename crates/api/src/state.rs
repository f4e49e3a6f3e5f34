//! Application state shared across handlers.

use std::sync::Arc;

use redpanda::EventProducer;
use stream_core::{SessionTracker, Synthesizer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Stream publisher (Redpanda in production, mock in tests)
    pub producer: Arc<dyn EventProducer>,
    pub synthesizer: Arc<Synthesizer>,
}

impl AppState {
    pub fn new(producer: Arc<dyn EventProducer>, synthesizer: Arc<Synthesizer>) -> Self {
        Self {
            producer,
            synthesizer,
        }
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        self.synthesizer.tracker()
    }
}

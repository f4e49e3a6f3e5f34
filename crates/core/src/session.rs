//! Session affinity tracking.
//!
//! Each traffic source key maps to at most one live [`Session`]. A session is
//! reused while it is both recent and small; otherwise it is replaced.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default inactivity timeout (30 minutes).
pub const SESSION_TIMEOUT_SECS: u64 = 1800;

/// Default number of actions before a session is retired.
pub const SESSION_MAX_ACTIONS: u32 = 15;

/// Number of sessions included in introspection output.
pub const SESSION_SAMPLE_SIZE: usize = 10;

/// Session affinity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Inactivity timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Maximum actions per session
    #[serde(default = "default_max_actions")]
    pub max_actions: u32,
}

fn default_timeout_secs() -> u64 {
    SESSION_TIMEOUT_SECS
}

fn default_max_actions() -> u32 {
    SESSION_MAX_ACTIONS
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_actions: default_max_actions(),
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A session attributed to one source key.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub action_count: u32,
}

impl Session {
    fn new(now: Instant) -> Self {
        Self {
            id: new_session_id(),
            created_at: now,
            last_activity: now,
            action_count: 1,
        }
    }

    /// Checks whether the session may absorb another action at `now`.
    fn retirement(&self, now: Instant, config: &SessionConfig) -> Option<Rotation> {
        if now.saturating_duration_since(self.last_activity) >= config.timeout() {
            Some(Rotation::Expired)
        } else if self.action_count >= config.max_actions {
            Some(Rotation::Exhausted)
        } else {
            None
        }
    }

    fn record_action(&mut self, now: Instant) {
        self.last_activity = now;
        self.action_count += 1;
    }
}

/// Generates a session token: `sess_` followed by 12 hex characters.
pub fn new_session_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("sess_{}", &hex[..12])
}

/// Why a session was replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    /// Idle for longer than the timeout
    Expired,
    /// Reached the action limit
    Exhausted,
}

/// How a source key was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    /// First observation of the key
    Created,
    /// Existing session continued; carries the new action count
    Reused(u32),
    /// Existing session retired and replaced
    Rotated(Rotation),
}

/// Outcome of [`SessionTracker::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub session_id: String,
    pub kind: ResolutionKind,
}

/// Summary of one tracked session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Source key, truncated for display
    pub ip: String,
    pub session_id: String,
    pub actions: u32,
    pub age_sec: f64,
    pub last_active_sec: f64,
}

/// Tracker introspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerStats {
    pub total_active_sessions: usize,
    pub total_actions: u64,
    pub avg_actions_per_session: f64,
    pub session_sample: Vec<SessionSummary>,
}

/// Source-key indexed session store.
///
/// All reads and writes go through one lock, so a resolve is atomic across
/// its read-decide-write sequence.
#[derive(Debug, Default)]
pub struct SessionTracker {
    config: SessionConfig,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionTracker {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolves the session for `source_key` at `now`.
    pub fn resolve(&self, source_key: &str, now: Instant) -> Resolution {
        let mut sessions = self.sessions.lock();

        let kind = match sessions.get_mut(source_key) {
            Some(session) => match session.retirement(now, &self.config) {
                None => {
                    session.record_action(now);
                    return Resolution {
                        session_id: session.id.clone(),
                        kind: ResolutionKind::Reused(session.action_count),
                    };
                }
                Some(rotation) => ResolutionKind::Rotated(rotation),
            },
            None => ResolutionKind::Created,
        };

        let session = Session::new(now);
        let session_id = session.id.clone();
        sessions.insert(source_key.to_string(), session);

        Resolution { session_id, kind }
    }

    /// Returns a copy of the session currently held for `source_key`.
    pub fn session(&self, source_key: &str) -> Option<Session> {
        self.sessions.lock().get(source_key).cloned()
    }

    /// Number of source keys with a session.
    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Aggregate view plus up to `sample_size` sessions, oldest first.
    pub fn stats(&self, now: Instant, sample_size: usize) -> TrackerStats {
        let sessions = self.sessions.lock();

        let total = sessions.len();
        let total_actions: u64 = sessions.values().map(|s| u64::from(s.action_count)).sum();
        let avg = if total == 0 {
            0.0
        } else {
            round_to(total_actions as f64 / total as f64, 2)
        };

        let mut ordered: Vec<(&String, &Session)> = sessions.iter().collect();
        ordered.sort_by_key(|(_, s)| s.created_at);

        let session_sample = ordered
            .into_iter()
            .take(sample_size)
            .map(|(key, s)| SessionSummary {
                ip: truncate_key(key),
                session_id: s.id.clone(),
                actions: s.action_count,
                age_sec: round_to(now.saturating_duration_since(s.created_at).as_secs_f64(), 1),
                last_active_sec: round_to(
                    now.saturating_duration_since(s.last_activity).as_secs_f64(),
                    1,
                ),
            })
            .collect();

        TrackerStats {
            total_active_sessions: total,
            total_actions,
            avg_actions_per_session: avg,
            session_sample,
        }
    }
}

fn truncate_key(key: &str) -> String {
    if key.chars().count() > 20 {
        let head: String = key.chars().take(20).collect();
        format!("{head}...")
    } else {
        key.to_string()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

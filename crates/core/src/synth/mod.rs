//! Synthetic activity generation.
//!
//! A [`Synthesizer`] draws a traffic label and provenance profile, asks the
//! [`SessionTracker`] for a session, classifies the user agent, and builds
//! one [`ActivityRecord`] per emitted action.

pub mod config;

use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, Local, NaiveDateTime, Timelike};
use parking_lot::Mutex;
use rand::distributions::{Distribution, WeightedIndex};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use uuid::Uuid;

use crate::classify::classify;
use crate::error::{Error, Result};
use crate::record::{ActivityRecord, NO_AUTOMATION, TIMESTAMP_FORMAT, UNKNOWN};
use crate::session::{Resolution, SessionTracker};

pub use config::*;

/// Label and provenance drawn for one request.
#[derive(Debug, Clone)]
struct Profile {
    is_automated: bool,
    automation_kind: String,
    client_signature: String,
    source_address: Ipv4Addr,
}

/// A single synthesized event.
#[derive(Debug, Clone)]
pub struct SynthesizedEvent {
    pub record: ActivityRecord,
    /// Key the session was resolved under
    pub source_key: String,
    pub resolution: Resolution,
    /// Whether provenance was swapped for automation-pool values
    pub ambiguous: bool,
}

/// A multi-record visit under one session decision.
#[derive(Debug, Clone)]
pub struct Burst {
    pub session_id: String,
    pub is_automated: bool,
    pub source_address: String,
    pub resolution: Resolution,
    /// Records in timestamp order
    pub records: Vec<ActivityRecord>,
}

struct ActionTable {
    actions: Vec<ActionKind>,
    index: WeightedIndex<f64>,
}

impl ActionTable {
    fn new(table: &[WeightedAction]) -> Result<Self> {
        let index = WeightedIndex::new(table.iter().map(|w| w.weight))
            .map_err(|e| Error::config(format!("action weights: {e}")))?;
        Ok(Self {
            actions: table.iter().map(|w| w.action).collect(),
            index,
        })
    }

    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> ActionKind {
        self.actions[self.index.sample(rng)]
    }
}

/// Builds synthetic activity records.
pub struct Synthesizer {
    config: SynthConfig,
    tracker: Arc<SessionTracker>,
    automated_actions: ActionTable,
    human_actions: ActionTable,
    rng: Mutex<StdRng>,
}

impl Synthesizer {
    /// Creates a synthesizer, validating the configuration.
    pub fn new(config: SynthConfig, tracker: Arc<SessionTracker>) -> Result<Self> {
        let config = config.validated()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            automated_actions: ActionTable::new(&config.automated_actions)?,
            human_actions: ActionTable::new(&config.human_actions)?,
            config,
            tracker,
            rng: Mutex::new(rng),
        })
    }

    pub fn config(&self) -> &SynthConfig {
        &self.config
    }

    pub fn tracker(&self) -> &Arc<SessionTracker> {
        &self.tracker
    }

    /// Synthesizes one event.
    pub fn single_event(&self) -> SynthesizedEvent {
        let mut rng = self.rng.lock();
        let profile = self.draw_profile(&mut *rng);

        let source_key = self.source_key(&mut *rng, &profile);
        let resolution = self.tracker.resolve(&source_key, Instant::now());

        let action = self.actions_for(profile.is_automated).draw(&mut *rng);
        let timestamp = self.jittered_now(&mut *rng);
        let mut record = build_record(&profile, &resolution.session_id, action, timestamp);

        let ambiguous = !profile.is_automated && rng.gen_bool(self.config.ambiguous_ratio);
        if ambiguous {
            let signature = pick(&self.config.automated_agents, &mut *rng);
            let address = self
                .config
                .ambiguous_ranges()
                .choose(&mut *rng)
                .map(|r| r.sample(&mut *rng))
                .unwrap_or(profile.source_address);
            apply_provenance(&mut record, signature, address);
        }

        SynthesizedEvent {
            record,
            source_key,
            resolution,
            ambiguous,
        }
    }

    /// Synthesizes a burst of records sharing one session.
    pub fn burst(&self) -> Burst {
        let mut rng = self.rng.lock();
        let profile = self.draw_profile(&mut *rng);
        let range = if profile.is_automated {
            self.config.automated_burst
        } else {
            self.config.human_burst
        };
        let count = rng.gen_range(range.min..=range.max);

        let resolution = self
            .tracker
            .resolve(&profile.source_address.to_string(), Instant::now());

        let table = self.actions_for(profile.is_automated);
        let records = burst_times(&mut *rng, Local::now().naive_local(), count)
            .into_iter()
            .map(|at| build_record(&profile, &resolution.session_id, table.draw(&mut *rng), at))
            .collect();

        Burst {
            session_id: resolution.session_id.clone(),
            is_automated: profile.is_automated,
            source_address: profile.source_address.to_string(),
            resolution,
            records,
        }
    }

    fn draw_profile<R: Rng + ?Sized>(&self, rng: &mut R) -> Profile {
        let is_automated = rng.gen_bool(self.config.automated_ratio);
        let (kind, agents, ranges) = if is_automated {
            (
                pick(&self.config.automated_kinds, rng),
                &self.config.automated_agents,
                &self.config.automated_ranges,
            )
        } else {
            (
                NO_AUTOMATION.to_string(),
                &self.config.human_agents,
                &self.config.human_ranges,
            )
        };

        let client_signature = pick(agents, rng);
        let source_address = ranges
            .choose(rng)
            .map(|r| r.sample(rng))
            .unwrap_or(Ipv4Addr::UNSPECIFIED);

        Profile {
            is_automated,
            automation_kind: kind,
            client_signature,
            source_address,
        }
    }

    /// Session key for a single event: automated traffic mostly keeps its
    /// address; everything else sometimes gets a unique suffix.
    fn source_key<R: Rng + ?Sized>(&self, rng: &mut R, profile: &Profile) -> String {
        let address = profile.source_address.to_string();
        if profile.is_automated && rng.gen_bool(self.config.automated_affinity) {
            return address;
        }
        if rng.gen_bool(self.config.fresh_session_ratio) {
            let suffix: u32 = rng.gen_range(0..0x100_0000);
            format!("{address}_{suffix:06x}")
        } else {
            address
        }
    }

    fn actions_for(&self, is_automated: bool) -> &ActionTable {
        if is_automated {
            &self.automated_actions
        } else {
            &self.human_actions
        }
    }

    fn jittered_now<R: Rng + ?Sized>(&self, rng: &mut R) -> NaiveDateTime {
        let now = Local::now().naive_local();
        let bound = self.jitter_bound(now.hour());
        now + seconds(rng.gen_range(-bound..=bound))
    }

    /// Jitter half-width in seconds for a local hour.
    fn jitter_bound(&self, hour: u32) -> f64 {
        if self.config.business_hours.contains(hour) {
            self.config.business_jitter_secs
        } else {
            self.config.off_hours_jitter_secs
        }
    }
}

/// Timestamps for a burst: a short delay before the first record, then
/// gaps that widen with the record index. Strictly increasing.
fn burst_times<R: Rng + ?Sized>(rng: &mut R, base: NaiveDateTime, count: usize) -> Vec<NaiveDateTime> {
    let mut at = base + seconds(rng.gen_range(0.0..2.0));
    let mut times = Vec::with_capacity(count);

    for i in 0..count {
        if i > 0 {
            let ceiling = (2 * i).min(10) as f64;
            at += seconds(rng.gen_range(1.0..ceiling));
        }
        times.push(at);
    }
    times
}

fn build_record(
    profile: &Profile,
    session_id: &str,
    action: ActionKind,
    at: NaiveDateTime,
) -> ActivityRecord {
    let class = classify(&profile.client_signature);

    ActivityRecord {
        record_id: Uuid::new_v4().to_string(),
        session_id: session_id.to_string(),
        is_automated: profile.is_automated,
        automation_kind: profile.automation_kind.clone(),
        action_kind: action.as_str().to_string(),
        timestamp: at.format(TIMESTAMP_FORMAT).to_string(),
        source_address: profile.source_address.to_string(),
        client_signature: profile.client_signature.clone(),
        device_class: class.device.as_str().to_string(),
        client_family: class.client.as_str().to_string(),
        platform_family: class.platform.as_str().to_string(),
    }
}

/// Replaces provenance and recomputes the derived classification.
fn apply_provenance(record: &mut ActivityRecord, signature: String, address: Ipv4Addr) {
    let class = classify(&signature);
    record.client_signature = signature;
    record.source_address = address.to_string();
    record.device_class = class.device.as_str().to_string();
    record.client_family = class.client.as_str().to_string();
    record.platform_family = class.platform.as_str().to_string();
}

fn pick<R: Rng + ?Sized>(pool: &[String], rng: &mut R) -> String {
    pool.choose(rng)
        .cloned()
        .unwrap_or_else(|| UNKNOWN.to_string())
}

fn seconds(secs: f64) -> Duration {
    Duration::microseconds((secs * 1_000_000.0).round() as i64)
}

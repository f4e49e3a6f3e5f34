//! Running statistics over accepted records.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;
use stream_core::{ActivityRecord, NO_AUTOMATION};

/// Counters maintained by the consumer.
///
/// Only [`Aggregator::record`] mutates state; everything else reads it.
#[derive(Debug)]
pub struct Aggregator {
    total_events: u64,
    automated_events: u64,
    human_events: u64,
    by_action: HashMap<String, u64>,
    by_automation_kind: HashMap<String, u64>,
    by_device: HashMap<String, u64>,
    by_client: HashMap<String, u64>,
    by_platform: HashMap<String, u64>,
    events_per_session: HashMap<String, u64>,
    seen: HashSet<String>,
    last_report: Instant,
}

impl Aggregator {
    pub fn new(now: Instant) -> Self {
        Self {
            total_events: 0,
            automated_events: 0,
            human_events: 0,
            by_action: HashMap::new(),
            by_automation_kind: HashMap::new(),
            by_device: HashMap::new(),
            by_client: HashMap::new(),
            by_platform: HashMap::new(),
            events_per_session: HashMap::new(),
            seen: HashSet::new(),
            last_report: now,
        }
    }

    pub fn is_duplicate(&self, record_id: &str) -> bool {
        self.seen.contains(record_id)
    }

    /// Accounts for a persisted record. Returns `true` when its session is new.
    ///
    /// Callers check [`Aggregator::is_duplicate`] first; a repeated ID here
    /// is ignored.
    pub fn record(&mut self, record: &ActivityRecord) -> bool {
        if !self.seen.insert(record.record_id.clone()) {
            return false;
        }

        self.total_events += 1;
        if record.is_automated {
            self.automated_events += 1;
        } else {
            self.human_events += 1;
        }

        bump(&mut self.by_action, &record.action_kind);
        bump(&mut self.by_automation_kind, &record.automation_kind);
        bump(&mut self.by_device, &record.device_class);
        bump(&mut self.by_client, &record.client_family);
        bump(&mut self.by_platform, &record.platform_family);

        let count = self
            .events_per_session
            .entry(record.session_id.clone())
            .or_insert(0);
        *count += 1;
        *count == 1
    }

    pub fn total_events(&self) -> u64 {
        self.total_events
    }

    pub fn automated_events(&self) -> u64 {
        self.automated_events
    }

    pub fn unique_sessions(&self) -> usize {
        self.events_per_session.len()
    }

    /// Records accepted for `session_id` so far.
    pub fn session_events(&self, session_id: &str) -> u64 {
        self.events_per_session.get(session_id).copied().unwrap_or(0)
    }

    /// True on every `every`-th accepted record.
    pub fn progress_due(&self, every: u64) -> bool {
        every > 0 && self.total_events > 0 && self.total_events % every == 0
    }

    pub fn report_due(&self, now: Instant, interval: Duration) -> bool {
        now.saturating_duration_since(self.last_report) > interval
    }

    pub fn mark_reported(&mut self, now: Instant) {
        self.last_report = now;
    }

    pub fn snapshot(&self) -> AggregateSnapshot {
        let unique_sessions = self.events_per_session.len();
        let avg_events_per_session = if unique_sessions == 0 {
            0.0
        } else {
            self.total_events as f64 / unique_sessions as f64
        };

        AggregateSnapshot {
            total_events: self.total_events,
            automated_events: self.automated_events,
            human_events: self.human_events,
            unique_sessions,
            avg_events_per_session,
            by_action: sorted(&self.by_action),
            by_automation_kind: sorted(&self.by_automation_kind),
            by_device: sorted(&self.by_device),
            by_client: sorted(&self.by_client),
            by_platform: sorted(&self.by_platform),
        }
    }
}

fn bump(map: &mut HashMap<String, u64>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

fn sorted(map: &HashMap<String, u64>) -> BTreeMap<String, u64> {
    map.iter().map(|(k, v)| (k.clone(), *v)).collect()
}

/// Point-in-time copy of the aggregates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateSnapshot {
    pub total_events: u64,
    pub automated_events: u64,
    pub human_events: u64,
    pub unique_sessions: usize,
    pub avg_events_per_session: f64,
    pub by_action: BTreeMap<String, u64>,
    pub by_automation_kind: BTreeMap<String, u64>,
    pub by_device: BTreeMap<String, u64>,
    pub by_client: BTreeMap<String, u64>,
    pub by_platform: BTreeMap<String, u64>,
}

impl AggregateSnapshot {
    fn share(&self, n: u64) -> f64 {
        n as f64 / self.total_events.max(1) as f64 * 100.0
    }
}

/// Largest `limit` entries, ties broken by name.
fn top(map: &BTreeMap<String, u64>, limit: usize) -> Vec<(&str, u64)> {
    let mut entries: Vec<(&str, u64)> = map.iter().map(|(k, v)| (k.as_str(), *v)).collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
    entries.truncate(limit);
    entries
}

impl fmt::Display for AggregateSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{rule}")?;
        writeln!(f, "CONSUMER STATISTICS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Total events: {}", self.total_events)?;
        writeln!(
            f,
            "Automated: {} ({:.1}%)",
            self.automated_events,
            self.share(self.automated_events)
        )?;
        writeln!(
            f,
            "Human: {} ({:.1}%)",
            self.human_events,
            self.share(self.human_events)
        )?;

        if self.unique_sessions > 0 {
            writeln!(f, "Unique sessions: {}", self.unique_sessions)?;
            writeln!(f, "Mean events/session: {:.1}", self.avg_events_per_session)?;
        }

        if !self.by_device.is_empty() {
            let devices: Vec<String> = self.by_device.iter().map(|(k, v)| format!("{k}:{v}")).collect();
            writeln!(f, "Devices: {}", devices.join(", "))?;
        }

        if !self.by_action.is_empty() {
            writeln!(f, "Top actions:")?;
            for (action, n) in top(&self.by_action, 5) {
                writeln!(f, "  {action}: {n}")?;
            }
        }

        let kinds: Vec<_> = top(&self.by_automation_kind, 6)
            .into_iter()
            .filter(|(kind, _)| *kind != NO_AUTOMATION)
            .take(5)
            .collect();
        if !kinds.is_empty() {
            writeln!(f, "Top automation kinds:")?;
            for (kind, n) in kinds {
                writeln!(f, "  {kind}: {n}")?;
            }
        }

        write!(f, "{rule}")
    }
}

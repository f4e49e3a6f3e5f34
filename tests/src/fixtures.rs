//! Test fixtures.

use stream_core::synth::CountRange;
use stream_core::{ActivityRecord, SynthConfig};

/// A fully populated human record.
pub fn record(id: &str, session_id: &str) -> ActivityRecord {
    ActivityRecord {
        record_id: id.to_string(),
        session_id: session_id.to_string(),
        is_automated: false,
        automation_kind: "none".to_string(),
        action_kind: "page_view".to_string(),
        timestamp: "2025-12-11T10:30:25.123456".to_string(),
        source_address: "192.168.10.20".to_string(),
        client_signature: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
        device_class: "desktop".to_string(),
        client_family: "chrome".to_string(),
        platform_family: "windows".to_string(),
    }
}

/// Seeded default mix.
pub fn seeded_config(seed: u64) -> SynthConfig {
    SynthConfig {
        seed: Some(seed),
        ..SynthConfig::default()
    }
}

/// Every request is automated and every burst has exactly `count` records.
pub fn forced_automation(count: usize) -> SynthConfig {
    SynthConfig {
        automated_ratio: 1.0,
        automated_burst: CountRange::new(count, count),
        ..seeded_config(42)
    }
}

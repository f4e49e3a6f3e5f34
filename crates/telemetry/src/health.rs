//! Component health registry.
//!
//! Components start out pending. A component this process does not run is
//! marked disabled and left out of the report.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    pub fn is_serving(&self) -> bool {
        matches!(self, Self::Healthy | Self::Degraded)
    }
}

const PENDING: u8 = 0;
const HEALTHY: u8 = 1;
const UNHEALTHY: u8 = 2;
const DISABLED: u8 = 3;

/// Health of one pipeline component.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: AtomicU8,
    message: parking_lot::RwLock<Option<String>>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: AtomicU8::new(PENDING),
            message: parking_lot::RwLock::new(None),
        }
    }

    pub fn set_healthy(&self) {
        self.state.store(HEALTHY, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn set_unhealthy(&self, msg: impl Into<String>) {
        self.state.store(UNHEALTHY, Ordering::Relaxed);
        *self.message.write() = Some(msg.into());
    }

    pub fn set_disabled(&self) {
        self.state.store(DISABLED, Ordering::Relaxed);
        *self.message.write() = None;
    }

    pub fn is_healthy(&self) -> bool {
        self.state.load(Ordering::Relaxed) == HEALTHY
    }

    pub fn is_disabled(&self) -> bool {
        self.state.load(Ordering::Relaxed) == DISABLED
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn message(&self) -> Option<String> {
        self.message.read().clone()
    }

    fn report(&self) -> ComponentHealthReport {
        ComponentHealthReport {
            name: self.name.to_string(),
            healthy: self.is_healthy(),
            message: self.message(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    pub message: Option<String>,
}

/// Stream channel and record log health.
pub struct HealthRegistry {
    pub redpanda: ComponentHealth,
    pub record_store: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            redpanda: ComponentHealth::new("redpanda"),
            record_store: ComponentHealth::new("record_store"),
        }
    }

    fn active(&self) -> impl Iterator<Item = &ComponentHealth> {
        [&self.redpanda, &self.record_store]
            .into_iter()
            .filter(|c| !c.is_disabled())
    }

    pub fn report(&self) -> HealthReport {
        let components: Vec<_> = self.active().map(ComponentHealth::report).collect();

        let healthy = components.iter().filter(|c| c.healthy).count();
        let status = if healthy == components.len() {
            HealthStatus::Healthy
        } else if healthy > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        };

        HealthReport { status, components }
    }

    /// Ready once every component this process runs is healthy.
    pub fn is_ready(&self) -> bool {
        self.active().all(ComponentHealth::is_healthy)
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub static HEALTH: std::sync::LazyLock<HealthRegistry> =
    std::sync::LazyLock::new(HealthRegistry::new);

pub fn health() -> &'static HealthRegistry {
    &HEALTH
}

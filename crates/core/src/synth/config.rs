//! Synthesizer configuration: label ratios, weight tables, and provenance pools.

use std::net::Ipv4Addr;

use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};

/// Action vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    PageView,
    Click,
    Scroll,
    Search,
    Login,
}

impl ActionKind {
    pub const ALL: [ActionKind; 5] = [
        Self::PageView,
        Self::Click,
        Self::Scroll,
        Self::Search,
        Self::Login,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::Search => "search",
            Self::Login => "login",
        }
    }
}

/// One entry of an action weight table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedAction {
    pub action: ActionKind,
    pub weight: f64,
}

/// Inclusive range of record counts for a burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: usize,
    pub max: usize,
}

impl CountRange {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// Inclusive local-time hour window. `start > end` wraps past midnight,
/// so `22..=6` covers the night shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourWindow {
    pub start: u32,
    pub end: u32,
}

impl HourWindow {
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

/// IPv4 range sampled octet by octet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    pub start: Ipv4Addr,
    pub end: Ipv4Addr,
}

impl IpRange {
    pub const fn new(start: Ipv4Addr, end: Ipv4Addr) -> Self {
        Self { start, end }
    }

    /// Draws each octet independently between the matching start and end octets.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Ipv4Addr {
        let (s, e) = (self.start.octets(), self.end.octets());
        let mut octets = [0u8; 4];
        for i in 0..4 {
            octets[i] = if s[i] >= e[i] { s[i] } else { rng.gen_range(s[i]..=e[i]) };
        }
        Ipv4Addr::from(octets)
    }

    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let (s, e, a) = (self.start.octets(), self.end.octets(), addr.octets());
        (0..4).all(|i| s[i] <= a[i] && a[i] <= e[i])
    }

    fn is_ordered(&self) -> bool {
        let (s, e) = (self.start.octets(), self.end.octets());
        (0..4).all(|i| s[i] <= e[i])
    }
}

/// Largest accepted timestamp jitter, one day either way.
pub const MAX_JITTER_SECS: f64 = 86_400.0;

/// Event synthesizer configuration.
///
/// Defaults reproduce the reference traffic mix.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_ambiguous_offset"))]
pub struct SynthConfig {
    /// Probability that a request produces automated traffic
    #[serde(default = "default_automated_ratio")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub automated_ratio: f64,
    /// Probability that automated traffic keeps its plain address as session key
    #[serde(default = "default_automated_affinity")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub automated_affinity: f64,
    /// Probability of a unique key suffix (forced new session) otherwise
    #[serde(default = "default_fresh_session_ratio")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub fresh_session_ratio: f64,
    /// Probability that a non-automated single event gets automation provenance
    #[serde(default = "default_ambiguous_ratio")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub ambiguous_ratio: f64,
    /// First automated address range used for ambiguous traffic
    #[serde(default = "default_ambiguous_range_offset")]
    pub ambiguous_range_offset: usize,

    #[serde(default = "default_automated_burst")]
    #[validate(custom(function = "validate_count_range"))]
    pub automated_burst: CountRange,
    #[serde(default = "default_human_burst")]
    #[validate(custom(function = "validate_count_range"))]
    pub human_burst: CountRange,

    /// Local hours with tighter timestamp jitter
    #[serde(default = "default_business_hours")]
    #[validate(custom(function = "validate_hour_window"))]
    pub business_hours: HourWindow,
    /// Timestamp jitter bound inside business hours, at most [`MAX_JITTER_SECS`]
    #[serde(default = "default_business_jitter_secs")]
    #[validate(custom(function = "validate_jitter"))]
    pub business_jitter_secs: f64,
    #[serde(default = "default_off_hours_jitter_secs")]
    #[validate(custom(function = "validate_jitter"))]
    pub off_hours_jitter_secs: f64,

    #[serde(default = "default_actions")]
    #[validate(custom(function = "validate_weights"))]
    pub automated_actions: Vec<WeightedAction>,
    #[serde(default = "default_actions")]
    #[validate(custom(function = "validate_weights"))]
    pub human_actions: Vec<WeightedAction>,

    #[serde(default = "default_automated_kinds")]
    #[validate(length(min = 1))]
    pub automated_kinds: Vec<String>,
    #[serde(default = "default_automated_agents")]
    #[validate(length(min = 1))]
    pub automated_agents: Vec<String>,
    #[serde(default = "default_human_agents")]
    #[validate(length(min = 1))]
    pub human_agents: Vec<String>,
    #[serde(default = "default_automated_ranges")]
    #[validate(length(min = 1), custom(function = "validate_ranges"))]
    pub automated_ranges: Vec<IpRange>,
    #[serde(default = "default_human_ranges")]
    #[validate(length(min = 1), custom(function = "validate_ranges"))]
    pub human_ranges: Vec<IpRange>,

    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_automated_ratio() -> f64 {
    0.3
}

fn default_automated_affinity() -> f64 {
    0.8
}

fn default_fresh_session_ratio() -> f64 {
    0.4
}

fn default_ambiguous_ratio() -> f64 {
    0.05
}

fn default_ambiguous_range_offset() -> usize {
    3
}

fn default_automated_burst() -> CountRange {
    CountRange::new(3, 8)
}

fn default_human_burst() -> CountRange {
    CountRange::new(1, 4)
}

fn default_business_hours() -> HourWindow {
    HourWindow { start: 9, end: 17 }
}

fn default_business_jitter_secs() -> f64 {
    10.0
}

fn default_off_hours_jitter_secs() -> f64 {
    30.0
}

fn default_actions() -> Vec<WeightedAction> {
    [40.0, 25.0, 20.0, 10.0, 5.0]
        .into_iter()
        .zip(ActionKind::ALL)
        .map(|(weight, action)| WeightedAction { action, weight })
        .collect()
}

fn default_automated_kinds() -> Vec<String> {
    [
        "scraper_bot",
        "selenium_bot",
        "curl_bot",
        "python_requests_bot",
        "googlebot",
        "bingbot",
        "yandex_bot",
        "facebook_externalhit",
        "twitterbot",
    ]
    .map(String::from)
    .to_vec()
}

fn default_human_agents() -> Vec<String> {
    [
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
        "Mozilla/5.0 (Linux; Android 11; SM-A505F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.6045.163 Mobile Safari/537.36",
        "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    ]
    .map(String::from)
    .to_vec()
}

fn default_automated_agents() -> Vec<String> {
    [
        "python-requests/2.31.0",
        "curl/7.88.1",
        "Selenium/Chrome/120.0.6099.109",
        "Go-http-client/2.0",
        "Googlebot/2.1 (+http://www.google.com/bot.html)",
        "Mozilla/5.0 (compatible; Bingbot/2.0; +http://www.bing.com/bingbot.htm)",
        "Mozilla/5.0 AppleWebKit/537.36 (KHTML, like Gecko; compatible; Googlebot/2.1; +http://www.google.com/bot.html) Chrome/120.0.6099.108 Safari/537.36",
        "facebookexternalhit/1.1 (+http://www.facebook.com/externalhit_uatext.php)",
    ]
    .map(String::from)
    .to_vec()
}

fn default_automated_ranges() -> Vec<IpRange> {
    vec![
        IpRange::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 255, 255, 255)),
        IpRange::new(Ipv4Addr::new(172, 16, 0, 0), Ipv4Addr::new(172, 31, 255, 255)),
        IpRange::new(Ipv4Addr::new(192, 168, 0, 0), Ipv4Addr::new(192, 168, 255, 255)),
        IpRange::new(Ipv4Addr::new(66, 249, 64, 0), Ipv4Addr::new(66, 249, 95, 255)),
        IpRange::new(Ipv4Addr::new(157, 55, 39, 0), Ipv4Addr::new(157, 55, 39, 255)),
    ]
}

fn default_human_ranges() -> Vec<IpRange> {
    vec![
        IpRange::new(Ipv4Addr::new(192, 168, 0, 0), Ipv4Addr::new(192, 168, 255, 255)),
        IpRange::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 255, 255)),
        IpRange::new(Ipv4Addr::new(172, 16, 0, 0), Ipv4Addr::new(172, 16, 255, 255)),
    ]
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            automated_ratio: default_automated_ratio(),
            automated_affinity: default_automated_affinity(),
            fresh_session_ratio: default_fresh_session_ratio(),
            ambiguous_ratio: default_ambiguous_ratio(),
            ambiguous_range_offset: default_ambiguous_range_offset(),
            automated_burst: default_automated_burst(),
            human_burst: default_human_burst(),
            business_hours: default_business_hours(),
            business_jitter_secs: default_business_jitter_secs(),
            off_hours_jitter_secs: default_off_hours_jitter_secs(),
            automated_actions: default_actions(),
            human_actions: default_actions(),
            automated_kinds: default_automated_kinds(),
            automated_agents: default_automated_agents(),
            human_agents: default_human_agents(),
            automated_ranges: default_automated_ranges(),
            human_ranges: default_human_ranges(),
            seed: None,
        }
    }
}

impl SynthConfig {
    /// Validates the configuration, mapping failures to a config error.
    pub fn validated(self) -> Result<Self> {
        self.validate()
            .map_err(|e| Error::config(format!("synth: {e}")))?;
        Ok(self)
    }

    /// Address ranges used for ambiguous (mislabeled) traffic.
    pub fn ambiguous_ranges(&self) -> &[IpRange] {
        &self.automated_ranges[self.ambiguous_range_offset..]
    }
}

fn validate_count_range(range: &CountRange) -> std::result::Result<(), ValidationError> {
    if range.min == 0 || range.min > range.max {
        return Err(ValidationError::new("count_range"));
    }
    Ok(())
}

fn validate_hour_window(window: &HourWindow) -> std::result::Result<(), ValidationError> {
    if window.start > 23 || window.end > 23 {
        return Err(ValidationError::new("hour_window"));
    }
    Ok(())
}

fn validate_jitter(secs: f64) -> std::result::Result<(), ValidationError> {
    if secs.is_finite() && (0.0..=MAX_JITTER_SECS).contains(&secs) {
        Ok(())
    } else {
        Err(ValidationError::new("jitter_secs"))
    }
}

fn validate_weights(table: &[WeightedAction]) -> std::result::Result<(), ValidationError> {
    let valid = !table.is_empty()
        && table.iter().all(|w| w.weight.is_finite() && w.weight >= 0.0)
        && table.iter().map(|w| w.weight).sum::<f64>() > 0.0;
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("weights"))
    }
}

fn validate_ranges(ranges: &[IpRange]) -> std::result::Result<(), ValidationError> {
    if ranges.iter().all(IpRange::is_ordered) {
        Ok(())
    } else {
        Err(ValidationError::new("ip_range_order"))
    }
}

fn validate_ambiguous_offset(config: &SynthConfig) -> std::result::Result<(), ValidationError> {
    if config.ambiguous_range_offset < config.automated_ranges.len() {
        Ok(())
    } else {
        Err(ValidationError::new("ambiguous_range_offset"))
    }
}

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SourceHealth;

pub const MAX_RETRY_LIMIT: u32 = 3;
pub const MAX_RETRY_DELAY_SECS: f64 = 30.0;
pub const MAX_FEED_PROBE_LIMIT: usize = 20;
pub const MAX_HTML_SCAN_LIMIT: usize = 2000;

/// A configured origin site.
///
/// Read-only while a run is in flight; only the post-run write-back pass
/// touches `rss` and `health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    pub name: String,
    pub homepage: String,
    #[serde(default)]
    pub rss: RssSettings,
    #[serde(default)]
    pub crawl: CrawlPolicy,
    #[serde(default)]
    pub health: SourceHealth,
}

impl SourceConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, homepage: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            homepage: homepage.into(),
            rss: RssSettings::default(),
            crawl: CrawlPolicy::default(),
            health: SourceHealth::default(),
        }
    }

    /// Configured feed URL, ignoring blank values.
    pub fn seed_feed(&self) -> Option<&str> {
        self.rss
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    pub fn max_items(&self, default_max: usize) -> usize {
        self.crawl.max_items.unwrap_or(default_max)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    #[default]
    Unknown,
    Candidate,
    Confirmed,
    NotFound,
    Invalid,
}

impl FeedStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedStatus::Unknown => "unknown",
            FeedStatus::Candidate => "candidate",
            FeedStatus::Confirmed => "confirmed",
            FeedStatus::NotFound => "not_found",
            FeedStatus::Invalid => "invalid",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RssSettings {
    /// Seed feed URL
    pub url: Option<String>,
    pub candidates: Vec<String>,
    pub status: FeedStatus,
    pub checked_at: Option<DateTime<Utc>>,
    pub check_method: String,
}

/// Per-source crawl policy. Out-of-range values are clamped by the accessors, never rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlPolicy {
    pub max_items: Option<usize>,
    pub retry_on_failure: u32,
    pub retry_delay_seconds: f64,
    pub feed_probe_limit: usize,
    pub html_scan_limit: usize,
    pub health_thresholds: HealthThresholds,
    pub cooldown_minutes: CooldownMinutes,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            max_items: None,
            retry_on_failure: 1,
            retry_delay_seconds: 2.0,
            feed_probe_limit: 8,
            html_scan_limit: 500,
            health_thresholds: HealthThresholds::default(),
            cooldown_minutes: CooldownMinutes::default(),
        }
    }
}

impl CrawlPolicy {
    pub fn retry_limit(&self) -> u32 {
        self.retry_on_failure.min(MAX_RETRY_LIMIT)
    }

    /// Backoff before retry `attempt` (1-based): `base * 2^(attempt-1)`.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let base = if self.retry_delay_seconds.is_finite() {
            self.retry_delay_seconds.clamp(0.0, MAX_RETRY_DELAY_SECS)
        } else {
            0.0
        };
        let exponent = attempt.saturating_sub(1).min(MAX_RETRY_LIMIT) as i32;
        Duration::from_secs_f64(base * 2f64.powi(exponent))
    }

    pub fn probe_limit(&self) -> usize {
        self.feed_probe_limit.clamp(1, MAX_FEED_PROBE_LIMIT)
    }

    /// Anchors to inspect; never fewer than `max_items`.
    pub fn scan_limit(&self, max_items: usize) -> usize {
        max_items.max(self.html_scan_limit.min(MAX_HTML_SCAN_LIMIT))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub degraded_after_failures: u32,
    pub unhealthy_after_failures: u32,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            degraded_after_failures: 2,
            unhealthy_after_failures: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CooldownMinutes {
    pub degraded: u64,
    pub unhealthy: u64,
}

impl Default for CooldownMinutes {
    fn default() -> Self {
        Self {
            degraded: 60,
            unhealthy: 360,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_values() {
        let policy = CrawlPolicy::default();
        assert_eq!(policy.retry_limit(), 1);
        assert_eq!(policy.probe_limit(), 8);
        assert_eq!(policy.scan_limit(20), 500);
        assert_eq!(policy.retry_delay(1), Duration::from_secs(2));
    }

    #[test]
    fn test_policy_clamps_out_of_range() {
        let policy = CrawlPolicy {
            retry_on_failure: 9,
            retry_delay_seconds: 120.0,
            feed_probe_limit: 0,
            html_scan_limit: 50_000,
            ..Default::default()
        };
        assert_eq!(policy.retry_limit(), 3);
        assert_eq!(policy.probe_limit(), 1);
        assert_eq!(policy.scan_limit(10), 2000);
        assert_eq!(policy.retry_delay(1), Duration::from_secs(30));
        assert_eq!(policy.retry_delay(3), Duration::from_secs(120));
    }

    #[test]
    fn test_scan_limit_never_below_max_items() {
        let policy = CrawlPolicy {
            html_scan_limit: 5,
            ..Default::default()
        };
        assert_eq!(policy.scan_limit(40), 40);
    }

    #[test]
    fn test_negative_delay_is_zero() {
        let policy = CrawlPolicy {
            retry_delay_seconds: -4.0,
            ..Default::default()
        };
        assert_eq!(policy.retry_delay(2), Duration::ZERO);
    }

    #[test]
    fn test_seed_feed_ignores_blank() {
        let mut source = SourceConfig::new("a", "A", "https://a.example/");
        source.rss.url = Some("   ".into());
        assert!(source.seed_feed().is_none());
        source.rss.url = Some(" https://a.example/feed.xml ".into());
        assert_eq!(source.seed_feed(), Some("https://a.example/feed.xml"));
    }
}

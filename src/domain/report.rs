use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{FeedStatus, HealthLevel, SourceConfig};

/// Terminal outcome of one source in one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    Empty,
    Error,
    SkippedCooldown,
}

impl SourceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceStatus::Ok => "ok",
            SourceStatus::Empty => "empty",
            SourceStatus::Error => "error",
            SourceStatus::SkippedCooldown => "skipped_cooldown",
        }
    }

    /// `ok` and `empty` both count as a successful contact.
    pub fn is_success(&self) -> bool {
        matches!(self, SourceStatus::Ok | SourceStatus::Empty)
    }
}

/// Which branch of the collection chain produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMode {
    RssConfig,
    RssDiscovered,
    Html,
    HtmlFallback,
    Skipped,
    Error,
}

impl CollectMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectMode::RssConfig => "rss_config",
            CollectMode::RssDiscovered => "rss_discovered",
            CollectMode::Html => "html",
            CollectMode::HtmlFallback => "html_fallback",
            CollectMode::Skipped => "skipped",
            CollectMode::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source_id: String,
    pub source_name: String,
    pub homepage: String,
    pub mode: CollectMode,
    pub feed_url: Option<String>,
    pub feed_status: FeedStatus,
    pub check_method: String,
    pub status: SourceStatus,
    pub item_count: usize,
    pub checked_at: DateTime<Utc>,
    /// `"; "`-joined trail of every failure seen for this source
    pub error: String,
    pub retry_attempted: bool,
    pub retry_succeeded: bool,
    pub retry_count: u32,
    pub skip_reason: String,
    pub health_level: HealthLevel,
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl SourceReport {
    /// Report skeleton carrying the source's stored health.
    pub fn for_source(source: &SourceConfig, mode: CollectMode, status: SourceStatus) -> Self {
        Self {
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            homepage: source.homepage.clone(),
            mode,
            feed_url: None,
            feed_status: FeedStatus::Unknown,
            check_method: String::new(),
            status,
            item_count: 0,
            checked_at: Utc::now(),
            error: String::new(),
            retry_attempted: false,
            retry_succeeded: false,
            retry_count: 0,
            skip_reason: String::new(),
            health_level: source.health.level,
            cooldown_until: source.health.cooldown_until,
        }
    }

    /// A source whose collection failed outside the normal chain.
    pub fn failed(source: &SourceConfig, reason: impl Into<String>) -> Self {
        let mut report = Self::for_source(source, CollectMode::Error, SourceStatus::Error);
        report.feed_status = FeedStatus::Invalid;
        report.check_method = "exception".to_string();
        report.error = reason.into();
        report
    }

    /// A source left alone because its cooldown has not expired.
    pub fn skipped(source: &SourceConfig) -> Self {
        let mut report = Self::for_source(source, CollectMode::Skipped, SourceStatus::SkippedCooldown);
        report.feed_url = source.seed_feed().map(str::to_string);
        report.feed_status = source.rss.status;
        report.check_method = "cooldown".to_string();
        report.skip_reason = match source.health.cooldown_until {
            Some(until) => format!("cooldown_until:{}", until.to_rfc3339()),
            None => "cooldown_active".to_string(),
        };
        report
    }
}

/// Append `entry` to a `"; "`-joined failure trail.
pub fn append_trail(trail: &mut String, entry: &str) {
    if entry.is_empty() {
        return;
    }
    if !trail.is_empty() {
        trail.push_str("; ");
    }
    trail.push_str(entry);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_append_trail() {
        let mut trail = String::new();
        append_trail(&mut trail, "");
        assert_eq!(trail, "");
        append_trail(&mut trail, "rss_config_failed: boom");
        append_trail(&mut trail, "html_failed: http_503");
        assert_eq!(trail, "rss_config_failed: boom; html_failed: http_503");
    }

    #[test]
    fn test_skipped_report_carries_cooldown() {
        let mut source = SourceConfig::new("s", "S", "https://s.example/");
        let until = Utc::now() + Duration::hours(1);
        source.health.level = HealthLevel::Degraded;
        source.health.cooldown_until = Some(until);

        let report = SourceReport::skipped(&source);
        assert_eq!(report.status, SourceStatus::SkippedCooldown);
        assert_eq!(report.item_count, 0);
        assert_eq!(report.health_level, HealthLevel::Degraded);
        assert_eq!(report.cooldown_until, Some(until));
        assert!(report.skip_reason.starts_with("cooldown_until:"));
    }
}

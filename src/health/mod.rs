//! Per-source health and cooldown transitions.
//!
//! Pure functions over [`SourceHealth`]; the caller decides when to persist.

use chrono::Duration;

use crate::domain::{CrawlPolicy, HealthLevel, SourceHealth, SourceReport, SourceStatus};

const MAX_FAILURE_THRESHOLD: u32 = 20;
const MAX_DEGRADED_COOLDOWN_MINUTES: u64 = 7 * 24 * 60;
const MAX_UNHEALTHY_COOLDOWN_MINUTES: u64 = 14 * 24 * 60;
const MAX_RETRY_COUNT: u32 = 3;

/// Thresholds and cooldowns after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    pub degraded_after: u32,
    pub unhealthy_after: u32,
    pub degraded_cooldown: Duration,
    pub unhealthy_cooldown: Duration,
}

impl HealthPolicy {
    pub fn from_crawl(crawl: &CrawlPolicy) -> Self {
        let thresholds = &crawl.health_thresholds;
        let degraded_after = thresholds
            .degraded_after_failures
            .clamp(1, MAX_FAILURE_THRESHOLD);
        let unhealthy_after = thresholds
            .unhealthy_after_failures
            .clamp(degraded_after, MAX_FAILURE_THRESHOLD);

        let cooldown = &crawl.cooldown_minutes;
        let minutes = |value: u64, max: u64| Duration::minutes(value.min(max) as i64);

        Self {
            degraded_after,
            unhealthy_after,
            degraded_cooldown: minutes(cooldown.degraded, MAX_DEGRADED_COOLDOWN_MINUTES),
            unhealthy_cooldown: minutes(cooldown.unhealthy, MAX_UNHEALTHY_COOLDOWN_MINUTES),
        }
    }

    pub fn level_for(&self, consecutive_failures: u32) -> HealthLevel {
        if consecutive_failures >= self.unhealthy_after {
            HealthLevel::Unhealthy
        } else if consecutive_failures >= self.degraded_after {
            HealthLevel::Degraded
        } else {
            HealthLevel::Healthy
        }
    }

    fn cooldown_for(&self, level: HealthLevel) -> Duration {
        match level {
            HealthLevel::Healthy => Duration::zero(),
            HealthLevel::Degraded => self.degraded_cooldown,
            HealthLevel::Unhealthy => self.unhealthy_cooldown,
        }
    }
}

/// Next health state of a source given this run's report.
pub fn transition(previous: &SourceHealth, report: &SourceReport, policy: &HealthPolicy) -> SourceHealth {
    let mut next = previous.clone();

    match report.status {
        SourceStatus::Ok | SourceStatus::Empty => {
            next.consecutive_failures = 0;
            next.level = HealthLevel::Healthy;
            next.cooldown_until = None;
            next.last_success_at = Some(report.checked_at);
            next.last_error.clear();
        }
        SourceStatus::Error => {
            next.consecutive_failures = previous.consecutive_failures.saturating_add(1);
            next.level = policy.level_for(next.consecutive_failures);
            let cooldown = policy.cooldown_for(next.level);
            next.cooldown_until = if cooldown > Duration::zero() {
                Some(report.checked_at + cooldown)
            } else {
                None
            };
            next.last_error = report.error.clone();
        }
        SourceStatus::SkippedCooldown => {
            next.cooldown_until = report.cooldown_until.or(previous.cooldown_until);
            next.level = report.health_level;
        }
    }

    next.last_status = Some(report.status);
    next.last_checked_at = Some(report.checked_at);
    next.retry_attempted = report.retry_attempted;
    next.retry_succeeded = report.retry_succeeded;
    next.retry_count = report.retry_count.min(MAX_RETRY_COUNT);
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CollectMode, SourceConfig};

    fn report(status: SourceStatus) -> SourceReport {
        let source = SourceConfig::new("s", "S", "https://s.dev/");
        let mut report = SourceReport::for_source(&source, CollectMode::Html, status);
        if status == SourceStatus::Error {
            report.error = "html_failed: http_503".to_string();
        }
        report
    }

    fn policy(degraded: u32, unhealthy: u32) -> HealthPolicy {
        let mut crawl = CrawlPolicy::default();
        crawl.health_thresholds.degraded_after_failures = degraded;
        crawl.health_thresholds.unhealthy_after_failures = unhealthy;
        HealthPolicy::from_crawl(&crawl)
    }

    #[test]
    fn test_policy_clamps() {
        let mut crawl = CrawlPolicy::default();
        crawl.health_thresholds.degraded_after_failures = 0;
        crawl.health_thresholds.unhealthy_after_failures = 99;
        crawl.cooldown_minutes.degraded = 100_000;
        crawl.cooldown_minutes.unhealthy = 100_000;
        let policy = HealthPolicy::from_crawl(&crawl);
        assert_eq!(policy.degraded_after, 1);
        assert_eq!(policy.unhealthy_after, 20);
        assert_eq!(policy.degraded_cooldown, Duration::days(7));
        assert_eq!(policy.unhealthy_cooldown, Duration::days(14));

        let inverted = self::policy(5, 3);
        assert_eq!(inverted.unhealthy_after, 5);
    }

    #[test]
    fn test_error_escalation_with_equal_thresholds() {
        let policy = policy(2, 2);
        let failure = report(SourceStatus::Error);

        let once = transition(&SourceHealth::default(), &failure, &policy);
        assert_eq!(once.consecutive_failures, 1);
        assert_eq!(once.level, HealthLevel::Healthy);
        assert!(once.cooldown_until.is_none());

        let twice = transition(&once, &failure, &policy);
        assert_eq!(twice.level, HealthLevel::Unhealthy);
        assert_eq!(twice.cooldown_until, Some(failure.checked_at + Duration::minutes(360)));
        assert_eq!(twice.last_error, "html_failed: http_503");
        assert_eq!(twice.last_status, Some(SourceStatus::Error));
    }

    #[test]
    fn test_default_thresholds_step_through_levels() {
        let policy = HealthPolicy::from_crawl(&CrawlPolicy::default());
        let failure = report(SourceStatus::Error);
        let mut health = SourceHealth::default();
        let mut levels = Vec::new();
        for _ in 0..4 {
            health = transition(&health, &failure, &policy);
            levels.push(health.level);
        }
        assert_eq!(
            levels,
            vec![
                HealthLevel::Healthy,
                HealthLevel::Degraded,
                HealthLevel::Degraded,
                HealthLevel::Unhealthy
            ]
        );
        assert_eq!(health.cooldown_until, Some(failure.checked_at + Duration::minutes(360)));
    }

    #[test]
    fn test_success_resets() {
        let previous = SourceHealth {
            level: HealthLevel::Unhealthy,
            consecutive_failures: 7,
            cooldown_until: Some(chrono::Utc::now()),
            last_error: "boom".into(),
            ..SourceHealth::default()
        };
        for status in [SourceStatus::Ok, SourceStatus::Empty] {
            let outcome = report(status);
            let next = transition(&previous, &outcome, &policy(2, 4));
            assert_eq!(next.consecutive_failures, 0);
            assert_eq!(next.level, HealthLevel::Healthy);
            assert!(next.cooldown_until.is_none());
            assert!(next.last_error.is_empty());
            assert_eq!(next.last_success_at, Some(outcome.checked_at));
        }
    }

    #[test]
    fn test_zero_cooldown_leaves_no_window() {
        let mut crawl = CrawlPolicy::default();
        crawl.health_thresholds.degraded_after_failures = 1;
        crawl.cooldown_minutes.degraded = 0;
        let next = transition(
            &SourceHealth::default(),
            &report(SourceStatus::Error),
            &HealthPolicy::from_crawl(&crawl),
        );
        assert_eq!(next.level, HealthLevel::Degraded);
        assert!(next.cooldown_until.is_none());
    }

    #[test]
    fn test_skipped_carries_over_and_copies_retry_bookkeeping() {
        let until = chrono::Utc::now() + Duration::minutes(30);
        let previous = SourceHealth {
            level: HealthLevel::Degraded,
            consecutive_failures: 2,
            cooldown_until: Some(until),
            ..SourceHealth::default()
        };
        let mut skipped = report(SourceStatus::SkippedCooldown);
        skipped.health_level = HealthLevel::Degraded;
        skipped.cooldown_until = None;
        skipped.retry_count = 9;

        let next = transition(&previous, &skipped, &policy(2, 4));
        assert_eq!(next.consecutive_failures, 2);
        assert_eq!(next.level, HealthLevel::Degraded);
        assert_eq!(next.cooldown_until, Some(until));
        assert_eq!(next.retry_count, 3);
        assert_eq!(next.last_status, Some(SourceStatus::SkippedCooldown));
    }
}

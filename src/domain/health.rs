use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::SourceStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    #[default]
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLevel::Healthy => "healthy",
            HealthLevel::Degraded => "degraded",
            HealthLevel::Unhealthy => "unhealthy",
        }
    }
}

/// Failure streak and cooldown bookkeeping stored on each source record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceHealth {
    pub level: HealthLevel,
    pub consecutive_failures: u32,
    /// Only set while `level` is not healthy
    pub cooldown_until: Option<DateTime<Utc>>,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_error: String,
    pub last_status: Option<SourceStatus>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub retry_attempted: bool,
    pub retry_succeeded: bool,
    pub retry_count: u32,
}

impl SourceHealth {
    /// Whether the source must not be contacted at `now`.
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.cooldown_until.is_some_and(|until| until > now)
    }
}

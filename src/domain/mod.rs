pub mod health;
pub mod item;
pub mod report;
pub mod source;

pub use health::{HealthLevel, SourceHealth};
pub use item::{CollectedItem, Provenance};
pub use report::{append_trail, CollectMode, SourceReport, SourceStatus};
pub use source::{CooldownMinutes, CrawlPolicy, FeedStatus, HealthThresholds, RssSettings, SourceConfig};

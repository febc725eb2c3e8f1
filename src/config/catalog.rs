//! The source catalog: one `[[sources]]` table per configured origin.
//!
//! Loaded and validated once at startup. After a collection or audit run the
//! single-threaded write-back pass updates feed settings and health, then
//! [`SourceCatalog::save`] replaces the file atomically.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::ConfigError;
use crate::domain::{FeedStatus, SourceConfig, SourceReport, SourceStatus};
use crate::feed::FeedDiscoveryResult;
use crate::health::{transition, HealthPolicy};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceCatalog {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl SourceCatalog {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let catalog: SourceCatalog = toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject records that cannot be collected: blank id or name, duplicate
    /// id, or a homepage that is not an absolute http(s) URL.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for source in &self.sources {
            let invalid = |reason: &str| ConfigError::InvalidSource {
                id: source.id.clone(),
                reason: reason.to_string(),
            };

            if source.id.trim().is_empty() {
                return Err(invalid("empty id"));
            }
            if source.name.trim().is_empty() {
                return Err(invalid("empty name"));
            }
            match Url::parse(source.homepage.trim()) {
                Ok(url) if matches!(url.scheme(), "http" | "https") && url.host_str().is_some() => {}
                _ => return Err(invalid("homepage must be an absolute http(s) URL")),
            }
            if !seen.insert(source.id.trim()) {
                return Err(invalid("duplicate id"));
            }
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&SourceConfig> {
        self.sources.iter().find(|source| source.id == id)
    }

    /// Write the catalog next to `path` and rename it into place.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;

        let tmp = temp_path(path);
        fs::write(&tmp, content).map_err(|e| ConfigError::Io {
            path: tmp.clone(),
            source: e,
        })?;
        fs::rename(&tmp, path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        })?;

        tracing::info!("Saved {} sources to {}", self.sources.len(), path.display());
        Ok(())
    }

    /// Fold a collection run back into the catalog.
    ///
    /// Each report's `health_level` and `cooldown_until` are refreshed from
    /// the new health state.
    pub fn apply_reports(&mut self, reports: &mut HashMap<String, SourceReport>) {
        for source in &mut self.sources {
            let Some(report) = reports.get_mut(&source.id) else {
                continue;
            };
            apply_feed_update(source, report);

            let policy = HealthPolicy::from_crawl(&source.crawl);
            source.health = transition(&source.health, report, &policy);
            report.health_level = source.health.level;
            report.cooldown_until = source.health.cooldown_until;
        }
    }

    /// Record audit discoveries: confirmed feeds are kept, misses fall back
    /// to `candidate` when candidates are configured and `unknown` otherwise.
    pub fn apply_discoveries(&mut self, results: &HashMap<String, FeedDiscoveryResult>) {
        for source in &mut self.sources {
            let Some(result) = results.get(&source.id) else {
                continue;
            };
            source.rss.checked_at = Some(result.checked_at);
            source.rss.check_method = result.method.clone();
            match &result.feed_url {
                Some(url) => {
                    source.rss.url = Some(url.clone());
                    source.rss.status = FeedStatus::Confirmed;
                }
                None => {
                    source.rss.url = None;
                    source.rss.status = if source.rss.candidates.is_empty() {
                        FeedStatus::Unknown
                    } else {
                        FeedStatus::Candidate
                    };
                }
            }
        }
    }
}

fn apply_feed_update(source: &mut SourceConfig, report: &SourceReport) {
    match &report.feed_url {
        Some(url) => {
            source.rss.url = Some(url.clone());
            source.rss.status = FeedStatus::Confirmed;
        }
        None if !matches!(report.status, SourceStatus::Error | SourceStatus::SkippedCooldown) => {
            source.rss.url = None;
            source.rss.status = FeedStatus::Unknown;
        }
        None => {}
    }
    source.rss.checked_at = Some(report.checked_at);
    source.rss.check_method = report.check_method.clone();
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "sources.toml".into());
    name.push(".tmp");
    path.with_file_name(name)
}

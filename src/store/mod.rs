pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{CollectedItem, Provenance, SourceConfig};

pub use sqlite::SqliteStore;

/// An item as persisted, keyed by its stable uid.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredItem {
    pub item_uid: String,
    pub source_id: String,
    pub source_name: String,
    pub title: String,
    pub url: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub source_via: Provenance,
    pub raw_json: String,
}

impl StoredItem {
    pub fn from_collected(source: &SourceConfig, item: &CollectedItem, collected_at: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            item_uid: item.uid(&source.id),
            source_id: source.id.clone(),
            source_name: source.name.clone(),
            title: item.title.clone(),
            url: item.url.clone(),
            summary: item.summary.clone(),
            published_at: item.published_at,
            collected_at,
            source_via: item.provenance,
            raw_json: serde_json::to_string(item)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertCounts {
    pub inserted: usize,
    pub updated: usize,
}

pub trait ItemStore {
    fn upsert(&self, item: &StoredItem) -> Result<UpsertOutcome>;
    fn upsert_all(&self, items: &[StoredItem]) -> Result<UpsertCounts>;
    fn get(&self, item_uid: &str) -> Result<Option<StoredItem>>;
    fn count(&self) -> Result<usize>;
}

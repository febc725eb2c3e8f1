use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::normalizer::stable_item_uid;

/// How an item was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Rss,
    RssDiscovered,
    Html,
    HtmlEmbedded,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Rss => "rss",
            Provenance::RssDiscovered => "rss_discovered",
            Provenance::Html => "html",
            Provenance::HtmlEmbedded => "html_embedded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "rss" => Some(Provenance::Rss),
            "rss_discovered" => Some(Provenance::RssDiscovered),
            "html" => Some(Provenance::Html),
            "html_embedded" => Some(Provenance::HtmlEmbedded),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedItem {
    pub title: String,
    /// Normalized absolute URL
    pub url: String,
    pub summary: String,
    pub published_at: Option<DateTime<Utc>>,
    pub provenance: Provenance,
}

impl CollectedItem {
    pub fn new(title: impl Into<String>, url: impl Into<String>, provenance: Provenance) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            summary: String::new(),
            published_at: None,
            provenance,
        }
    }

    /// Identity of this item as seen from `source_id`.
    pub fn uid(&self, source_id: &str) -> String {
        stable_item_uid(source_id, &self.url, &self.title)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uid_ignores_query_and_spacing() {
        let a = CollectedItem::new("Big  Launch", "https://x.com/blog/launch?ref=rss", Provenance::Rss);
        let b = CollectedItem::new("Big Launch", "https://x.com/blog/launch", Provenance::Html);
        assert_eq!(a.uid("x"), b.uid("x"));
        assert_ne!(a.uid("x"), a.uid("y"));
    }

    #[test]
    fn test_published_serializes_as_rfc3339() {
        let mut item = CollectedItem::new("T", "https://x.com/a", Provenance::Html);
        item.published_at = Some(
            DateTime::parse_from_rfc3339("2024-05-01T00:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["published_at"], "2024-05-01T00:00:00Z");
        assert_eq!(json["provenance"], "html");
    }
}

//! Entries hidden in escaped JSON blobs inside server-rendered pages.
//!
//! Some blogs render their article list client-side from an inline data
//! payload, so the anchors only exist after hydration. Extractors here pull
//! `(title, slug, date)` triples straight out of that payload. Dispatch is by
//! source id.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use url::Url;

use crate::domain::SourceConfig;
use crate::extractor::titles::clean_anchor_title;
use crate::normalizer::{compact, normalize_url, parse_published, slug_to_title};

const PATTERN_SIZE_LIMIT: usize = 64 * 1024 * 1024;

static COHERE_POST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    RegexBuilder::new(
        r#"(?s)\\"published_at\\":\\"(?P<published>[^\\"]+)\\".{0,900}?\\"slug\\":\\"(?P<slug>[^\\"]+)\\".{0,1200}?\\"title\\":\\"(?P<title>[^\\"]+)\\""#,
    )
    .size_limit(PATTERN_SIZE_LIMIT)
    .build()
    .expect("static regex")
});

static MANUS_POST_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)\\"title\\":\\"(?P<title>[^\\"]+)\\".*?\\"recordUid\\":\\"(?P<slug>[^\\"]+)\\".*?\\"seconds\\":(?P<seconds>\d+)"#,
    )
    .expect("static regex")
});

static UNICODE_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\u([0-9a-fA-F]{4})").expect("static regex"));

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedEntry {
    pub title: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
}

pub trait EmbeddedExtractor: Send + Sync {
    fn extract(&self, homepage: &str, html: &str) -> Vec<EmbeddedEntry>;
}

/// Undo the JSON-in-HTML escaping of an embedded string.
pub fn decode_embedded_text(value: &str) -> String {
    let text = compact(value);
    if text.is_empty() {
        return text;
    }
    let text = text.replace("\\/", "/");
    let text = UNICODE_ESCAPE.replace_all(&text, |caps: &regex::Captures<'_>| {
        u32::from_str_radix(&caps[1], 16)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    compact(&decode_html_entities(&text))
}

fn slug_url(homepage: &str, slug: &str) -> Option<String> {
    let slug = compact(slug);
    let slug = slug.trim_matches('/');
    if slug.is_empty() {
        return None;
    }
    let base = Url::parse(&format!("{}/", homepage.trim_end_matches('/'))).ok()?;
    base.join(slug).ok().map(|u| normalize_url(u.as_str()))
}

/// Shared collection loop: one entry per slug URL, first occurrence wins.
fn collect_entries<'h>(
    homepage: &str,
    captures: impl Iterator<Item = regex::Captures<'h>>,
    date_of: impl Fn(&regex::Captures<'h>) -> Option<DateTime<Utc>>,
) -> Vec<EmbeddedEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for caps in captures {
        let Some(url) = slug_url(homepage, &caps["slug"]) else {
            continue;
        };
        if !seen.insert(url.clone()) {
            continue;
        }
        let title = clean_anchor_title(&decode_embedded_text(&caps["title"]));
        entries.push(EmbeddedEntry {
            title: if title.is_empty() { slug_to_title(&url) } else { title },
            published_at: date_of(&caps),
            url,
        });
    }
    entries
}

/// `published_at` / `slug` / `title` triples from the Cohere blog payload.
pub struct CohereBlobExtractor;

impl EmbeddedExtractor for CohereBlobExtractor {
    fn extract(&self, homepage: &str, html: &str) -> Vec<EmbeddedEntry> {
        collect_entries(homepage, COHERE_POST_PATTERN.captures_iter(html), |caps| {
            parse_published(&compact(&caps["published"]))
        })
    }
}

/// `title` / `recordUid` / epoch `seconds` triples from the Manus blog payload.
pub struct ManusBlobExtractor;

impl EmbeddedExtractor for ManusBlobExtractor {
    fn extract(&self, homepage: &str, html: &str) -> Vec<EmbeddedEntry> {
        collect_entries(homepage, MANUS_POST_PATTERN.captures_iter(html), |caps| {
            caps["seconds"]
                .parse::<i64>()
                .ok()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
        })
    }
}

/// Source id → extractor lookup table.
#[derive(Clone)]
pub struct EmbeddedRegistry {
    extractors: HashMap<String, Arc<dyn EmbeddedExtractor>>,
}

impl EmbeddedRegistry {
    pub fn empty() -> Self {
        Self { extractors: HashMap::new() }
    }

    pub fn builtin() -> Self {
        Self::empty()
            .register("cohere-blog", Arc::new(CohereBlobExtractor))
            .register("manus-blog", Arc::new(ManusBlobExtractor))
    }

    pub fn register(mut self, source_id: impl Into<String>, extractor: Arc<dyn EmbeddedExtractor>) -> Self {
        self.extractors.insert(source_id.into(), extractor);
        self
    }

    pub fn extract(&self, source: &SourceConfig, html: &str) -> Vec<EmbeddedEntry> {
        match self.extractors.get(source.id.trim()) {
            Some(extractor) => extractor.extract(&source.homepage, html),
            None => Vec::new(),
        }
    }
}

impl Default for EmbeddedRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COHERE_BLOB: &str = r#"<script>self.__next_f.push([1,"{\"published_at\":\"2024-05-02T10:00:00.000Z\",\"id\":7,\"slug\":\"command-r-plus\",\"excerpt\":\"x\",\"title\":\"Introducing Command R Plus\"},{\"published_at\":\"2024-04-01T00:00:00Z\",\"slug\":\"/command-r-plus/\",\"title\":\"Duplicate\"}"])</script>"#;

    const MANUS_BLOB: &str = r#"<script>{\"title\":\"Manus agents go wide\",\"meta\":{},\"recordUid\":\"wide-research\",\"createdAt\":{\"seconds\":1717200000}}</script>"#;

    #[test]
    fn test_decode_embedded_text() {
        assert_eq!(decode_embedded_text(r"a\/b & c &amp; d"), "a/b & c & d");
        assert_eq!(decode_embedded_text(r"It\u2019s R\u0026D"), "It\u{2019}s R&D");
        assert_eq!(decode_embedded_text("   "), "");
    }

    #[test]
    fn test_cohere_blob() {
        let source = SourceConfig::new("cohere-blog", "Cohere", "https://cohere.com/blog");
        let entries = EmbeddedRegistry::builtin().extract(&source, COHERE_BLOB);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://cohere.com/blog/command-r-plus");
        assert_eq!(entries[0].title, "Introducing Command R Plus");
        assert_eq!(
            entries[0].published_at.unwrap().to_rfc3339(),
            "2024-05-02T10:00:00+00:00"
        );
    }

    #[test]
    fn test_manus_blob() {
        let source = SourceConfig::new("manus-blog", "Manus", "https://manus.im/blog/");
        let entries = EmbeddedRegistry::builtin().extract(&source, MANUS_BLOB);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].url, "https://manus.im/blog/wide-research");
        assert_eq!(entries[0].title, "Manus agents go wide");
        assert_eq!(entries[0].published_at.unwrap().timestamp(), 1_717_200_000);
    }

    #[test]
    fn test_unregistered_source_yields_nothing() {
        let source = SourceConfig::new("other-blog", "Other", "https://cohere.com/blog");
        assert!(EmbeddedRegistry::builtin().extract(&source, COHERE_BLOB).is_empty());
    }

    #[test]
    fn test_register_custom_extractor() {
        struct Fixed;
        impl EmbeddedExtractor for Fixed {
            fn extract(&self, homepage: &str, _html: &str) -> Vec<EmbeddedEntry> {
                vec![EmbeddedEntry {
                    title: "Pinned announcement post".into(),
                    url: format!("{}/pinned", homepage),
                    published_at: None,
                }]
            }
        }

        let registry = EmbeddedRegistry::empty().register("lab", Arc::new(Fixed));
        let source = SourceConfig::new("lab", "Lab", "https://lab.ai");
        assert_eq!(registry.extract(&source, "").len(), 1);
    }
}

//! Heuristic article extraction from a rendered homepage.
//!
//! Used when a source has no usable feed. The anchor pass walks `a[href]`
//! elements and keeps those that look like article links; the embedded pass
//! reads inline data blobs for sources whose listing is rendered client-side.

pub mod dates;
pub mod embedded;
pub mod links;
pub mod titles;

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use url::Url;

use crate::domain::{CollectedItem, Provenance, SourceConfig};
use crate::normalizer::normalize_url;

pub use embedded::{EmbeddedEntry, EmbeddedExtractor, EmbeddedRegistry};

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

#[derive(Debug, Clone)]
struct Candidate {
    title: String,
    url: String,
    published_at: Option<DateTime<Utc>>,
    provenance: Provenance,
    position: usize,
}

/// Candidates deduplicated by URL in first-seen order.
#[derive(Default)]
struct CandidateSet {
    order: Vec<String>,
    by_url: HashMap<String, Candidate>,
}

impl CandidateSet {
    /// A repeat URL only replaces the stored entry when its title is strictly longer.
    fn offer(&mut self, mut candidate: Candidate) {
        match self.by_url.get(&candidate.url) {
            Some(existing) => {
                if candidate.title.chars().count() <= existing.title.chars().count() {
                    return;
                }
                candidate.position = existing.position;
                candidate.published_at = existing.published_at.or(candidate.published_at);
                self.by_url.insert(candidate.url.clone(), candidate);
            }
            None => {
                self.order.push(candidate.url.clone());
                self.by_url.insert(candidate.url.clone(), candidate);
            }
        }
    }

    fn contains(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn into_vec(mut self) -> Vec<Candidate> {
        self.order
            .iter()
            .filter_map(|url| self.by_url.remove(url))
            .collect()
    }
}

#[derive(Clone, Default)]
pub struct HtmlExtractor {
    registry: EmbeddedRegistry,
}

impl HtmlExtractor {
    pub fn new(registry: EmbeddedRegistry) -> Self {
        Self { registry }
    }

    /// Extract at most `max_items` articles from the homepage `html` of `source`.
    pub fn extract(&self, source: &SourceConfig, html: &str, max_items: usize) -> Vec<CollectedItem> {
        let Ok(homepage) = Url::parse(&source.homepage) else {
            tracing::warn!("Homepage {} of {} is not a valid URL", source.homepage, source.id);
            return Vec::new();
        };

        let embedded = self.registry.extract(source, html);
        let embedded_by_url: HashMap<&str, &EmbeddedEntry> =
            embedded.iter().map(|entry| (entry.url.as_str(), entry)).collect();

        let scan_limit = source.crawl.scan_limit(max_items);
        let mut candidates = scan_anchors(&homepage, html, scan_limit, &embedded_by_url);

        if candidates.is_empty() && !embedded.is_empty() {
            for (position, entry) in embedded.iter().enumerate() {
                let title = titles::clean_anchor_title(&entry.title);
                let url = normalize_url(&entry.url);
                if !titles::is_meaningful_title(&title) || candidates.contains(&url) {
                    continue;
                }
                candidates.offer(Candidate {
                    title,
                    url,
                    published_at: entry.published_at,
                    provenance: Provenance::HtmlEmbedded,
                    position,
                });
            }
        }

        let mut ordered = candidates.into_vec();
        if !ordered.is_empty() && ordered.iter().all(|c| c.published_at.is_some()) {
            ordered.sort_by(|a, b| {
                b.published_at
                    .cmp(&a.published_at)
                    .then(a.position.cmp(&b.position))
            });
        }
        ordered.truncate(max_items);

        tracing::debug!(
            "Extracted {} html entries for {} ({} embedded)",
            ordered.len(),
            source.id,
            embedded.len()
        );

        ordered
            .into_iter()
            .map(|c| {
                let mut item = CollectedItem::new(c.title, c.url, c.provenance);
                item.published_at = c.published_at;
                item
            })
            .collect()
    }
}

/// The `Html` tree lives only inside this call.
fn scan_anchors(
    homepage: &Url,
    html: &str,
    scan_limit: usize,
    embedded_by_url: &HashMap<&str, &EmbeddedEntry>,
) -> CandidateSet {
    let document = Html::parse_document(html);
    let mut candidates = CandidateSet::default();

    for (position, anchor) in document.select(&ANCHOR_SELECTOR).enumerate().take(scan_limit) {
        let href = anchor.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() {
            continue;
        }
        let Ok(resolved) = homepage.join(href) else {
            continue;
        };
        let url = normalize_url(resolved.as_str());
        let Ok(normalized) = Url::parse(&url) else {
            continue;
        };
        if !links::likely_article_link(homepage, &normalized) {
            continue;
        }

        let embedded = embedded_by_url.get(url.as_str()).copied();
        let fallback = embedded.map(|e| e.title.as_str()).unwrap_or_default();
        let title = titles::prefer_slug_title(&titles::resolve_card_title(anchor, fallback), &url);
        if !titles::is_meaningful_title(&title) {
            continue;
        }

        let published_at = dates::resolve_card_date(anchor).or(embedded.and_then(|e| e.published_at));
        let provenance = if embedded.is_some() {
            Provenance::HtmlEmbedded
        } else {
            Provenance::Html
        };

        candidates.offer(Candidate {
            title,
            url,
            published_at,
            provenance,
            position,
        });
    }

    candidates
}

use feed_rs::model::Entry;
use feed_rs::parser;
use html_escape::decode_html_entities;
use url::Url;

use crate::app::{NewsloomError, Result};
use crate::domain::{CollectedItem, Provenance, SourceConfig};
use crate::fetcher::Fetcher;
use crate::normalizer::{compact, domain_of, normalize_url};

/// Decodes RSS 0.9x/1.0/2.0, Atom and JSON Feed bodies into collected items.
#[derive(Clone, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    /// Fetch `feed_url` and parse at most `max_items` entries belonging to `source`.
    pub async fn fetch(
        &self,
        fetcher: &(dyn Fetcher + Send + Sync),
        source: &SourceConfig,
        feed_url: &str,
        max_items: usize,
        provenance: Provenance,
    ) -> Result<Vec<CollectedItem>> {
        let response = fetcher.get(feed_url).await?;
        if response.is_error() {
            return Err(NewsloomError::HttpStatus {
                url: feed_url.to_string(),
                status: response.status,
            });
        }
        self.parse(source, feed_url, response.body.as_bytes(), max_items, provenance)
    }

    pub fn parse(
        &self,
        source: &SourceConfig,
        feed_url: &str,
        body: &[u8],
        max_items: usize,
        provenance: Provenance,
    ) -> Result<Vec<CollectedItem>> {
        let feed = parser::parse(body).map_err(|e| NewsloomError::FeedParse(e.to_string()))?;
        let source_domain = domain_of(&source.homepage);
        let base = Url::parse(feed_url).ok();

        let items = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let link = select_entry_link(&entry);
                if link.is_empty() {
                    return None;
                }
                let absolute = base
                    .as_ref()
                    .and_then(|b| b.join(&link).ok())
                    .map(|u| u.to_string())
                    .unwrap_or(link);
                let link_domain = domain_of(&absolute);
                if !link_domain.is_empty() && !same_site(&link_domain, &source_domain) {
                    tracing::debug!("Dropping off-site entry {} for {}", absolute, source.id);
                    return None;
                }

                let title = entry
                    .title
                    .as_ref()
                    .map(|t| compact(&decode_html_entities(&t.content)))
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| absolute.clone());

                let summary = entry
                    .summary
                    .as_ref()
                    .map(|s| s.content.clone())
                    .or_else(|| entry.content.as_ref().and_then(|c| c.body.clone()))
                    .map(|s| compact(&decode_html_entities(&s)))
                    .unwrap_or_default();

                let mut item = CollectedItem::new(title, normalize_url(&absolute), provenance);
                item.summary = summary;
                item.published_at = entry.published.or(entry.updated);
                Some(item)
            })
            .take(max_items)
            .collect();

        Ok(items)
    }
}

fn select_entry_link(entry: &Entry) -> String {
    let preferred = entry.links.iter().find(|link| {
        let rel = link.rel.as_deref().unwrap_or("");
        !link.href.trim().is_empty() && (rel.is_empty() || rel.eq_ignore_ascii_case("alternate"))
    });
    preferred
        .or_else(|| entry.links.iter().find(|link| !link.href.trim().is_empty()))
        .map(|link| link.href.trim().to_string())
        .unwrap_or_default()
}

/// `link` is the source's own domain or one of its subdomains (`www.` ignored on both sides).
fn same_site(link_domain: &str, source_domain: &str) -> bool {
    let link = link_domain.strip_prefix("www.").unwrap_or(link_domain);
    let source = source_domain.strip_prefix("www.").unwrap_or(source_domain);
    link == source || link.ends_with(&format!(".{}", source))
}

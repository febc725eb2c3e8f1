use std::fmt;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::{FeedStatus, SourceConfig};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::normalizer::{normalize_url, unique_keep_order};

pub const FEED_CONTENT_MARKERS: [&str; 3] = ["<rss", "<feed", "<rdf:rdf"];

pub const COMMON_FEED_SUFFIXES: [&str; 9] = [
    "/feed",
    "/feed/",
    "/rss",
    "/rss/",
    "/rss.xml",
    "/feed.xml",
    "/atom.xml",
    "/all.atom",
    "/index.xml",
];

pub const DISCOVERY_METHOD: &str = "http_probe";

static FEED_LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("link[rel]").expect("static selector"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryStatus {
    Confirmed,
    NotFound,
}

impl From<DiscoveryStatus> for FeedStatus {
    fn from(status: DiscoveryStatus) -> Self {
        match status {
            DiscoveryStatus::Confirmed => FeedStatus::Confirmed,
            DiscoveryStatus::NotFound => FeedStatus::NotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Ok,
    Http(u16),
    NotFeed(String),
    RequestError(String),
}

impl ProbeOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, ProbeOutcome::Ok)
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Ok => write!(f, "ok"),
            ProbeOutcome::Http(status) => write!(f, "http_{}", status),
            ProbeOutcome::NotFeed(content_type) => write!(f, "not_feed_content_type:{}", content_type),
            ProbeOutcome::RequestError(e) => write!(f, "request_error: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeLog {
    pub url: String,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedDiscoveryResult {
    pub feed_url: Option<String>,
    pub status: DiscoveryStatus,
    pub method: String,
    pub checked_at: DateTime<Utc>,
    pub homepage_error: Option<String>,
    pub probe_logs: Vec<ProbeLog>,
}

/// Discovery outcome plus the homepage response it fetched along the way.
///
/// `homepage` is `Err` only when the request itself failed; error statuses are
/// kept as responses so callers can decide.
pub struct Discovery {
    pub result: FeedDiscoveryResult,
    pub homepage: std::result::Result<FetchResponse, String>,
}

/// Whether a probed response looks like an RSS/Atom/RDF document.
pub fn is_feed_content(content_type: &str, body: &str) -> bool {
    let content_type = content_type.to_lowercase();
    let ct_likely_feed = ["xml", "rss", "atom"]
        .iter()
        .any(|hint| content_type.contains(hint));
    if ct_likely_feed {
        return true;
    }
    let body = body.to_lowercase();
    FEED_CONTENT_MARKERS.iter().any(|marker| body.contains(marker))
}

/// `<link rel="alternate">` feed hrefs advertised by a homepage, resolved to absolute URLs.
pub fn extract_feed_links(homepage: &str, html: &str) -> Vec<String> {
    let Ok(base) = Url::parse(homepage) else {
        return Vec::new();
    };
    let document = Html::parse_document(html);

    let links = document.select(&FEED_LINK_SELECTOR).filter_map(|link| {
        let element = link.value();
        let rel = element.attr("rel").unwrap_or_default().to_lowercase();
        let link_type = element.attr("type").unwrap_or_default().to_lowercase();
        let href = element.attr("href").map(str::trim).filter(|h| !h.is_empty())?;

        if !rel.split_whitespace().any(|r| r == "alternate") {
            return None;
        }
        if !["rss", "atom", "xml"].iter().any(|hint| link_type.contains(hint)) {
            return None;
        }
        base.join(href).ok().map(|url| url.to_string())
    });

    unique_keep_order(links)
}

/// Conventional feed paths under the homepage path, then under the site root.
pub fn common_feed_candidates(homepage: &str) -> Vec<String> {
    let Ok(parsed) = Url::parse(homepage.trim()) else {
        return Vec::new();
    };
    let host = parsed.host_str().unwrap_or_default();
    let base = match parsed.port() {
        Some(port) => format!("{}://{}:{}", parsed.scheme(), host, port),
        None => format!("{}://{}", parsed.scheme(), host),
    };
    let path = parsed.path().trim_end_matches('/');

    let mut candidates: Vec<String> = COMMON_FEED_SUFFIXES
        .iter()
        .map(|suffix| format!("{}{}{}", base, path, suffix))
        .collect();
    if !path.is_empty() {
        candidates.extend(COMMON_FEED_SUFFIXES.iter().map(|suffix| format!("{}{}", base, suffix)));
    }
    unique_keep_order(candidates)
}

/// Ordered, normalized, de-duplicated candidate list for a source.
pub fn build_candidates(source: &SourceConfig, homepage_html: Option<&str>) -> Vec<String> {
    let mut candidates = Vec::new();
    if let Some(seed) = source.seed_feed() {
        candidates.push(seed.to_string());
    }
    candidates.extend(source.rss.candidates.iter().cloned());
    if let Some(html) = homepage_html {
        candidates.extend(extract_feed_links(&source.homepage, html));
    }
    candidates.extend(common_feed_candidates(&source.homepage));

    unique_keep_order(candidates.iter().map(|url| normalize_url(url)))
}

async fn probe_feed_url(fetcher: &(dyn Fetcher + Send + Sync), url: &str) -> ProbeOutcome {
    match fetcher.get(url).await {
        Err(e) => ProbeOutcome::RequestError(e.to_string()),
        Ok(response) if response.is_error() => ProbeOutcome::Http(response.status),
        Ok(response) if !is_feed_content(response.content_type(), &response.body) => {
            ProbeOutcome::NotFeed(response.content_type().to_string())
        }
        Ok(_) => ProbeOutcome::Ok,
    }
}

/// Find a working feed for `source`. Never fails; a miss is `DiscoveryStatus::NotFound`.
pub async fn discover_feed(fetcher: &(dyn Fetcher + Send + Sync), source: &SourceConfig) -> Discovery {
    let homepage = fetcher
        .get(&source.homepage)
        .await
        .map_err(|e| format!("request_error: {}", e));

    let (homepage_html, homepage_error) = match &homepage {
        Ok(response) if !response.is_error() => (Some(response.body.as_str()), None),
        Ok(response) => (None, Some(format!("http_{}", response.status))),
        Err(e) => (None, Some(e.clone())),
    };
    if let Some(ref e) = homepage_error {
        tracing::debug!("Homepage fetch for {} failed during discovery: {}", source.id, e);
    }

    let candidates = build_candidates(source, homepage_html);
    let probe_limit = source.crawl.probe_limit();

    let mut probe_logs = Vec::new();
    let mut feed_url = None;
    for candidate in candidates.into_iter().take(probe_limit) {
        let outcome = probe_feed_url(fetcher, &candidate).await;
        tracing::debug!("Probe {} for {}: {}", candidate, source.id, outcome);
        let confirmed = outcome.is_ok();
        probe_logs.push(ProbeLog {
            url: candidate.clone(),
            outcome,
        });
        if confirmed {
            feed_url = Some(candidate);
            break;
        }
    }

    let status = if feed_url.is_some() {
        DiscoveryStatus::Confirmed
    } else {
        DiscoveryStatus::NotFound
    };

    Discovery {
        result: FeedDiscoveryResult {
            feed_url,
            status,
            method: DISCOVERY_METHOD.to_string(),
            checked_at: Utc::now(),
            homepage_error,
            probe_logs,
        },
        homepage,
    }
}

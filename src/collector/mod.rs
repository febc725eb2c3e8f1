use crate::domain::{
    append_trail, CollectMode, CollectedItem, FeedStatus, Provenance, SourceConfig, SourceReport, SourceStatus,
};
use crate::extractor::HtmlExtractor;
use crate::feed::{discover_feed, FeedParser};
use crate::fetcher::SharedFetcher;

const CONFIGURED_METHOD: &str = "configured";

/// Runs the feed → discovered feed → homepage chain for one source.
#[derive(Clone)]
pub struct SourceCollector {
    fetcher: SharedFetcher,
    parser: FeedParser,
    extractor: HtmlExtractor,
}

impl SourceCollector {
    pub fn new(fetcher: SharedFetcher) -> Self {
        Self::with_extractor(fetcher, HtmlExtractor::default())
    }

    pub fn with_extractor(fetcher: SharedFetcher, extractor: HtmlExtractor) -> Self {
        Self {
            fetcher,
            parser: FeedParser::new(),
            extractor,
        }
    }

    pub fn fetcher(&self) -> &SharedFetcher {
        &self.fetcher
    }

    /// One collection attempt. Failures end up in the report, never as `Err`.
    pub async fn collect(&self, source: &SourceConfig, max_items: usize) -> (Vec<CollectedItem>, SourceReport) {
        let fetcher = self.fetcher.as_ref();
        let mut report = SourceReport::for_source(source, CollectMode::RssConfig, SourceStatus::Ok);
        let mut trail = String::new();

        if let Some(seed) = source.seed_feed() {
            match self.parser.fetch(fetcher, source, seed, max_items, Provenance::Rss).await {
                Ok(items) => {
                    report.feed_url = Some(seed.to_string());
                    report.feed_status = FeedStatus::Confirmed;
                    report.check_method = CONFIGURED_METHOD.to_string();
                    return finish(source, items, report, trail);
                }
                Err(e) => {
                    tracing::warn!("Configured feed {} for {} failed: {}", seed, source.id, e);
                    append_trail(&mut trail, &format!("rss_config_failed: {}", e));
                }
            }
        }

        let discovery = discover_feed(fetcher, source).await;
        report.feed_status = discovery.result.status.into();
        report.check_method = discovery.result.method.clone();
        report.checked_at = discovery.result.checked_at;
        report.mode = CollectMode::Html;

        if let Some(feed_url) = discovery.result.feed_url.as_deref() {
            match self
                .parser
                .fetch(fetcher, source, feed_url, max_items, Provenance::RssDiscovered)
                .await
            {
                Ok(items) => {
                    report.mode = CollectMode::RssDiscovered;
                    report.feed_url = Some(feed_url.to_string());
                    return finish(source, items, report, trail);
                }
                Err(e) => {
                    tracing::warn!("Discovered feed {} for {} failed: {}", feed_url, source.id, e);
                    append_trail(&mut trail, &format!("rss_discovered_failed: {}", e));
                    report.feed_status = FeedStatus::Invalid;
                    report.mode = CollectMode::HtmlFallback;
                }
            }
        }

        let html_result = match &discovery.homepage {
            Err(e) => Err(e.clone()),
            Ok(response) if response.is_error() => Err(format!("http_{}", response.status)),
            Ok(response) => Ok(self.extractor.extract(source, &response.body, max_items)),
        };

        match html_result {
            Ok(items) => finish(source, items, report, trail),
            Err(reason) => {
                append_trail(&mut trail, &format!("html_failed: {}", reason));
                report.status = SourceStatus::Error;
                report.error = trail;
                tracing::warn!("Source {} failed: {}", source.id, report.error);
                (Vec::new(), report)
            }
        }
    }
}

fn finish(
    source: &SourceConfig,
    items: Vec<CollectedItem>,
    mut report: SourceReport,
    trail: String,
) -> (Vec<CollectedItem>, SourceReport) {
    report.status = if items.is_empty() {
        SourceStatus::Empty
    } else {
        SourceStatus::Ok
    };
    report.item_count = items.len();
    report.error = trail;
    tracing::info!(
        "Collected {} items from {} via {}",
        items.len(),
        source.id,
        report.mode.as_str()
    );
    (items, report)
}

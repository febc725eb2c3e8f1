//! Bounded-concurrency collection over every configured source.
//!
//! A run is a sequence of batches. The first batch holds every source that is
//! not cooling down; each later batch holds only the sources whose previous
//! attempt failed and that still have retries left. A batch finishes (every
//! task joined) before the next one starts.

pub mod retry;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::Serialize;
use tokio::sync::Semaphore;

use crate::collector::SourceCollector;
use crate::domain::{CollectedItem, SourceConfig, SourceReport, SourceStatus};
use crate::feed::{discover_feed, FeedDiscoveryResult};

pub use retry::{merge_retry_failure, RetryState, RetryTracker};

pub const DEFAULT_WORKERS: usize = 8;
pub const MAX_WORKERS: usize = 16;

type BatchResults = HashMap<String, (Vec<CollectedItem>, SourceReport)>;

/// Items and reports keyed by source id, one entry per input source.
#[derive(Debug, Default)]
pub struct CollectionRun {
    pub items: HashMap<String, Vec<CollectedItem>>,
    pub reports: HashMap<String, SourceReport>,
}

impl CollectionRun {
    pub fn summary(&self) -> RunSummary {
        RunSummary::from_reports(self.reports.values())
    }

    /// Reports in the order `sources` lists them.
    pub fn ordered_reports<'a>(&'a self, sources: &[SourceConfig]) -> Vec<&'a SourceReport> {
        sources
            .iter()
            .filter_map(|source| self.reports.get(&source.id))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub sources_checked: usize,
    pub sources_successful: usize,
    pub sources_with_items: usize,
    pub sources_skipped_cooldown: usize,
    pub retry_attempted: usize,
    pub retry_recovered: usize,
    pub items_fetched: usize,
}

impl RunSummary {
    pub fn from_reports<'a>(reports: impl IntoIterator<Item = &'a SourceReport>) -> Self {
        let mut summary = Self::default();
        for report in reports {
            summary.sources_checked += 1;
            if report.status.is_success() {
                summary.sources_successful += 1;
            }
            if report.item_count > 0 {
                summary.sources_with_items += 1;
            }
            if report.status == SourceStatus::SkippedCooldown {
                summary.sources_skipped_cooldown += 1;
            }
            if report.retry_attempted {
                summary.retry_attempted += 1;
            }
            if report.retry_succeeded {
                summary.retry_recovered += 1;
            }
            summary.items_fetched += report.item_count;
        }
        summary
    }
}

pub struct ParallelCollector {
    collector: Arc<SourceCollector>,
    semaphore: Arc<Semaphore>,
    workers: usize,
}

impl ParallelCollector {
    pub fn new(collector: SourceCollector) -> Self {
        Self::with_workers(collector, DEFAULT_WORKERS)
    }

    pub fn with_workers(collector: SourceCollector, workers: usize) -> Self {
        let workers = workers.clamp(1, MAX_WORKERS);
        Self {
            collector: Arc::new(collector),
            semaphore: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn collector(&self) -> &Arc<SourceCollector> {
        &self.collector
    }

    pub async fn collect_all(&self, sources: &[SourceConfig], default_max: usize) -> CollectionRun {
        let now = Utc::now();
        let mut run = CollectionRun::default();
        let mut tracker = RetryTracker::new();
        let mut runnable = Vec::new();

        for source in sources {
            if source.health.is_cooling_down(now) {
                let report = SourceReport::skipped(source);
                tracing::warn!("Skipping {} ({})", source.id, report.skip_reason);
                run.items.insert(source.id.clone(), Vec::new());
                run.reports.insert(source.id.clone(), report);
                continue;
            }
            tracker.track(&source.id, source.crawl.retry_limit());
            runnable.push(source.clone());
        }

        tracing::info!(
            "Collecting {} sources ({} cooling down) with {} workers",
            runnable.len(),
            sources.len() - runnable.len(),
            self.workers
        );

        for (id, (items, report)) in self.run_batch(&runnable, 0, default_max).await {
            tracker.record(&id, report.status);
            run.items.insert(id.clone(), items);
            run.reports.insert(id, report);
        }

        let by_id: HashMap<&str, &SourceConfig> = runnable.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut attempt = 1;
        loop {
            let batch: Vec<SourceConfig> = tracker
                .retryable()
                .iter()
                .filter_map(|id| by_id.get(id.as_str()).map(|s| (*s).clone()))
                .collect();
            if batch.is_empty() {
                break;
            }
            tracing::info!("Retry batch {} with {} sources", attempt, batch.len());

            let mut results = self.run_batch(&batch, attempt, default_max).await;
            for source in &batch {
                let Some(retry_count) = tracker.begin_retry(&source.id) else {
                    continue;
                };
                let (items, mut report) = results
                    .remove(&source.id)
                    .unwrap_or_else(|| (Vec::new(), SourceReport::failed(source, "missing_retry_report")));
                tracker.record(&source.id, report.status);

                report.retry_attempted = true;
                report.retry_count = retry_count;
                if report.status != SourceStatus::Error {
                    report.retry_succeeded = true;
                    tracing::info!("Source {} recovered on retry {}", source.id, retry_count);
                    run.items.insert(source.id.clone(), items);
                    run.reports.insert(source.id.clone(), report);
                    continue;
                }

                let merged = match run.reports.get(&source.id) {
                    Some(previous) => merge_retry_failure(previous, &report, retry_count),
                    None => report,
                };
                run.items.insert(source.id.clone(), Vec::new());
                run.reports.insert(source.id.clone(), merged);
            }
            attempt += 1;
        }

        run
    }

    /// Feed discovery only, for every source regardless of cooldown.
    pub async fn discover_all(&self, sources: &[SourceConfig]) -> HashMap<String, FeedDiscoveryResult> {
        let mut handles = Vec::with_capacity(sources.len());

        for source in sources {
            let fetcher = self.collector.fetcher().clone();
            let semaphore = self.semaphore.clone();
            let task_source = source.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                Some(discover_feed(fetcher.as_ref(), &task_source).await.result)
            });
            handles.push((source.id.clone(), handle));
        }

        let mut results = HashMap::with_capacity(handles.len());
        for (id, handle) in handles {
            match handle.await {
                Ok(Some(result)) => {
                    tracing::info!(
                        "Discovery for {}: {}",
                        id,
                        result.feed_url.as_deref().unwrap_or("not found")
                    );
                    results.insert(id, result);
                }
                Ok(None) => tracing::warn!("Discovery for {} skipped: worker pool closed", id),
                Err(e) => tracing::error!("Discovery task for {} failed: {}", id, e),
            }
        }
        results
    }

    async fn run_batch(&self, batch: &[SourceConfig], attempt: u32, default_max: usize) -> BatchResults {
        let mut handles = Vec::with_capacity(batch.len());

        for source in batch {
            let collector = self.collector.clone();
            let semaphore = self.semaphore.clone();
            let task_source = source.clone();

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return (Vec::new(), SourceReport::failed(&task_source, "collect_failed: worker pool closed"));
                };
                if attempt > 0 {
                    let delay = task_source.crawl.retry_delay(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                collector
                    .collect(&task_source, task_source.max_items(default_max))
                    .await
            });

            handles.push(handle);
        }

        let joined = join_all(handles).await;
        let mut results = HashMap::with_capacity(joined.len());
        for (source, result) in batch.iter().zip(joined) {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Collection task for {} failed: {}", source.id, e);
                    (Vec::new(), SourceReport::failed(source, format!("collect_failed: {}", e)))
                }
            };
            results.insert(source.id.clone(), outcome);
        }
        results
    }
}

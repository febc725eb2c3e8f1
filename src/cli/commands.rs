use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::app::{AppContext, NewsloomError, Result};
use crate::config::SourceCatalog;
use crate::domain::{CollectedItem, SourceReport};
use crate::feed::{DiscoveryStatus, FeedDiscoveryResult};
use crate::orchestrator::RunSummary;
use crate::store::{ItemStore, StoredItem};

pub struct CollectOptions {
    pub max_per_source: usize,
    pub update_sources: bool,
    pub output: Option<PathBuf>,
    pub min_successful: usize,
}

#[derive(Serialize)]
struct RunItem<'a> {
    source_id: &'a str,
    item_uid: String,
    #[serde(flatten)]
    item: &'a CollectedItem,
}

#[derive(Serialize)]
struct RunReport<'a> {
    generated_at: DateTime<Utc>,
    #[serde(flatten)]
    summary: &'a RunSummary,
    new_items_count: usize,
    updated_items_count: usize,
    items: Vec<RunItem<'a>>,
    sources: Vec<&'a SourceReport>,
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    id: &'a str,
    name: &'a str,
    homepage: &'a str,
    #[serde(flatten)]
    result: &'a FeedDiscoveryResult,
}

#[derive(Serialize)]
struct AuditReport<'a> {
    sources_total: usize,
    confirmed_total: usize,
    checked_at: DateTime<Utc>,
    results: Vec<AuditEntry<'a>>,
}

pub async fn collect(ctx: &AppContext, sources_path: &Path, options: &CollectOptions) -> Result<RunSummary> {
    let mut catalog = SourceCatalog::load(sources_path)?;
    if catalog.sources.is_empty() {
        println!("No sources in {}", sources_path.display());
        return Ok(RunSummary::default());
    }

    println!("Collecting {} sources...", catalog.sources.len());
    let generated_at = Utc::now();
    let mut run = ctx
        .collector
        .collect_all(&catalog.sources, options.max_per_source)
        .await;

    let mut stored = Vec::new();
    for source in &catalog.sources {
        for item in run.items.get(&source.id).into_iter().flatten() {
            stored.push(StoredItem::from_collected(source, item, generated_at)?);
        }
    }
    let counts = ctx.store.upsert_all(&stored)?;

    if options.update_sources {
        catalog.apply_reports(&mut run.reports);
    }

    let summary = run.summary();
    let items = catalog
        .sources
        .iter()
        .flat_map(|source| {
            run.items
                .get(&source.id)
                .into_iter()
                .flatten()
                .map(move |item| RunItem {
                    source_id: source.id.as_str(),
                    item_uid: item.uid(&source.id),
                    item,
                })
        })
        .collect();
    let report = RunReport {
        generated_at,
        summary: &summary,
        new_items_count: counts.inserted,
        updated_items_count: counts.updated,
        items,
        sources: run.ordered_reports(&catalog.sources),
    };

    for source_report in &report.sources {
        let detail = if source_report.error.is_empty() {
            source_report.skip_reason.as_str()
        } else {
            source_report.error.as_str()
        };
        println!(
            "  {:<24} {:<16} {:<14} {:>3} items {}",
            source_report.source_id,
            source_report.status.as_str(),
            source_report.mode.as_str(),
            source_report.item_count,
            detail
        );
    }
    println!(
        "Collection complete: {}/{} sources successful, {} items ({} new, {} updated)",
        summary.sources_successful,
        summary.sources_checked,
        summary.items_fetched,
        counts.inserted,
        counts.updated
    );

    if summary.sources_successful < options.min_successful {
        return Err(NewsloomError::Other(format!(
            "critical threshold not met: successful_sources={} < {}",
            summary.sources_successful, options.min_successful
        )));
    }

    if let Some(path) = &options.output {
        write_json(path, &report)?;
    }
    if options.update_sources {
        catalog.save(sources_path)?;
    }

    Ok(summary)
}

pub async fn audit(ctx: &AppContext, sources_path: &Path, update: bool, out: Option<&Path>) -> Result<usize> {
    let mut catalog = SourceCatalog::load(sources_path)?;
    let results = ctx.collector.discover_all(&catalog.sources).await;

    let confirmed = {
        let entries: Vec<AuditEntry<'_>> = catalog
            .sources
            .iter()
            .filter_map(|source| {
                results.get(&source.id).map(|result| AuditEntry {
                    id: &source.id,
                    name: &source.name,
                    homepage: &source.homepage,
                    result,
                })
            })
            .collect();
        let confirmed = entries
            .iter()
            .filter(|entry| entry.result.status == DiscoveryStatus::Confirmed)
            .count();

        for entry in &entries {
            println!(
                "  {:<24} {}",
                entry.id,
                entry.result.feed_url.as_deref().unwrap_or("-")
            );
        }
        println!("RSS audit complete: confirmed {}/{}", confirmed, entries.len());

        if let Some(path) = out {
            let report = AuditReport {
                sources_total: entries.len(),
                confirmed_total: confirmed,
                checked_at: entries.first().map_or_else(Utc::now, |e| e.result.checked_at),
                results: entries,
            };
            write_json(path, &report)?;
        }
        confirmed
    };

    if update {
        catalog.apply_discoveries(&results);
        catalog.save(sources_path)?;
    }

    Ok(confirmed)
}

pub fn list_sources(sources_path: &Path, id: Option<&str>) -> Result<()> {
    let catalog = SourceCatalog::load(sources_path)?;

    let sources: Vec<_> = match id {
        Some(id) => vec![catalog
            .get(id)
            .ok_or_else(|| NewsloomError::SourceNotFound(id.to_string()))?],
        None => catalog.sources.iter().collect(),
    };

    if sources.is_empty() {
        println!("No sources");
        return Ok(());
    }

    for source in sources {
        let cooldown = source
            .health
            .cooldown_until
            .map(|until| format!(", cooling down until {}", until.to_rfc3339()))
            .unwrap_or_default();
        println!(
            "{} ({})\n  {}\n  feed: {} [{}]\n  health: {}, {} consecutive failures{}",
            source.name,
            source.id,
            source.homepage,
            source.seed_feed().unwrap_or("-"),
            source.rss.status.as_str(),
            source.health.level.as_str(),
            source.health.consecutive_failures,
            cooldown
        );
    }

    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    tracing::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{HealthLevel, SourceStatus};
    use crate::fetcher::stub::StubFetcher;
    use std::sync::Arc;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Lab</title>
  <item><title>First lab post</title><link>https://lab.dev/blog/first</link></item>
  <item><title>Second lab post</title><link>https://lab.dev/blog/second</link></item>
</channel></rss>"#;

    const CATALOG: &str = r#"
[[sources]]
id = "lab"
name = "Lab"
homepage = "https://lab.dev/"

[sources.rss]
url = "https://lab.dev/feed.xml"

[[sources]]
id = "down"
name = "Down"
homepage = "https://down.dev/"

[sources.crawl]
retry_on_failure = 0

[sources.crawl.health_thresholds]
degraded_after_failures = 1
"#;

    fn context() -> AppContext {
        let stub = StubFetcher::new()
            .with_rss("https://lab.dev/feed.xml", FEED)
            .with_response("https://down.dev/", 503, None, "");
        AppContext::in_memory(Arc::new(stub), 2).unwrap()
    }

    fn options(output: Option<PathBuf>, update_sources: bool, min_successful: usize) -> CollectOptions {
        CollectOptions {
            max_per_source: 20,
            update_sources,
            output,
            min_successful,
        }
    }

    #[tokio::test]
    async fn test_collect_stores_items_and_writes_report() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.toml");
        let output = dir.path().join("out").join("run.json");
        fs::write(&sources, CATALOG).unwrap();
        let ctx = context();

        let summary = collect(&ctx, &sources, &options(Some(output.clone()), true, 1))
            .await
            .unwrap();
        assert_eq!(summary.sources_checked, 2);
        assert_eq!(summary.sources_successful, 1);
        assert_eq!(ctx.store.count().unwrap(), 2);

        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(report["new_items_count"], 2);
        assert_eq!(report["items"][0]["source_id"], "lab");
        assert_eq!(report["sources"][1]["status"], "error");
        assert_eq!(report["sources"][1]["health_level"], "degraded");

        let catalog = SourceCatalog::load(&sources).unwrap();
        let down = catalog.get("down").unwrap();
        assert_eq!(down.health.level, HealthLevel::Degraded);
        assert_eq!(down.health.last_status, Some(SourceStatus::Error));
        assert!(down.health.cooldown_until.is_some());

        // second run: the cooling-down source is skipped and items are refreshed, not duplicated
        let summary = collect(&ctx, &sources, &options(None, false, 0)).await.unwrap();
        assert_eq!(summary.sources_skipped_cooldown, 1);
        assert_eq!(ctx.store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_collect_enforces_min_successful() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.toml");
        fs::write(&sources, CATALOG).unwrap();

        let result = collect(&context(), &sources, &options(None, true, 2)).await;
        assert!(matches!(result, Err(NewsloomError::Other(msg)) if msg.contains("critical threshold")));
        // nothing written back on a failed run, items are still stored
        assert_eq!(fs::read_to_string(&sources).unwrap(), CATALOG);
    }

    #[tokio::test]
    async fn test_audit_updates_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.toml");
        let out = dir.path().join("audit.json");
        fs::write(&sources, CATALOG).unwrap();

        let confirmed = audit(&context(), &sources, true, Some(&out)).await.unwrap();
        assert_eq!(confirmed, 1);

        let catalog = SourceCatalog::load(&sources).unwrap();
        assert_eq!(catalog.get("lab").unwrap().rss.check_method, "http_probe");
        assert!(catalog.get("down").unwrap().rss.url.is_none());

        let report: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(report["sources_total"], 2);
        assert_eq!(report["confirmed_total"], 1);
    }

    #[test]
    fn test_list_unknown_source() {
        let dir = tempfile::tempdir().unwrap();
        let sources = dir.path().join("sources.toml");
        fs::write(&sources, CATALOG).unwrap();
        assert!(matches!(
            list_sources(&sources, Some("missing")),
            Err(NewsloomError::SourceNotFound(_))
        ));
        assert!(list_sources(&sources, None).is_ok());
    }
}

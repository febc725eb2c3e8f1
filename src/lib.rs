//! # Newsloom
//!
//! Collects AI news from a catalog of sources, whether or not they publish a feed.
//!
//! ## Architecture
//!
//! Each source runs through a fixed chain, then the run is persisted:
//!
//! ```text
//! configured feed → discovered feed → homepage extraction → Store
//!                                                        ↘ health write-back
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Collect every source, store items and write a run report
//! newsloom collect --output out/latest.json --update-sources
//!
//! # Probe every source for a working feed
//! newsloom audit --update
//!
//! # Inspect the catalog
//! newsloom sources
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the store,
/// fetcher and parallel collector.
pub mod app;

/// Command-line interface using clap.
///
/// - `collect` - Collect, store and report
/// - `audit` - Feed discovery only
/// - `sources [id]` - Show catalog entries
pub mod cli;

/// Single-source collection chain.
pub mod collector;

/// Application settings and the source catalog.
///
/// Settings load from `~/.config/newsloom/config.toml`; the catalog is a
/// separate TOML file of `[[sources]]` tables.
pub mod config;

/// Core domain models.
///
/// - [`SourceConfig`](domain::SourceConfig): A configured origin with feed and crawl settings
/// - [`CollectedItem`](domain::CollectedItem): One article, with provenance
/// - [`SourceReport`](domain::SourceReport): Per-source outcome of a run
pub mod domain;

/// Homepage article extraction.
pub mod extractor;

/// Feed discovery and parsing.
pub mod feed;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for GET requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Failure streaks, health levels and cooldowns.
pub mod health;

/// URL normalization, text cleanup, date parsing and item identity.
pub mod normalizer;

/// Concurrent collection with retry batches.
pub mod orchestrator;

/// SQLite persistence layer.
///
/// - [`ItemStore`](store::ItemStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

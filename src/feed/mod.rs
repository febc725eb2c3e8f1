//! Feed discovery and decoding.
//!
//! Discovery probes candidate URLs until one answers with something that
//! looks like a feed; the parser turns a confirmed feed into items.

pub mod discovery;
pub mod parser;

pub use discovery::{discover_feed, Discovery, DiscoveryStatus, FeedDiscoveryResult, ProbeLog, ProbeOutcome};
pub use parser::FeedParser;

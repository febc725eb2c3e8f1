pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newsloom")]
#[command(about = "Collects AI news from feeds and feedless homepages", long_about = None)]
pub struct Cli {
    /// Source catalog (defaults to collect.sources_path from the config file)
    #[arg(short, long, global = true)]
    pub sources: Option<PathBuf>,

    /// Number of sources processed concurrently (1-16)
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Collect items from every source and store them
    Collect {
        /// SQLite database path
        #[arg(long)]
        db: Option<PathBuf>,

        /// Items kept per source unless the source overrides it
        #[arg(long)]
        max_per_source: Option<usize>,

        /// Write feed discoveries and health back to the source catalog
        #[arg(long)]
        update_sources: bool,

        /// Write the run report as JSON to this path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail when fewer sources than this succeed
        #[arg(long, default_value_t = 0)]
        min_successful: usize,
    },
    /// Probe every source for a working feed
    Audit {
        /// Persist discovered feed URLs to the source catalog
        #[arg(long)]
        update: bool,

        /// Write the audit report as JSON to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List configured sources with their feed and health state
    Sources {
        /// Show a single source
        id: Option<String>,
    },
}

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use newsloom::app::AppContext;
use newsloom::cli::commands::{self, CollectOptions};
use newsloom::cli::{Cli, Commands};
use newsloom::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let sources_path = cli
        .sources
        .clone()
        .unwrap_or_else(|| config.collect.sources_path.clone());
    let workers = cli.workers.unwrap_or(config.collect.workers);

    match cli.command {
        Commands::Collect {
            db,
            max_per_source,
            update_sources,
            output,
            min_successful,
        } => {
            let options = CollectOptions {
                max_per_source: max_per_source.unwrap_or(config.collect.max_per_source),
                update_sources,
                output,
                min_successful,
            };
            let ctx = AppContext::new(config, db, workers)?;
            commands::collect(&ctx, &sources_path, &options).await?;
        }
        Commands::Audit { update, out } => {
            let ctx = AppContext::new(config, None, workers)?;
            commands::audit(&ctx, &sources_path, update, out.as_deref()).await?;
        }
        Commands::Sources { id } => {
            commands::list_sources(&sources_path, id.as_deref())?;
        }
    }

    Ok(())
}

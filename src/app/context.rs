use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{NewsloomError, Result};
use crate::collector::SourceCollector;
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::SharedFetcher;
use crate::orchestrator::ParallelCollector;
use crate::store::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: SharedFetcher,
    pub collector: ParallelCollector,
}

impl AppContext {
    pub fn new(config: Config, db_path: Option<PathBuf>, workers: usize) -> Result<Self> {
        let db_path = match db_path.or_else(|| config.collect.db_path.clone()) {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let fetcher: SharedFetcher = Arc::new(HttpFetcher::new(&config.http)?);
        Ok(Self::with_parts(config, store, fetcher, workers))
    }

    /// Context over an in-memory store and a caller-supplied fetcher.
    pub fn in_memory(fetcher: SharedFetcher, workers: usize) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Ok(Self::with_parts(Config::default(), store, fetcher, workers))
    }

    fn with_parts(config: Config, store: Arc<SqliteStore>, fetcher: SharedFetcher, workers: usize) -> Self {
        let collector = ParallelCollector::with_workers(SourceCollector::new(fetcher.clone()), workers);
        Self {
            config,
            store,
            fetcher,
            collector,
        }
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| NewsloomError::Other("Could not find data directory".into()))?;
        let app_dir = data_dir.join("newsloom");
        std::fs::create_dir_all(&app_dir)?;
        Ok(app_dir.join("newsloom.db"))
    }
}

//! Configuration management for newsloom.
//!
//! Application settings are read from `~/.config/newsloom/config.toml` at
//! startup. If the file doesn't exist, a default configuration with comments
//! is created. The source list lives in a separate catalog file, see
//! [`SourceCatalog`].

pub mod catalog;

pub use catalog::SourceCatalog;

use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_USER_AGENT: &str = concat!("newsloom/", env!("CARGO_PKG_VERSION"));

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub http: HttpConfig,
    pub collect: CollectConfig,
}

/// Outbound request settings shared by every fetch.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 4,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Defaults for `newsloom collect` and `newsloom audit`; CLI flags override them.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollectConfig {
    pub workers: usize,
    pub max_per_source: usize,
    pub db_path: Option<PathBuf>,
    pub sources_path: PathBuf,
}

impl Default for CollectConfig {
    fn default() -> Self {
        Self {
            workers: 8,
            max_per_source: 20,
            db_path: None,
            sources_path: PathBuf::from("config/sources.toml"),
        }
    }
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// If the config file doesn't exist, creates a default one with comments.
    /// If the config file exists but is invalid, returns an error.
    /// Missing fields in the config file will use default values.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::default_config_path()?;

        if !config_path.exists() {
            Self::create_default_config(&config_path)?;
            return Ok(Self::default());
        }

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/newsloom/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("newsloom").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        tracing::info!("Created default config at {}", path.display());
        Ok(())
    }

    /// Generate the default config file content with comments.
    fn default_config_content() -> String {
        format!(
            r##"# newsloom configuration
#
# Command-line flags take precedence over the values below.

[http]
# Total request timeout in seconds
timeout_secs = 10

# TCP connect timeout in seconds
connect_timeout_secs = 4

user_agent = "{user_agent}"

[collect]
# Sources collected concurrently (1-16)
workers = 8

# Items kept per source unless the source sets crawl.max_items
max_per_source = 20

# SQLite database; defaults to the platform data directory
# db_path = "/var/lib/newsloom/items.db"

# Source catalog (TOML, one [[sources]] table per source)
sources_path = "config/sources.toml"
"##,
            user_agent = DEFAULT_USER_AGENT
        )
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config file for {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: toml::ser::Error,
    },

    #[error("Invalid source {id:?}: {reason}")]
    InvalidSource { id: String, reason: String },
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum NewsloomError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http_{status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Feed parsing error: {0}")]
    FeedParse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),

    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, NewsloomError>;

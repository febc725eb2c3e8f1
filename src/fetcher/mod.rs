pub mod http_fetcher;
#[cfg(test)]
pub mod stub;

use async_trait::async_trait;

use crate::app::Result;

#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchResponse {
    pub fn is_error(&self) -> bool {
        self.status >= 400
    }

    pub fn content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or("")
    }
}

/// GET capability used by every collection stage.
///
/// Implementations follow redirects and enforce their own timeouts; an
/// unreachable host is an `Err`, an HTTP error status is a response.
#[async_trait]
pub trait Fetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse>;
}

pub type SharedFetcher = std::sync::Arc<dyn Fetcher + Send + Sync>;

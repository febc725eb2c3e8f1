//! Canned-response fetcher for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::app::{NewsloomError, Result};
use crate::fetcher::{FetchResponse, Fetcher};
use crate::normalizer::normalize_url;

#[derive(Default)]
struct Route {
    failures_left: usize,
    response: Option<FetchResponse>,
}

/// Serves registered responses, answers 404 for everything else and records every call.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, url: &str, status: u16, content_type: Option<&str>, body: &str) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            let route = routes.entry(normalize_url(url)).or_default();
            route.response = Some(FetchResponse {
                status,
                content_type: content_type.map(str::to_string),
                body: body.to_string(),
            });
        }
        self
    }

    pub fn with_html(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("text/html; charset=utf-8"), body)
    }

    pub fn with_rss(self, url: &str, body: &str) -> Self {
        self.with_response(url, 200, Some("application/rss+xml"), body)
    }

    /// Fail the next `times` requests to `url` with a connection error.
    pub fn failing(self, url: &str, times: usize) -> Self {
        {
            let mut routes = self.routes.lock().unwrap();
            routes.entry(normalize_url(url)).or_default().failures_left = times;
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        let key = normalize_url(url);
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|called| **called == key)
            .count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn get(&self, url: &str) -> Result<FetchResponse> {
        let key = normalize_url(url);
        self.calls.lock().unwrap().push(key.clone());

        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(&key) {
            Some(route) if route.failures_left > 0 => {
                route.failures_left -= 1;
                Err(NewsloomError::Other(format!("connection refused: {}", key)))
            }
            Some(Route {
                response: Some(response),
                ..
            }) => Ok(response.clone()),
            _ => Ok(FetchResponse {
                status: 404,
                content_type: Some("text/html".to_string()),
                body: "not found".to_string(),
            }),
        }
    }
}

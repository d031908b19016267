//! In-memory fakes for loader collaborators (testing only)
//!
//! `FakeFetcher` serves canned bundle responses and counts requests so
//! tests can assert which tier served a resolution.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{PackError, PackResult};
use crate::loader::BundleFetcher;

#[derive(Debug, Clone)]
enum FakeResponse {
    Body(String),
    Status(u16),
}

/// Bundle fetcher backed by a `HashMap<url, response>`
#[derive(Debug, Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, FakeResponse>>,
    requests: Mutex<Vec<String>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `code` for `url`
    pub fn serve(&self, url: impl Into<String>, code: impl Into<String>) {
        self.responses
            .lock()
            .insert(url.into(), FakeResponse::Body(code.into()));
    }

    /// Answer `url` with an HTTP error status
    pub fn fail_with(&self, url: impl Into<String>, status: u16) {
        self.responses
            .lock()
            .insert(url.into(), FakeResponse::Status(status));
    }

    /// Sleep before answering every request
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    /// Number of fetches performed
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    /// Fetches performed for one url
    pub fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl BundleFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> PackResult<String> {
        self.requests.lock().push(url.to_string());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let response = self.responses.lock().get(url).cloned();
        match response {
            Some(FakeResponse::Body(code)) => Ok(code),
            Some(FakeResponse::Status(status)) => Err(PackError::FetchStatus {
                status,
                url: url.to_string(),
            }),
            None => Err(PackError::FetchStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

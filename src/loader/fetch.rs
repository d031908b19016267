//! Remote bundle fetching
//!
//! Downloads bundle code from object storage. `http(s)://` URLs go through a
//! blocking HTTP agent on the blocking thread pool; `file://` URLs are read
//! from the local filesystem.

use crate::error::{PackError, PackResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Maximum bundle size (50 MB)
pub const MAX_BUNDLE_SIZE: u64 = 50 * 1024 * 1024;

/// Default request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads bundle source code
#[async_trait]
pub trait BundleFetcher: Send + Sync {
    /// Fetch the bundle at `url`; non-success responses are errors
    async fn fetch(&self, url: &str) -> PackResult<String>;
}

/// Fetcher for `http://`, `https://` and `file://` bundle URLs
#[derive(Debug, Clone)]
pub struct HttpBundleFetcher {
    agent: ureq::Agent,
    timeout: Duration,
    max_size: u64,
}

impl Default for HttpBundleFetcher {
    fn default() -> Self {
        Self::new(REQUEST_TIMEOUT, MAX_BUNDLE_SIZE)
    }
}

impl HttpBundleFetcher {
    pub fn new(timeout: Duration, max_size: u64) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
            timeout,
            max_size,
        }
    }

    async fn fetch_file(&self, url: &str, path: PathBuf) -> PackResult<String> {
        let meta = fs::metadata(&path).await.map_err(|e| PackError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if meta.len() > self.max_size {
            return Err(PackError::BundleTooLarge {
                size: meta.len(),
                max: self.max_size,
            });
        }

        fs::read_to_string(&path)
            .await
            .map_err(|e| PackError::Fetch {
                url: url.to_string(),
                reason: e.to_string(),
            })
    }

    async fn fetch_http(&self, url: &str) -> PackResult<String> {
        let agent = self.agent.clone();
        let owned_url = url.to_string();
        let max_size = self.max_size;
        let timeout = self.timeout;

        tokio::task::spawn_blocking(move || fetch_blocking(&agent, &owned_url, max_size, timeout))
            .await
            .map_err(|e| PackError::Internal(format!("fetch task failed: {}", e)))?
    }
}

#[async_trait]
impl BundleFetcher for HttpBundleFetcher {
    async fn fetch(&self, url: &str) -> PackResult<String> {
        debug!("Fetching bundle from {}", url);

        if let Some(path) = url.strip_prefix("file://") {
            return self.fetch_file(url, PathBuf::from(path)).await;
        }
        if url.starts_with("http://") || url.starts_with("https://") {
            return self.fetch_http(url).await;
        }

        let scheme = url.split_once("://").map_or(url, |(scheme, _)| scheme);
        Err(PackError::UnsupportedScheme(scheme.to_string()))
    }
}

fn fetch_blocking(
    agent: &ureq::Agent,
    url: &str,
    max_size: u64,
    timeout: Duration,
) -> PackResult<String> {
    let fetch_error = |e: ureq::Error| match e {
        ureq::Error::Timeout(_) => PackError::Timeout {
            operation: format!("fetching {}", url),
            secs: timeout.as_secs(),
        },
        ureq::Error::BodyExceedsLimit(_) => PackError::BundleTooLarge {
            size: max_size.saturating_add(1),
            max: max_size,
        },
        other => PackError::Fetch {
            url: url.to_string(),
            reason: other.to_string(),
        },
    };

    let mut response = agent.get(url).call().map_err(fetch_error)?;

    let status = response.status();
    if !status.is_success() {
        return Err(PackError::FetchStatus {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    if let Some(len) = response.body().content_length() {
        if len > max_size {
            return Err(PackError::BundleTooLarge {
                size: len,
                max: max_size,
            });
        }
    }

    response
        .body_mut()
        .with_config()
        .limit(max_size)
        .read_to_string()
        .map_err(fetch_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use tempfile::TempDir;

    /// Answer a single HTTP request with a canned response, return its URL
    fn serve_once(response: Vec<u8>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        std::thread::spawn(move || {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match stream.read(&mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            // The client may hang up early on oversized bodies
            let _ = stream.write_all(&response);
            let _ = stream.flush();
        });

        format!("http://{}/bundles/acme.json", addr)
    }

    fn http_response(status_line: &str, headers: &str, body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 {}\r\nConnection: close\r\n{}\r\n{}",
            status_line, headers, body
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn http_ok_returns_body() {
        let url = serve_once(http_response("200 OK", "Content-Length: 2\r\n", "{}"));

        let code = HttpBundleFetcher::default().fetch(&url).await.unwrap();
        assert_eq!(code, "{}");
    }

    #[tokio::test]
    async fn http_error_status_is_fetch_status() {
        let url = serve_once(http_response(
            "500 Internal Server Error",
            "Content-Length: 0\r\n",
            "",
        ));

        let err = HttpBundleFetcher::default().fetch(&url).await.unwrap_err();
        assert!(
            matches!(err, PackError::FetchStatus { status: 500, ref url } if url.ends_with("/bundles/acme.json")),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn http_declared_length_over_limit() {
        let body = "x".repeat(64);
        let url = serve_once(http_response("200 OK", "Content-Length: 64\r\n", &body));

        let err = HttpBundleFetcher::new(REQUEST_TIMEOUT, 16)
            .fetch(&url)
            .await
            .unwrap_err();
        assert!(
            matches!(err, PackError::BundleTooLarge { size: 64, max: 16 }),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn http_chunked_body_over_limit() {
        let body = format!("40\r\n{}\r\n0\r\n\r\n", "x".repeat(64));
        let url = serve_once(http_response(
            "200 OK",
            "Transfer-Encoding: chunked\r\n",
            &body,
        ));

        let err = HttpBundleFetcher::new(REQUEST_TIMEOUT, 16)
            .fetch(&url)
            .await
            .unwrap_err();
        assert!(
            matches!(err, PackError::BundleTooLarge { max: 16, .. }),
            "unexpected error: {:?}",
            err
        );
    }

    #[tokio::test]
    async fn file_url_reads_bundle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, "{}").unwrap();

        let fetcher = HttpBundleFetcher::default();
        let code = fetcher
            .fetch(&format!("file://{}", path.display()))
            .await
            .unwrap();
        assert_eq!(code, "{}");
    }

    #[tokio::test]
    async fn file_url_missing_is_fetch_error() {
        let dir = TempDir::new().unwrap();
        let url = format!("file://{}", dir.path().join("none.json").display());

        let err = HttpBundleFetcher::default().fetch(&url).await.unwrap_err();
        assert!(matches!(err, PackError::Fetch { .. }));
    }

    #[tokio::test]
    async fn file_url_respects_size_limit() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bundle.json");
        std::fs::write(&path, "x".repeat(64)).unwrap();

        let fetcher = HttpBundleFetcher::new(REQUEST_TIMEOUT, 16);
        let err = fetcher
            .fetch(&format!("file://{}", path.display()))
            .await
            .unwrap_err();
        assert!(matches!(err, PackError::BundleTooLarge { size: 64, max: 16 }));
    }

    #[tokio::test]
    async fn unsupported_scheme_rejected() {
        let err = HttpBundleFetcher::default()
            .fetch("s3://bucket/bundle.json")
            .await
            .unwrap_err();
        assert!(matches!(err, PackError::UnsupportedScheme(s) if s == "s3"));
    }
}

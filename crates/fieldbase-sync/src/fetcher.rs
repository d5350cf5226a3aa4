//! # Feed Fetcher
//!
//! Single-attempt HTTP retrieval of content feeds and outbox submissions.
//!
//! ## Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  fetch(url) -> Option<String>                                       │
//! │                                                                     │
//! │  • one GET, fixed connect/read timeout (default 30 s)               │
//! │  • redirects followed                                               │
//! │  • no internal retries - retry policy lives in the coordinator      │
//! │  • None on ANY failure: timeout, refused, non-2xx, body error       │
//! │  • never panics or raises across this boundary                     │
//! │                                                                     │
//! │  The same primitive serves both feed download and outbox            │
//! │  submission; for submissions the response body is the search        │
//! │  result content.                                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Transport Trait
// =============================================================================

/// The network seam of the sync engine. Tests substitute scripted
/// implementations; production uses [`HttpFetcher`].
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Retrieves the resource at `url`. `None` is the sole failure
    /// signal; callers never see transport errors directly.
    async fn fetch(&self, url: &str) -> Option<String>;
}

// =============================================================================
// HTTP Fetcher
// =============================================================================

/// Production transport over reqwest.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Builds a fetcher with the configured timeout applied to both
    /// connect and read.
    pub fn new(config: &SyncConfig) -> SyncResult<Self> {
        let timeout = Duration::from_millis(config.sync.fetch_timeout_ms);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| SyncError::Internal(format!("HTTP client build failed: {}", e)))?;

        Ok(HttpFetcher { client })
    }
}

#[async_trait]
impl FeedTransport for HttpFetcher {
    async fn fetch(&self, url: &str) -> Option<String> {
        debug!(url, "Fetching");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Fetch failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!(url, status = %status, "Fetch returned non-success status");
            // Drain the body so the connection is returned to the pool.
            let _ = response.text().await;
            return None;
        }

        match response.text().await {
            Ok(body) => {
                debug!(url, bytes = body.len(), "Fetch complete");
                Some(body)
            }
            Err(e) => {
                warn!(url, error = %e, "Failed reading fetch body");
                None
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ServerSettings, SyncSettings};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn fetcher_with_timeout(timeout_ms: u64) -> HttpFetcher {
        let config = SyncConfig {
            server: ServerSettings {
                base_url: "http://127.0.0.1/".into(),
                ..Default::default()
            },
            sync: SyncSettings {
                fetch_timeout_ms: timeout_ms,
                ..Default::default()
            },
            ..Default::default()
        };
        HttpFetcher::new(&config).unwrap()
    }

    /// Serves exactly one connection with the given status/body, after an
    /// optional delay. Returns the URL to hit.
    async fn serve_once(status: u16, body: &'static str, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test listener");
        let addr = listener.local_addr().expect("listener addr");

        tokio::spawn(async move {
            if let Ok((mut stream, _)) = listener.accept().await {
                // Read the request head before answering.
                let mut buf = [0_u8; 2048];
                let _ = stream.read(&mut buf).await;

                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }

                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    status,
                    reason,
                    body.len(),
                    body
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.flush().await;
            }
        });

        format!("http://{}/feed", addr)
    }

    #[tokio::test]
    async fn test_success_returns_body_verbatim() {
        let url = serve_once(200, "payload-bytes", Duration::ZERO).await;
        let fetcher = fetcher_with_timeout(2_000);

        assert_eq!(fetcher.fetch(&url).await.as_deref(), Some("payload-bytes"));
    }

    #[tokio::test]
    async fn test_non_success_status_is_none() {
        let url = serve_once(500, "boom", Duration::ZERO).await;
        let fetcher = fetcher_with_timeout(2_000);

        assert_eq!(fetcher.fetch(&url).await, None);
    }

    #[tokio::test]
    async fn test_timeout_is_none() {
        let url = serve_once(200, "late", Duration::from_millis(800)).await;
        let fetcher = fetcher_with_timeout(100);

        assert_eq!(fetcher.fetch(&url).await, None);
    }

    #[tokio::test]
    async fn test_refused_connection_is_none() {
        // Bind then drop to get a port nothing listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = fetcher_with_timeout(500);
        assert_eq!(fetcher.fetch(&format!("http://{}/feed", addr)).await, None);
    }
}

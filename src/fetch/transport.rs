//! Transport Module
//!
//! Byte-fetch collaborators used by the [`Fetcher`](super::Fetcher).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::Client;
use tracing::{debug, warn};

use crate::cache::Blob;
use crate::error::NetworkError;

// == Transport Trait ==
/// Fetches the raw bytes behind a URL.
///
/// Implementations must honor `timeout` and must not serve bytes from a
/// cache of their own.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Blob, NetworkError>;
}

// == HTTP Transport ==
/// HTTP transport backed by reqwest.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Blob, NetworkError> {
        debug!(url, "fetching asset over HTTP");

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .send()
            .await
            .map_err(|err| classify(err, timeout))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, url, "asset fetch rejected");
            return Err(NetworkError::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|err| classify(err, timeout))?;
        debug!(url, size = body.len(), "fetched asset");
        Ok(Blob::from(body.as_ref()))
    }
}

fn classify(err: reqwest::Error, timeout: Duration) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout(timeout)
    } else {
        err.into()
    }
}

// == Memory Transport ==
#[derive(Debug, Clone)]
enum Reply {
    Body(Blob),
    Status(u16),
}

#[derive(Debug, Clone)]
struct Route {
    reply: Reply,
    delay: Duration,
}

/// In-process transport answering from a fixed routing table.
///
/// Useful offline and in tests. Every call is counted per URL; unknown URLs
/// answer with status 404.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: Mutex<HashMap<String, Route>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `body` for `url`.
    pub fn with_body(self, url: impl Into<String>, body: impl Into<Blob>) -> Self {
        self.route(url, Reply::Body(body.into()), Duration::ZERO);
        self
    }

    /// Serves `body` for `url` after waiting `delay`.
    pub fn with_delayed_body(
        self,
        url: impl Into<String>,
        body: impl Into<Blob>,
        delay: Duration,
    ) -> Self {
        self.route(url, Reply::Body(body.into()), delay);
        self
    }

    /// Answers `url` with an error status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        self.route(url, Reply::Status(status), Duration::ZERO);
        self
    }

    /// Replaces the body served for `url`.
    pub fn set_body(&self, url: impl Into<String>, body: impl Into<Blob>) {
        self.route(url, Reply::Body(body.into()), Duration::ZERO);
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Number of fetches issued for `url`.
    pub fn calls_for(&self, url: &str) -> usize {
        lock(&self.calls).get(url).copied().unwrap_or(0)
    }

    /// Number of fetches issued overall.
    pub fn total_calls(&self) -> usize {
        lock(&self.calls).values().sum()
    }

    fn route(&self, url: impl Into<String>, reply: Reply, delay: Duration) {
        lock(&self.routes).insert(url.into(), Route { reply, delay });
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<Blob, NetworkError> {
        *lock(&self.calls).entry(url.to_string()).or_insert(0) += 1;
        let route = lock(&self.routes).get(url).cloned();

        let Some(route) = route else {
            return Err(NetworkError::Status(404));
        };
        if !route.delay.is_zero() {
            tokio::time::sleep(route.delay).await;
        }
        match route.reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(NetworkError::Status(status)),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_transport_serves_routes() {
        let transport = MemoryTransport::new()
            .with_body("/a.json", br#"{"x":1}"#.to_vec())
            .with_status("/gone", 410);

        let body = transport.get("/a.json", Duration::from_secs(1)).await.unwrap();
        assert_eq!(&*body, br#"{"x":1}"#);

        let err = transport.get("/gone", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NetworkError::Status(410)));

        let err = transport.get("/missing", Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, NetworkError::Status(404)));
    }

    #[tokio::test]
    async fn test_memory_transport_counts_calls() {
        let transport = MemoryTransport::new().with_body("/a", b"a".to_vec());

        transport.get("/a", Duration::from_secs(1)).await.unwrap();
        transport.get("/a", Duration::from_secs(1)).await.unwrap();
        let _ = transport.get("/b", Duration::from_secs(1)).await;

        assert_eq!(transport.calls_for("/a"), 2);
        assert_eq!(transport.calls_for("/b"), 1);
        assert_eq!(transport.total_calls(), 3);
    }

    #[tokio::test]
    async fn test_memory_transport_set_body_replaces() {
        let transport = MemoryTransport::new().with_body("/a", b"old".to_vec());
        transport.set_body("/a", b"new".to_vec());

        let body = transport.get("/a", Duration::from_secs(1)).await.unwrap();
        assert_eq!(&*body, b"new");
    }

    #[test]
    fn test_classify_non_timeout_error() {
        // Building a request with an invalid URL gives a non-timeout reqwest error
        let err = Client::new().get("not a url").build().unwrap_err();
        assert!(matches!(
            classify(err, Duration::from_secs(3)),
            NetworkError::Connection(_)
        ));
    }
}

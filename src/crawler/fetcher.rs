//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building the shared HTTP client (the crawl session)
//! - Randomized User-Agent selection per request
//! - Browser-like default headers for page GETs
//! - JSON headers for the phone-reveal POST
//! - The global concurrency limiter around every outbound request
//! - Folding transport and status failures into a single `FetchError`
//!
//! There is no retry here; callers decide what a failure means.

use crate::config::CrawlerConfig;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Semaphore;

/// Fixed pool of browser User-Agent strings
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.6261.57 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:124.0) Gecko/20100101 Firefox/124.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:109.0) Gecko/20100101 Firefox/117.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36 Edg/122.0.0.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 13_3_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.4 Safari/605.1.15",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 16_5 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.5 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Linux; Android 13; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.6261.57 Mobile Safari/537.36",
];

const PAGE_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8,application/signed-exchange;v=b3;q=0.7";
const ACCEPT_LANGUAGE: &str = "ru-RU,ru;q=0.9,en-US;q=0.8,en;q=0.7";

/// HTTP methods the fetcher issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
        }
    }
}

/// Any transport or HTTP failure of a single request
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-2xx status
    #[error("HTTP {status} for {method} {url} (headers: {headers:?}, payload: {payload:?})")]
    Status {
        method: HttpMethod,
        url: String,
        status: u16,
        /// Request headers as sent, credentials redacted
        headers: HeaderMap,
        payload: Option<String>,
    },

    /// Connection, timeout, TLS or body-read failure
    #[error("{method} {url} failed: {source} (headers: {headers:?}, payload: {payload:?})")]
    Transport {
        method: HttpMethod,
        url: String,
        headers: HeaderMap,
        payload: Option<String>,
        source: reqwest::Error,
    },

    /// The concurrency limiter was closed while waiting for a permit
    #[error("request limiter closed before {method} {url}")]
    LimiterClosed { method: HttpMethod, url: String },
}

impl FetchError {
    /// URL of the failed request
    pub fn url(&self) -> &str {
        match self {
            Self::Status { url, .. } | Self::Transport { url, .. } | Self::LimiterClosed { url, .. } => {
                url
            }
        }
    }

    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Request headers of the failed request, when it was sent
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Self::Status { headers, .. } | Self::Transport { headers, .. } => Some(headers),
            Self::LimiterClosed { .. } => None,
        }
    }
}

/// Copy of `headers` safe to attach to an error; credential values are
/// masked
fn redacted(headers: &HeaderMap) -> HeaderMap {
    let mut copy = headers.clone();
    for name in [
        reqwest::header::AUTHORIZATION,
        reqwest::header::COOKIE,
        reqwest::header::PROXY_AUTHORIZATION,
    ] {
        if copy.contains_key(&name) {
            copy.insert(name, HeaderValue::from_static("<redacted>"));
        }
    }
    copy
}

/// Builds the HTTP client shared by every request of a crawl
///
/// No User-Agent is set on the client: every request picks its own from
/// [`USER_AGENTS`].
pub fn build_http_client(config: &CrawlerConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(20)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Picks a User-Agent from the fixed pool
pub fn random_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}

/// Stateless page fetcher
///
/// Cloning is cheap: the client and the limiter are shared, so every clone
/// draws from the same permit pool.
#[derive(Clone)]
pub struct PageFetcher {
    client: Client,
    limiter: Arc<Semaphore>,
    max_in_flight: usize,
    origin: String,
}

impl PageFetcher {
    /// Creates a fetcher
    ///
    /// # Arguments
    ///
    /// * `client` - The crawl session
    /// * `max_concurrent_requests` - Size of the global permit pool
    /// * `origin` - Value of the `Origin` header (scheme + host of the site)
    pub fn new(client: Client, max_concurrent_requests: usize, origin: impl Into<String>) -> Self {
        let max_in_flight = max_concurrent_requests.max(1);
        Self {
            client,
            limiter: Arc::new(Semaphore::new(max_in_flight)),
            max_in_flight,
            origin: origin.into(),
        }
    }

    /// Number of requests currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.max_in_flight - self.limiter.available_permits()
    }

    /// Performs a request and returns the body decoded with the response charset
    ///
    /// The permit is held for the whole exchange, body read included, and is
    /// released on every path when it goes out of scope.
    pub async fn fetch(
        &self,
        method: HttpMethod,
        url: &str,
        headers: HeaderMap,
        payload: Option<&Value>,
    ) -> Result<String, FetchError> {
        let payload_text = payload.map(|p| p.to_string());
        let sent_headers = redacted(&headers);

        let _permit = self
            .limiter
            .acquire()
            .await
            .map_err(|_| FetchError::LimiterClosed {
                method,
                url: url.to_string(),
            })?;

        let mut request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        }
        .headers(headers);

        if let Some(payload) = payload {
            request = request.json(payload);
        }

        let transport = |source: reqwest::Error| FetchError::Transport {
            method,
            url: url.to_string(),
            headers: sent_headers.clone(),
            payload: payload_text.clone(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();

        if !status.is_success() {
            tracing::debug!("{} {} answered {}", method, url, status);
            return Err(FetchError::Status {
                method,
                url: url.to_string(),
                status: status.as_u16(),
                headers: sent_headers.clone(),
                payload: payload_text.clone(),
            });
        }

        response.text().await.map_err(transport)
    }

    /// GET with browser-like default headers
    pub async fn get(&self, url: &str) -> Result<String, FetchError> {
        let headers = self.page_headers(url);
        self.fetch(HttpMethod::Get, url, headers, None).await
    }

    /// POST with a JSON payload and caller-provided headers
    pub async fn post(
        &self,
        url: &str,
        headers: HeaderMap,
        payload: &Value,
    ) -> Result<String, FetchError> {
        self.fetch(HttpMethod::Post, url, headers, Some(payload)).await
    }

    /// Browser-like headers for listing and detail pages
    pub fn page_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert(&mut headers, reqwest::header::USER_AGENT, random_user_agent());
        insert(&mut headers, reqwest::header::ACCEPT, PAGE_ACCEPT);
        insert(&mut headers, reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE);
        insert(&mut headers, reqwest::header::REFERER, referer);
        insert(&mut headers, reqwest::header::ORIGIN, &self.origin);
        insert(&mut headers, reqwest::header::CACHE_CONTROL, "no-cache");
        headers
    }

    /// JSON headers for the phone-reveal POST issued from a detail page
    pub fn phone_headers(&self, referer: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        insert(&mut headers, reqwest::header::USER_AGENT, random_user_agent());
        insert(&mut headers, reqwest::header::ACCEPT, "*/*");
        insert(&mut headers, reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE);
        insert(&mut headers, reqwest::header::CONTENT_TYPE, "application/json");
        insert(&mut headers, reqwest::header::ORIGIN, &self.origin);
        insert(&mut headers, reqwest::header::REFERER, referer);
        insert(&mut headers, reqwest::header::CACHE_CONTROL, "no-cache");
        headers
    }
}

/// Inserts a header, skipping values that are not valid header text
fn insert(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(name, value);
        }
        Err(_) => tracing::debug!("Skipping invalid {} header value: {:?}", name, value),
    }
}

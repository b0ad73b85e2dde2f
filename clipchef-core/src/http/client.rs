//! HTTP client trait and implementations.

use async_trait::async_trait;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use crate::error::FetchError;

use super::rate_limiter::RateLimiter;

/// Trait for HTTP clients, enabling mockability in tests.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Fetch binary content from a URL.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError>;

    /// Stream a URL into `dest`, failing once more than `max_bytes` arrive.
    /// Returns the number of bytes written.
    async fn download_to(&self, url: &str, dest: &Path, max_bytes: u64)
        -> Result<u64, FetchError>;

    /// POST a JSON body and decode a JSON response. An empty body decodes to `Null`.
    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &JsonValue,
    ) -> Result<JsonValue, FetchError>;

    /// POST raw bytes with the given content type, ignoring the response body.
    async fn post_bytes(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), FetchError>;
}

/// Configuration for ReqwestClient.
#[derive(Clone)]
pub struct HttpClientBuilder {
    rate_limit_ms: u64,
    timeout: Duration,
    user_agent: String,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        Self {
            rate_limit_ms: 0,
            timeout: Duration::from_secs(30),
            user_agent: "Mozilla/5.0 (compatible; ClipChef/1.0)".to_string(),
        }
    }

    /// Set the per-host rate limit delay in milliseconds. 0 disables rate limiting.
    pub fn rate_limit_ms(mut self, ms: u64) -> Self {
        self.rate_limit_ms = ms;
        self
    }

    /// Upper bound for a whole request, body included.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn build(self) -> Result<ReqwestClient, reqwest::Error> {
        let inner = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?;

        Ok(ReqwestClient {
            inner: Arc::new(inner),
            rate_limiter: RateLimiter::new(Duration::from_millis(self.rate_limit_ms)),
        })
    }
}

/// Production HTTP client with a request timeout and per-host rate limiting.
pub struct ReqwestClient {
    /// Shared reqwest client for connection pooling.
    inner: Arc<reqwest::Client>,
    rate_limiter: RateLimiter,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        HttpClientBuilder::new().build()
    }

    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    fn parse(url: &str) -> Result<reqwest::Url, FetchError> {
        reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(e.to_string()))
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<reqwest::Response, FetchError> {
        self.rate_limiter.wait_for_url(url).await;

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(url, status = %status, "network: request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: truncate(&body, 500),
            });
        }
        Ok(response)
    }

    fn with_headers(
        mut request: reqwest::RequestBuilder,
        headers: &[(&str, &str)],
    ) -> reqwest::RequestBuilder {
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        request
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let parsed = Self::parse(url)?;
        let response = self.send(self.inner.get(parsed), url).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        max_bytes: u64,
    ) -> Result<u64, FetchError> {
        let parsed = Self::parse(url)?;
        let mut response = self.send(self.inner.get(parsed), url).await?;

        if response.content_length().is_some_and(|len| len > max_bytes) {
            return Err(FetchError::TooLarge { max: max_bytes });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await? {
            written += chunk.len() as u64;
            if written > max_bytes {
                return Err(FetchError::TooLarge { max: max_bytes });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::debug!(url, bytes = written, "network: downloaded to disk");
        Ok(written)
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &JsonValue,
    ) -> Result<JsonValue, FetchError> {
        let parsed = Self::parse(url)?;
        let request = Self::with_headers(self.inner.post(parsed), headers).json(body);
        let response = self.send(request, url).await?;

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }

    async fn post_bytes(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), FetchError> {
        let parsed = Self::parse(url)?;
        let request = Self::with_headers(self.inner.post(parsed), headers)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);
        self.send(request, url).await?;
        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Mock response for testing.
#[derive(Clone)]
pub enum MockResponse {
    Bytes(Vec<u8>),
    Json(JsonValue),
    Status(u16),
    Error(String),
}

/// A request observed by [`MockClient`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub json: Option<JsonValue>,
    pub content_type: Option<String>,
    pub body_len: usize,
}

/// Mock HTTP client for testing. Responses are keyed by exact URL.
#[derive(Default)]
pub struct MockClient {
    responses: HashMap<String, MockResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, url: &str, response: MockResponse) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    pub fn with_bytes(self, url: &str, bytes: Vec<u8>) -> Self {
        self.with_response(url, MockResponse::Bytes(bytes))
    }

    pub fn with_json(self, url: &str, json: JsonValue) -> Self {
        self.with_response(url, MockResponse::Json(json))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        self.with_response(url, MockResponse::Status(status))
    }

    pub fn with_error(self, url: &str, error: &str) -> Self {
        self.with_response(url, MockResponse::Error(error.to_string()))
    }

    /// Every request made so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, request: RecordedRequest) {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
    }

    fn respond(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        match self.responses.get(url) {
            Some(MockResponse::Bytes(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Json(json)) => Ok(json.to_string().into_bytes()),
            Some(MockResponse::Status(status)) => Err(FetchError::Status {
                status: *status,
                url: url.to_string(),
                body: String::new(),
            }),
            Some(MockResponse::Error(e)) => Err(FetchError::InvalidUrl(e.clone())),
            None => Err(FetchError::InvalidUrl(format!(
                "No mock response for URL: {}",
                url
            ))),
        }
    }

    fn owned_headers(headers: &[(&str, &str)]) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

#[async_trait]
impl HttpClient for MockClient {
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.record(RecordedRequest {
            method: "GET",
            url: url.to_string(),
            headers: Vec::new(),
            json: None,
            content_type: None,
            body_len: 0,
        });
        self.respond(url)
    }

    async fn download_to(
        &self,
        url: &str,
        dest: &Path,
        max_bytes: u64,
    ) -> Result<u64, FetchError> {
        let bytes = self.fetch_bytes(url).await?;
        if bytes.len() as u64 > max_bytes {
            return Err(FetchError::TooLarge { max: max_bytes });
        }
        tokio::fs::write(dest, &bytes).await?;
        Ok(bytes.len() as u64)
    }

    async fn post_json(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        body: &JsonValue,
    ) -> Result<JsonValue, FetchError> {
        self.record(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            headers: Self::owned_headers(headers),
            json: Some(body.clone()),
            content_type: Some("application/json".to_string()),
            body_len: 0,
        });
        let bytes = self.respond(url)?;
        if bytes.is_empty() {
            return Ok(JsonValue::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| FetchError::InvalidResponse(e.to_string()))
    }

    async fn post_bytes(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), FetchError> {
        self.record(RecordedRequest {
            method: "POST",
            url: url.to_string(),
            headers: Self::owned_headers(headers),
            json: None,
            content_type: Some(content_type.to_string()),
            body_len: body.len(),
        });
        self.respond(url).map(|_| ())
    }
}

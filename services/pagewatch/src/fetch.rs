//! HTTP retrieval for tracker targets

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::FetchError;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;

    /// Send a POST request with a raw JSON body
    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, FetchError>;
}

/// Production HTTP client using reqwest with a bounded per-request timeout
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap(); // Should not fail with default settings
        Self { client }
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        tracing::debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;

        tracing::debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }

    async fn post_json(&self, url: &str, body: &str) -> Result<HttpResponse, FetchError> {
        tracing::debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_transport_error)?;

        tracing::debug!("POST {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, body })
    }
}

/// Retrieves raw content for tracker targets, optionally through a relay
///
/// Deployments that cannot reach cross-origin targets directly route every
/// request through a forwarding relay that takes the percent-encoded target
/// as a query suffix. Server deployments leave `relay_url` unset and fetch
/// the target directly. The two modes differ only in the URL on the wire.
pub struct Fetcher {
    http: Arc<dyn HttpClient>,
    relay_url: Option<String>,
}

impl fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("relay_url", &self.relay_url)
            .finish()
    }
}

impl Fetcher {
    pub fn new(http: Arc<dyn HttpClient>, relay_url: Option<String>) -> Self {
        Self { http, relay_url }
    }

    fn target_url(&self, url: &str) -> String {
        match &self.relay_url {
            Some(relay) => format!("{}{}", relay, urlencoding::encode(url)),
            None => url.to_string(),
        }
    }

    /// Fetch the raw response body for a tracker's target
    ///
    /// A present, non-empty `request_body` switches the request to a POST
    /// with a JSON content type; the body is passed through unvalidated.
    /// Non-2xx responses are failures. There is no retry; the next
    /// scheduled check is the retry policy.
    pub async fn fetch(&self, url: &str, request_body: Option<&str>) -> Result<String, FetchError> {
        let target = self.target_url(url);
        let response = match request_body {
            Some(body) if !body.is_empty() => self.http.post_json(&target, body).await?,
            _ => self.http.get(&target).await?,
        };

        if !(200..300).contains(&response.status) {
            return Err(FetchError::Status(response.status));
        }
        Ok(response.body)
    }
}

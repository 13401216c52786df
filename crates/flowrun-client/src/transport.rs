//! HTTP transport seam.
//!
//! The transport is constructed once by the caller and borrowed by every
//! request-issuing call, so tests can substitute a scripted fake.

use std::time::Duration;

use async_trait::async_trait;

use crate::connection::RequestDescriptor;
use crate::error::TransportError;

/// Default timeout for a single request.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP method used by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

/// Status and body of a received response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Sends a request and returns the raw response.
///
/// Implementations report only transport-level failures as errors; any
/// received response, whatever its status, is returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(
        &self,
        method: Method,
        request: &RequestDescriptor,
        body: Option<String>,
    ) -> Result<RawResponse, TransportError>;
}

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with the default timeout.
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// Create a transport with a custom per-request timeout.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .user_agent(format!("flowrun/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        method: Method,
        request: &RequestDescriptor,
        body: Option<String>,
    ) -> Result<RawResponse, TransportError> {
        let builder = match method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
        };

        let mut builder = builder
            .headers(request.headers.clone())
            .timeout(self.timeout);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}

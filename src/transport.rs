//! The transport primitive the executor sends requests through.
//!
//! [`ReqwestTransport`] is the default. Tests and embedders can supply their
//! own [`Transport`] to [`ShipEngine::with_transport`](crate::ShipEngine::with_transport).

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;
use url::Url;

/// A fully-built request, ready to go on the wire.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// The HTTP method. Always `POST` for JSON-RPC calls.
    pub method: Method,
    /// The target URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// The JSON body.
    pub body: Value,
}

/// A raw response as received from the wire.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// The undecoded body.
    pub body: String,
}

/// Failure to obtain any response at all.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The HTTP stack failed (DNS, connect, TLS, reset, ...).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

/// Sends a single request and returns whatever came back.
///
/// Implementations must not retry or classify; the executor owns both.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request.
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// A [`Transport`] backed by a pooled [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with a fresh connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) if the
    /// TLS backend cannot be initialized.
    pub fn new() -> crate::Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            crate::Error::configuration(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self::with_client(http_client))
    }

    /// Wraps an existing client, sharing its pool and settings.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let response = self
            .http_client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone())
            .json(&request.body)
            .send()
            .await?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

//! Per-call request state.

use crate::config::ShipEngineConfig;
use crate::events::{snapshot_headers, HeaderSnapshot, API_KEY_HEADER};
use crate::transport::TransportRequest;
use crate::{Error, Result};
use http::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

const SDK_USER_AGENT: &str = concat!("shipengine-rust/", env!("CARGO_PKG_VERSION"));

/// Everything needed to send one logical call, possibly several times.
///
/// Created once per call. The request id is generated here and stays the
/// same across retries.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// The id of this logical call, `req_` followed by 32 hex digits.
    pub request_id: String,
    /// The JSON-RPC method, such as `"address.validate.v1"`.
    pub rpc_method: String,
    /// The endpoint the request is POSTed to.
    pub url: Url,
    /// Request headers, including the API key.
    pub headers: HeaderMap,
    /// The JSON-RPC 2.0 request body.
    pub body: Value,
    /// How many retries the call may use.
    pub retries: u32,
    /// The wall-clock budget of the whole call.
    pub timeout: Duration,
}

impl RequestContext {
    /// Builds the context for a call of `rpc_method` with `params`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the API key is not a valid header value.
    pub fn new(
        config: &ShipEngineConfig,
        rpc_method: impl Into<String>,
        params: Value,
    ) -> Result<Self> {
        let rpc_method = rpc_method.into();
        let request_id = format!("req_{}", uuid::Uuid::new_v4().simple());

        let body = json!({
            "jsonrpc": "2.0",
            "id": request_id,
            "method": rpc_method,
            "params": params,
        });

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(SDK_USER_AGENT));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        Self {
            request_id,
            rpc_method,
            url: config.base_uri().clone(),
            headers,
            body,
            retries: config.retries(),
            timeout: config.timeout(),
        }
        .with_header(API_KEY_HEADER, config.api_key())
    }

    /// Adds or replaces a header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The headers as they appear in lifecycle events.
    pub fn header_snapshot(&self) -> HeaderSnapshot {
        snapshot_headers(&self.headers)
    }

    /// The request to hand to a [`Transport`](crate::transport::Transport).
    pub fn to_transport_request(&self) -> TransportRequest {
        TransportRequest {
            method: Method::POST,
            url: self.url.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

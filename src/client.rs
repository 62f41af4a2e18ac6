//! The ShipEngine client and its request executor.
//!
//! [`ShipEngine`] is the main entry point. Every operation goes through
//! [`ShipEngine::call`], which sends a JSON-RPC request, classifies the
//! response, retries rate-limited attempts while the retry count and timeout
//! allow, and notifies the configured listener along the way.

use crate::classify::{classify, Classification};
use crate::config::{ConfigOverrides, ShipEngineConfig};
use crate::context::RequestContext;
use crate::dispatcher::Dispatcher;
use crate::error::{ErrorCode, ErrorDetails, ErrorSource, ErrorType};
use crate::events::{
    build_message, response_message, snapshot_headers, EventKind, LifecycleEvent, MessageKind,
    RequestSentEvent, ResponseReceivedEvent,
};
use crate::models::{Address, AddressValidateResult, TrackPackageResult, TrackingQuery};
use crate::retry::RetryBudget;
use crate::transport::{ReqwestTransport, Transport, TransportResponse};
use crate::validation;
use crate::{Error, Response, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const ADDRESS_VALIDATE_METHOD: &str = "address.validate.v1";
const PACKAGE_TRACK_METHOD: &str = "package.track.v1";

/// A client for the ShipEngine API.
///
/// The client is cheap to clone and designed to be shared. Its configuration
/// and event subscriptions are fixed at construction, so concurrent calls
/// never observe each other's settings.
///
/// # Examples
///
/// ```no_run
/// use shipengine::{Address, ShipEngine, ShipEngineConfig};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), shipengine::Error> {
/// let config = ShipEngineConfig::builder()
///     .api_key("TEST_abc123")
///     .retries(2)
///     .timeout(Duration::from_secs(10))
///     .build()?;
/// let client = ShipEngine::from_config(config)?;
///
/// let address = Address::new(
///     vec!["4 Jersey St".to_string(), "Suite 200".to_string()],
///     "Boston",
///     "MA",
///     "02215",
///     "US",
/// );
///
/// let result = client.validate_address(&address).await?;
/// if let Some(normalized) = &result.normalized_address {
///     println!("Normalized: {:?}", normalized.street);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ShipEngine {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ShipEngineConfig,
    transport: Arc<dyn Transport>,
    dispatcher: Dispatcher,
}

impl ShipEngine {
    /// Creates a client with default settings and the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the API key is empty or contains
    /// whitespace, or [`Error::Configuration`] if the HTTP client cannot be
    /// built.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ShipEngineConfig::new(api_key)?)
    }

    /// Creates a client from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the HTTP client cannot be built.
    pub fn from_config(config: ShipEngineConfig) -> Result<Self> {
        Ok(Self::with_transport(config, Arc::new(ReqwestTransport::new()?)))
    }

    /// Creates a client that sends requests through `transport`.
    ///
    /// The configured event listener, if any, is subscribed to both lifecycle
    /// events here and nowhere else.
    pub fn with_transport(config: ShipEngineConfig, transport: Arc<dyn Transport>) -> Self {
        let dispatcher = match config.event_listener() {
            Some(listener) => Dispatcher::for_listener(Arc::clone(listener)),
            None => Dispatcher::new([EventKind::RequestSent, EventKind::ResponseReceived]),
        };

        Self {
            inner: Arc::new(ClientInner {
                config,
                transport,
                dispatcher,
            }),
        }
    }

    /// The client-wide configuration.
    pub fn config(&self) -> &ShipEngineConfig {
        &self.inner.config
    }

    /// The dispatcher lifecycle events are delivered through.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.inner.dispatcher
    }

    /// Validates an address and returns its normalized form.
    ///
    /// The address is checked locally first; a malformed address never
    /// reaches the network.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a malformed address, or any error
    /// [`ShipEngine::call`] can return.
    pub async fn validate_address(
        &self,
        address: &Address,
    ) -> Result<Response<AddressValidateResult>> {
        self.validate_address_with(address, None).await
    }

    /// Like [`ShipEngine::validate_address`], with per-call configuration overrides.
    ///
    /// # Errors
    ///
    /// Same as [`ShipEngine::validate_address`], plus validation errors for
    /// the overrides.
    pub async fn validate_address_with(
        &self,
        address: &Address,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Response<AddressValidateResult>> {
        validation::validate_address(address)?;

        let params = json!({ "address": address });
        let mut response: Response<AddressValidateResult> =
            self.call(ADDRESS_VALIDATE_METHOD, &params, overrides).await?;

        if response.data.request_id.is_none() {
            response.data.request_id = Some(response.request_id.clone());
        }
        Ok(response)
    }

    /// Fetches tracking information for a package.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the carrier code or tracking number is
    /// missing, or any error [`ShipEngine::call`] can return.
    pub async fn track_package(&self, query: &TrackingQuery) -> Result<Response<TrackPackageResult>> {
        self.track_package_with(query, None).await
    }

    /// Like [`ShipEngine::track_package`], with per-call configuration overrides.
    ///
    /// # Errors
    ///
    /// Same as [`ShipEngine::track_package`], plus validation errors for the
    /// overrides.
    pub async fn track_package_with(
        &self,
        query: &TrackingQuery,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Response<TrackPackageResult>> {
        validation::validate_tracking_query(query)?;

        let mut response: Response<TrackPackageResult> =
            self.call(PACKAGE_TRACK_METHOD, query, overrides).await?;
        response.data.request_id = Some(response.request_id.clone());
        Ok(response)
    }

    /// Calls a JSON-RPC method and deserializes its result.
    ///
    /// This is the request executor behind every operation. For each attempt
    /// it emits a [`RequestSentEvent`], sends the request with whatever is
    /// left of the timeout, and classifies the response:
    ///
    /// - success: emits a [`ResponseReceivedEvent`] and returns the result,
    ///   taken from the `result` member if present, else the whole body;
    /// - rate limited within budget: waits the server's `retryAfter` and
    ///   tries again while retries remain;
    /// - anything else: returns the error without retrying.
    ///
    /// Listener failures are logged and never fail the call.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientSystem`] for server-reported failures, network errors
    ///   and malformed payloads
    /// - [`Error::RateLimitExceeded`] if every attempt was rate limited
    /// - [`Error::ClientTimeout`] if the timeout ran out or the server asked
    ///   for a longer wait than it allows
    /// - [`Error::Protocol`] for error envelopes missing required members
    /// - [`Error::InvalidFieldValue`] / [`Error::Validation`] for bad overrides
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use shipengine::ShipEngine;
    /// use serde::Deserialize;
    /// use serde_json::json;
    ///
    /// #[derive(Deserialize)]
    /// struct Carriers {
    ///     carriers: Vec<serde_json::Value>,
    /// }
    ///
    /// # async fn example() -> Result<(), shipengine::Error> {
    /// let client = ShipEngine::new("TEST_abc123")?;
    /// let response = client
    ///     .call::<_, Carriers>("carrier.list.v1", &json!({}), None)
    ///     .await?;
    /// println!("{} carriers", response.carriers.len());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn call<P, R>(
        &self,
        rpc_method: &str,
        params: &P,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<Response<R>>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let config = match overrides {
            Some(overrides) => self.inner.config.merge(overrides)?,
            None => self.inner.config.clone(),
        };
        let params = serde_json::to_value(params)
            .map_err(|e| Error::internal(format!("Failed to serialize request params: {}", e)))?;

        let ctx = RequestContext::new(&config, rpc_method, params)?;
        let request = ctx.to_transport_request();
        let mut budget = RetryBudget::new(ctx.retries, ctx.timeout);

        loop {
            let attempt = budget.attempt();

            if budget.is_exhausted() {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    attempt = attempt,
                    timeout_secs = ctx.timeout.as_secs(),
                    "Timeout exhausted before request could be sent"
                );
                return Err(budget.timeout_error(Some(ctx.request_id.clone())));
            }

            self.emit(RequestSentEvent::new(
                &ctx.request_id,
                build_message(&ctx.rpc_method, ctx.url.as_str(), MessageKind::for_attempt(attempt)),
                ctx.url.as_str(),
                ctx.header_snapshot(),
                ctx.body.clone(),
                attempt,
                ctx.timeout,
            ));

            tracing::debug!(
                request_id = %ctx.request_id,
                method = %ctx.rpc_method,
                url = %ctx.url,
                attempt = attempt,
                "Executing ShipEngine request"
            );

            let raw = match tokio::time::timeout(
                budget.remaining(),
                self.inner.transport.send(&request),
            )
            .await
            {
                Ok(Ok(raw)) => raw,
                Ok(Err(e)) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        error = %e,
                        attempt = attempt,
                        "Request failed"
                    );
                    return Err(Error::transport(e.to_string()));
                }
                Err(_) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        attempt = attempt,
                        timeout_secs = ctx.timeout.as_secs(),
                        "Request timed out"
                    );
                    return Err(budget.timeout_error(Some(ctx.request_id.clone())));
                }
            };

            tracing::info!(
                request_id = %ctx.request_id,
                status = raw.status.as_u16(),
                latency_ms = budget.elapsed().as_millis(),
                attempt = attempt,
                "Received ShipEngine response"
            );

            let body = parse_body(&raw, &ctx.request_id)?;

            match classify(raw.status, &body, &config) {
                Classification::Success => {
                    return self.complete(&ctx, &budget, raw, body);
                }
                Classification::Terminal(e) => {
                    tracing::warn!(
                        request_id = %ctx.request_id,
                        error = %e,
                        error_code = %e.error_code(),
                        status = raw.status.as_u16(),
                        "Request failed"
                    );
                    return Err(e);
                }
                Classification::Retryable(e) => {
                    if !budget.can_retry() {
                        tracing::warn!(
                            request_id = %ctx.request_id,
                            error = %e,
                            attempts = attempt + 1,
                            "Retries exhausted"
                        );
                        return Err(e);
                    }

                    let wait = Duration::from_secs(e.retry_after().unwrap_or_default());
                    let wait = budget.schedule_retry(wait, e.request_id().map(str::to_owned))?;

                    tracing::info!(
                        request_id = %ctx.request_id,
                        retry_after_secs = wait.as_secs(),
                        attempt = attempt,
                        "Rate limited - waiting before retry"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Decodes a successful response and emits its event.
    fn complete<R>(
        &self,
        ctx: &RequestContext,
        budget: &RetryBudget,
        raw: TransportResponse,
        body: Value,
    ) -> Result<Response<R>>
    where
        R: DeserializeOwned,
    {
        let payload = match &body {
            Value::Object(map) if map.contains_key("result") => map["result"].clone(),
            _ => body.clone(),
        };

        let data = serde_json::from_value::<R>(payload).map_err(|e| {
            tracing::error!(
                request_id = %ctx.request_id,
                error = %e,
                raw_response = %raw.body,
                "Failed to deserialize response"
            );
            malformed_response(format!("Unexpected ShipEngine response: {}", e), &ctx.request_id)
        })?;

        let elapsed = budget.elapsed();
        let attempt = budget.attempt();

        self.emit(ResponseReceivedEvent::new(
            &ctx.request_id,
            response_message(raw.status.as_u16(), &ctx.rpc_method),
            ctx.url.as_str(),
            raw.status.as_u16(),
            snapshot_headers(&raw.headers),
            body,
            attempt,
            elapsed,
        ));

        Ok(Response::new(
            data,
            raw.body,
            raw.status,
            raw.headers,
            elapsed,
            attempt + 1,
            ctx.request_id.clone(),
        ))
    }

    fn emit(&self, event: impl Into<LifecycleEvent>) {
        let event = event.into();
        match self.inner.dispatcher.dispatch(&event) {
            Ok(failures) => {
                for failure in failures {
                    tracing::warn!(
                        request_id = %event.request_id(),
                        event = %failure.kind,
                        subscriber = %failure.subscriber_id,
                        error = %failure.error,
                        "Event listener failed"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    request_id = %event.request_id(),
                    error = %e,
                    "Event dispatch failed"
                );
            }
        }
    }
}

impl std::fmt::Debug for ShipEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShipEngine")
            .field("config", &self.inner.config)
            .field("dispatcher", &self.inner.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Parses a response body as JSON. An empty body is `null`.
fn parse_body(raw: &TransportResponse, request_id: &str) -> Result<Value> {
    if raw.body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&raw.body).map_err(|e| {
        tracing::error!(
            request_id = %request_id,
            status = raw.status.as_u16(),
            error = %e,
            raw_response = %raw.body,
            "Response body is not JSON"
        );
        malformed_response(
            format!("The ShipEngine API returned a body that is not JSON: {}", e),
            request_id,
        )
    })
}

fn malformed_response(message: String, request_id: &str) -> Error {
    Error::ClientSystem(
        ErrorDetails::new(
            message,
            ErrorSource::ShipEngine,
            ErrorType::System,
            ErrorCode::Unspecified,
        )
        .with_request_id(Some(request_id.to_string())),
    )
}

//! Request lifecycle events.
//!
//! The client emits a [`RequestSentEvent`] before every attempt of a call and a
//! [`ResponseReceivedEvent`] once the call succeeds. Events are immutable
//! snapshots; listeners receive them by shared reference through the
//! [`Dispatcher`](crate::dispatcher::Dispatcher).

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// The header carrying the ShipEngine API key. Redacted in event snapshots.
pub(crate) const API_KEY_HEADER: &str = "api-key";

/// The kinds of lifecycle events a call can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// An HTTP request is about to be sent.
    RequestSent,
    /// A successful HTTP response was received.
    ResponseReceived,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::RequestSent => f.write_str("request_sent"),
            EventKind::ResponseReceived => f.write_str("response_received"),
        }
    }
}

/// Which phrasing [`build_message`] should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// The first attempt of a call.
    Base,
    /// Any later attempt of the same call.
    Retry,
}

impl MessageKind {
    /// The phrasing for the given zero-based attempt number.
    pub fn for_attempt(attempt: u32) -> Self {
        if attempt == 0 {
            MessageKind::Base
        } else {
            MessageKind::Retry
        }
    }
}

impl FromStr for MessageKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "base" | "base_message" => Ok(MessageKind::Base),
            "retry" | "retry_message" => Ok(MessageKind::Retry),
            other => Err(Error::internal(format!(
                "Message type [{}] is not a valid type of message.",
                other
            ))),
        }
    }
}

/// Builds the human-readable message of a [`RequestSentEvent`].
///
/// # Examples
///
/// ```
/// use shipengine::events::{build_message, MessageKind};
///
/// assert_eq!(
///     build_message("address.validate.v1", "https://api.shipengine.com/jsonrpc", MessageKind::Retry),
///     "Retrying the ShipEngine address.validate.v1 API at https://api.shipengine.com/jsonrpc"
/// );
/// ```
pub fn build_message(method: &str, base_uri: &str, kind: MessageKind) -> String {
    match kind {
        MessageKind::Base => format!("Calling the ShipEngine {} API at {}", method, base_uri),
        MessageKind::Retry => format!("Retrying the ShipEngine {} API at {}", method, base_uri),
    }
}

/// Builds the human-readable message of a [`ResponseReceivedEvent`].
pub fn response_message(status_code: u16, method: &str) -> String {
    format!(
        "Received an HTTP {} response from the ShipEngine {} API",
        status_code, method
    )
}

/// Header names and values as they appear in an event, with the API key redacted.
pub type HeaderSnapshot = BTreeMap<String, String>;

/// Copies a header map into a [`HeaderSnapshot`].
pub fn snapshot_headers(headers: &HeaderMap) -> HeaderSnapshot {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name.as_str().eq_ignore_ascii_case(API_KEY_HEADER) {
                "[REDACTED]".to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.as_str().to_string(), value)
        })
        .collect()
}

/// Emitted before every attempt of a call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestSentEvent {
    /// When the event was generated.
    pub timestamp: DateTime<Utc>,
    /// Always [`EventKind::RequestSent`].
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// "Calling ..." on the first attempt, "Retrying ..." afterwards.
    pub message: String,
    /// The id of the logical call, stable across retries.
    pub request_id: String,
    /// The URL the request is sent to.
    pub url: String,
    /// The request headers.
    pub headers: HeaderSnapshot,
    /// The request body.
    pub body: Value,
    /// The zero-based attempt number.
    pub retry: u32,
    /// The configured timeout of the call.
    pub timeout: Duration,
}

impl RequestSentEvent {
    /// Creates a new event stamped with the current time.
    pub fn new(
        request_id: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
        headers: HeaderSnapshot,
        body: Value,
        retry: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: EventKind::RequestSent,
            message: message.into(),
            request_id: request_id.into(),
            url: url.into(),
            headers,
            body,
            retry,
            timeout,
        }
    }
}

/// Emitted once a call completes successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseReceivedEvent {
    /// When the event was generated.
    pub timestamp: DateTime<Utc>,
    /// Always [`EventKind::ResponseReceived`].
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// "Received an HTTP ... response ...".
    pub message: String,
    /// The id of the logical call.
    pub request_id: String,
    /// The URL the request was sent to.
    pub url: String,
    /// The HTTP status code of the final response.
    pub status_code: u16,
    /// The response headers.
    pub headers: HeaderSnapshot,
    /// The response body.
    pub body: Value,
    /// The zero-based attempt number that succeeded.
    pub retry: u32,
    /// Wall-clock time of the whole call, across all attempts.
    pub elapsed: Duration,
}

impl ResponseReceivedEvent {
    /// Creates a new event stamped with the current time.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        request_id: impl Into<String>,
        message: impl Into<String>,
        url: impl Into<String>,
        status_code: u16,
        headers: HeaderSnapshot,
        body: Value,
        retry: u32,
        elapsed: Duration,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            kind: EventKind::ResponseReceived,
            message: message.into(),
            request_id: request_id.into(),
            url: url.into(),
            status_code,
            headers,
            body,
            retry,
            elapsed,
        }
    }
}

/// Either kind of lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LifecycleEvent {
    /// See [`RequestSentEvent`].
    RequestSent(RequestSentEvent),
    /// See [`ResponseReceivedEvent`].
    ResponseReceived(ResponseReceivedEvent),
}

impl LifecycleEvent {
    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            LifecycleEvent::RequestSent(_) => EventKind::RequestSent,
            LifecycleEvent::ResponseReceived(_) => EventKind::ResponseReceived,
        }
    }

    /// The id of the logical call that produced this event.
    pub fn request_id(&self) -> &str {
        match self {
            LifecycleEvent::RequestSent(e) => &e.request_id,
            LifecycleEvent::ResponseReceived(e) => &e.request_id,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        match self {
            LifecycleEvent::RequestSent(e) => &e.message,
            LifecycleEvent::ResponseReceived(e) => &e.message,
        }
    }

    /// When the event was generated.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            LifecycleEvent::RequestSent(e) => e.timestamp,
            LifecycleEvent::ResponseReceived(e) => e.timestamp,
        }
    }

    /// Renders the event as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Internal`] if the body cannot be serialized.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| Error::internal(format!("Failed to serialize event: {}", e)))
    }
}

impl From<RequestSentEvent> for LifecycleEvent {
    fn from(event: RequestSentEvent) -> Self {
        LifecycleEvent::RequestSent(event)
    }
}

impl From<ResponseReceivedEvent> for LifecycleEvent {
    fn from(event: ResponseReceivedEvent) -> Self {
        LifecycleEvent::ResponseReceived(event)
    }
}

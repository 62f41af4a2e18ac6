//! Response wrapper that keeps the typed result together with details of the call.
//!
//! The [`Response`] type carries the deserialized result along with the
//! request id, status, headers, raw body and timing of the call that
//! produced it.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A successful ShipEngine call.
///
/// # Type Parameters
///
/// * `T` - The type of the deserialized result
///
/// # Examples
///
/// ```no_run
/// use shipengine::{Address, ShipEngine};
///
/// # async fn example() -> Result<(), shipengine::Error> {
/// let client = ShipEngine::new("TEST_abc123")?;
/// let address = Address::new(
///     vec!["4 Jersey St".to_string()],
///     "Boston",
///     "MA",
///     "02215",
///     "US",
/// );
///
/// let response = client.validate_address(&address).await?;
///
/// println!("Valid: {}", response.is_valid);
/// println!("Request {} took {:?}", response.request_id, response.latency);
/// if response.was_retried() {
///     println!("Needed {} attempts", response.attempts);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The deserialized result.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the final response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Wall-clock time of the whole call, including retries and backoff.
    pub latency: Duration,

    /// The number of attempts made. `1` when no retry was needed.
    pub attempts: u32,

    /// The id of the logical call, as sent in the JSON-RPC envelope.
    pub request_id: String,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: u32,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
            request_id: request_id.into(),
        }
    }

    /// Maps the result to a different type, keeping the call details.
    ///
    /// # Examples
    ///
    /// ```
    /// # use shipengine::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     42,
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    ///     "req_1",
    /// );
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// assert_eq!(string_response.request_id, "req_1");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
            request_id: self.request_id,
        }
    }

    /// Returns `true` if the call required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use shipengine::Response;
    /// # use http::{HeaderMap, StatusCode, HeaderValue};
    /// # use std::time::Duration;
    /// let mut headers = HeaderMap::new();
    /// headers.insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// let response = Response::new(
    ///     (),
    ///     String::new(),
    ///     StatusCode::OK,
    ///     headers,
    ///     Duration::from_millis(100),
    ///     1,
    ///     "req_1",
    /// );
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

//! Classification of raw responses into success, retryable or terminal outcomes.
//!
//! Rules, in precedence order:
//!
//! 1. `404` with an `error` object: terminal [`Error::ClientSystem`].
//! 2. `429` with an `error` object: [`Error::RateLimitExceeded`] (retryable)
//!    when `retryAfter` fits in the configured timeout, otherwise terminal
//!    [`Error::ClientTimeout`] carrying the configured timeout as its ceiling.
//! 3. `500`: terminal [`Error::ClientSystem`]; without an `error` object the
//!    response is malformed ([`Error::Protocol`]).
//! 4. Any other status with an `error` object: terminal [`Error::ClientSystem`].
//! 5. Anything else: success.

use crate::config::ShipEngineConfig;
use crate::error::{ErrorCode, ErrorDetails, ErrorSource, ErrorType};
use crate::retry::ceil_secs;
use crate::{Error, Result};
use http::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// The outcome of inspecting a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The response carries a usable result.
    Success,
    /// The same call may be attempted again.
    Retryable(Error),
    /// The call failed and must not be retried.
    Terminal(Error),
}

/// The error envelope the ShipEngine API sends on failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorEnvelope {
    /// The server-assigned request id.
    #[serde(default)]
    pub id: Option<Value>,
    /// The error, absent on success.
    #[serde(default)]
    pub error: Option<WireError>,
}

impl ErrorEnvelope {
    /// Reads the envelope out of a response body. Non-object bodies have no envelope.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the `error` member has the wrong shape.
    pub fn from_body(body: &Value) -> Result<Self> {
        if !body.is_object() {
            return Ok(Self::default());
        }
        Self::deserialize(body)
            .map_err(|e| Error::protocol(format!("Malformed error envelope: {}", e)))
    }

    /// The request id as a string, whether the server sent a string or a number.
    pub fn request_id(&self) -> Option<String> {
        match &self.id {
            Some(Value::String(id)) => Some(id.clone()),
            Some(Value::Number(id)) => Some(id.to_string()),
            _ => None,
        }
    }
}

/// The `error` member of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireError {
    /// Human-readable message.
    #[serde(default)]
    pub message: Option<String>,
    /// Structured error data.
    #[serde(default)]
    pub data: WireErrorData,
}

/// The `error.data` member of an [`ErrorEnvelope`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireErrorData {
    /// Where the error originated.
    #[serde(default)]
    pub source: Option<String>,
    /// The broad category of the error.
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    /// The specific error code.
    #[serde(default)]
    pub code: Option<String>,
    /// Seconds the server asks the client to wait before retrying. May be
    /// fractional.
    #[serde(default, rename = "retryAfter")]
    pub retry_after: Option<f64>,
}

/// Classifies a response.
///
/// This is a pure function: the same inputs always produce equal outputs.
///
/// # Examples
///
/// ```
/// use shipengine::classify::{classify, Classification};
/// use shipengine::ShipEngineConfig;
/// use http::StatusCode;
/// use serde_json::json;
///
/// # fn example() -> Result<(), shipengine::Error> {
/// let config = ShipEngineConfig::new("TEST_abc")?;
/// let body = json!({"id": "req_1", "error": {"data": {"retryAfter": 60}}});
///
/// match classify(StatusCode::TOO_MANY_REQUESTS, &body, &config) {
///     Classification::Terminal(e) => assert_eq!(e.retry_after(), Some(5)),
///     other => panic!("unexpected {:?}", other),
/// }
/// # Ok(())
/// # }
/// ```
pub fn classify(status: StatusCode, body: &Value, config: &ShipEngineConfig) -> Classification {
    let envelope = match ErrorEnvelope::from_body(body) {
        Ok(envelope) => envelope,
        Err(e) => return Classification::Terminal(e),
    };
    let request_id = envelope.request_id();

    match (status, envelope.error) {
        (StatusCode::NOT_FOUND, Some(error)) => terminal(system_error(error, request_id)),
        (StatusCode::TOO_MANY_REQUESTS, Some(error)) => {
            rate_limited(error.data.retry_after, request_id, config.timeout())
        }
        (StatusCode::INTERNAL_SERVER_ERROR, Some(error)) => {
            terminal(system_error(error, request_id))
        }
        (StatusCode::INTERNAL_SERVER_ERROR, None) => Classification::Terminal(Error::protocol(
            "The server returned HTTP 500 without an error object.",
        )),
        (_, Some(error)) => terminal(system_error(error, request_id)),
        (_, None) => Classification::Success,
    }
}

fn rate_limited(
    retry_after: Option<f64>,
    request_id: Option<String>,
    timeout: Duration,
) -> Classification {
    let Some(retry_after) = retry_after else {
        return Classification::Terminal(Error::protocol(
            "The server returned HTTP 429 without error.data.retryAfter.",
        ));
    };
    if !retry_after.is_finite() || retry_after < 0.0 {
        return Classification::Terminal(Error::protocol(format!(
            "The server returned HTTP 429 with an invalid retryAfter of {}.",
            retry_after
        )));
    }

    // Waits are whole seconds, rounded up so the server's minimum is honored.
    let retry_after = retry_after.ceil() as u64;
    if Duration::from_secs(retry_after) > timeout {
        Classification::Terminal(Error::client_timeout(ceil_secs(timeout), request_id))
    } else {
        Classification::Retryable(Error::rate_limit_exceeded(retry_after, request_id))
    }
}

fn terminal(error: Result<Error>) -> Classification {
    match error {
        Ok(e) | Err(e) => Classification::Terminal(e),
    }
}

/// Builds a [`Error::ClientSystem`] from the envelope. Unknown enum values
/// surface as [`Error::Internal`].
fn system_error(error: WireError, request_id: Option<String>) -> Result<Error> {
    let data = error.data;
    let source = match data.source {
        Some(s) => s.parse()?,
        None => ErrorSource::ShipEngine,
    };
    let error_type = match data.error_type {
        Some(t) => t.parse()?,
        None => ErrorType::Unspecified,
    };
    let error_code = match data.code {
        Some(c) => c.parse()?,
        None => ErrorCode::Unspecified,
    };

    let details = ErrorDetails::new(
        error.message.unwrap_or_default(),
        source,
        error_type,
        error_code,
    )
    .with_request_id(request_id);
    Ok(Error::ClientSystem(details))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(timeout_secs: u64) -> ShipEngineConfig {
        ShipEngineConfig::builder()
            .api_key("TEST_abc")
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap()
    }

    fn system_body() -> Value {
        json!({
            "id": "req_1",
            "error": {
                "message": "boom",
                "data": {"source": "carrier", "type": "system", "code": "unspecified"}
            }
        })
    }

    #[test]
    fn test_404_with_error_is_terminal_system_error() {
        let result = classify(StatusCode::NOT_FOUND, &system_body(), &config(10));
        match result {
            Classification::Terminal(Error::ClientSystem(details)) => {
                assert_eq!(details.request_id(), Some("req_1"));
                assert_eq!(details.message(), "boom");
                assert_eq!(details.source(), ErrorSource::Carrier);
                assert_eq!(details.error_type(), ErrorType::System);
                assert_eq!(details.error_code(), ErrorCode::Unspecified);
            }
            other => panic!("Expected terminal ClientSystem, got {:?}", other),
        }
    }

    #[test]
    fn test_404_without_error_is_success() {
        let result = classify(StatusCode::NOT_FOUND, &json!({"result": {}}), &config(10));
        assert_eq!(result, Classification::Success);
    }

    #[test]
    fn test_429_within_budget_is_retryable() {
        let body = json!({"id": "req_2", "error": {"data": {"retryAfter": 5}}});
        match classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)) {
            Classification::Retryable(err) => {
                assert!(matches!(err, Error::RateLimitExceeded { retry_after: 5, .. }));
                assert_eq!(err.request_id(), Some("req_2"));
                assert_eq!(err.error_code(), ErrorCode::RateLimitExceeded);
            }
            other => panic!("Expected Retryable, got {:?}", other),
        }
    }

    #[test]
    fn test_429_equal_to_timeout_is_still_retryable() {
        let body = json!({"error": {"data": {"retryAfter": 10}}});
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)),
            Classification::Retryable(_)
        ));
    }

    #[test]
    fn test_429_beyond_budget_uses_configured_ceiling() {
        let body = json!({"id": "req_3", "error": {"data": {"retryAfter": 300}}});
        match classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)) {
            Classification::Terminal(err) => {
                assert!(matches!(err, Error::ClientTimeout { retry_after: 10, .. }));
                assert_eq!(err.request_id(), Some("req_3"));
                assert_eq!(err.error_code(), ErrorCode::Timeout);
            }
            other => panic!("Expected Terminal, got {:?}", other),
        }
    }

    #[test]
    fn test_429_fractional_retry_after_rounds_up() {
        let body = json!({"id": "req_1", "error": {"data": {"retryAfter": 1.5}}});
        match classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)) {
            Classification::Retryable(err) => {
                assert!(matches!(err, Error::RateLimitExceeded { retry_after: 2, .. }));
                assert_eq!(err.request_id(), Some("req_1"));
            }
            other => panic!("Expected Retryable, got {:?}", other),
        }
    }

    #[test]
    fn test_429_negative_retry_after_is_protocol_error() {
        let body = json!({"error": {"data": {"retryAfter": -3}}});
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)),
            Classification::Terminal(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_429_ceiling_rounds_sub_second_timeout_up() {
        let config = ShipEngineConfig::builder()
            .api_key("TEST_abc")
            .timeout(Duration::from_millis(500))
            .build()
            .unwrap();
        let body = json!({"error": {"data": {"retryAfter": 1}}});
        match classify(StatusCode::TOO_MANY_REQUESTS, &body, &config) {
            Classification::Terminal(err) => assert_eq!(err.retry_after(), Some(1)),
            other => panic!("Expected Terminal, got {:?}", other),
        }
    }

    #[test]
    fn test_429_without_retry_after_is_protocol_error() {
        let body = json!({"error": {"message": "slow down"}});
        assert!(matches!(
            classify(StatusCode::TOO_MANY_REQUESTS, &body, &config(10)),
            Classification::Terminal(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_500_with_and_without_error() {
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, &system_body(), &config(10)),
            Classification::Terminal(Error::ClientSystem(_))
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, &json!({}), &config(10)),
            Classification::Terminal(Error::Protocol(_))
        ));
        assert!(matches!(
            classify(StatusCode::INTERNAL_SERVER_ERROR, &Value::Null, &config(10)),
            Classification::Terminal(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_other_status_with_error_is_terminal() {
        let body = json!({
            "id": 42,
            "error": {"message": "bad key", "data": {"source": "shipengine", "type": "security", "code": "unauthorized"}}
        });
        match classify(StatusCode::UNAUTHORIZED, &body, &config(10)) {
            Classification::Terminal(err) => {
                assert_eq!(err.error_type(), ErrorType::Security);
                assert_eq!(err.error_code(), ErrorCode::Unauthorized);
                assert_eq!(err.request_id(), Some("42"));
            }
            other => panic!("Expected Terminal, got {:?}", other),
        }
    }

    #[test]
    fn test_success_shapes() {
        let c = config(10);
        assert_eq!(
            classify(StatusCode::OK, &json!({"isValid": true}), &c),
            Classification::Success
        );
        assert_eq!(classify(StatusCode::OK, &json!([1, 2]), &c), Classification::Success);
        assert_eq!(classify(StatusCode::ACCEPTED, &Value::Null, &c), Classification::Success);
    }

    #[test]
    fn test_unknown_code_is_internal_error() {
        let body = json!({"error": {"message": "?", "data": {"code": "flux_capacitor"}}});
        assert!(matches!(
            classify(StatusCode::NOT_FOUND, &body, &config(10)),
            Classification::Terminal(Error::Internal(_))
        ));
    }

    #[test]
    fn test_malformed_error_member_is_protocol_error() {
        let body = json!({"error": "nope"});
        assert!(matches!(
            classify(StatusCode::BAD_REQUEST, &body, &config(10)),
            Classification::Terminal(Error::Protocol(_))
        ));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let c = config(10);
        let bodies = [
            system_body(),
            json!({"id": "req_9", "error": {"data": {"retryAfter": 3}}}),
            json!({"id": "req_9", "error": {"data": {"retryAfter": 30}}}),
            json!({"isValid": true}),
        ];
        for status in [
            StatusCode::OK,
            StatusCode::NOT_FOUND,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            for body in &bodies {
                assert_eq!(classify(status, body, &c), classify(status, body, &c));
            }
        }
    }
}

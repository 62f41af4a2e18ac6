//! Error types for ShipEngine API calls.
//!
//! Every error carries the same structured shape, [`ErrorDetails`], so callers
//! can branch on where a failure came from ([`ErrorSource`]), what kind of
//! failure it is ([`ErrorType`]) and the specific reason ([`ErrorCode`])
//! without parsing messages. Messages are human-readable supplements only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where an error originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorSource {
    /// The error was reported by the underlying shipping carrier.
    #[serde(rename = "carrier", alias = "carrier-api")]
    Carrier,

    /// The error was reported by ShipEngine or raised locally by this SDK.
    #[serde(rename = "shipengine", alias = "sdk")]
    ShipEngine,
}

impl ErrorSource {
    /// Returns the wire representation of this source.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorSource::Carrier => "carrier",
            ErrorSource::ShipEngine => "shipengine",
        }
    }
}

impl FromStr for ErrorSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "carrier" | "carrier-api" => Ok(ErrorSource::Carrier),
            "shipengine" | "sdk" => Ok(ErrorSource::ShipEngine),
            other => Err(Error::internal(format!(
                "Error source [{}] is not a valid error source.",
                other
            ))),
        }
    }
}

impl fmt::Display for ErrorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The broad category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The request was malformed or a field value was rejected.
    Validation,
    /// A system-level failure occurred (server error, timeout, rate limit).
    System,
    /// Authentication or authorization failed.
    Security,
    /// The request violated a business rule of the carrier or ShipEngine.
    BusinessRules,
    /// The account is not in a state that allows the request.
    AccountStatus,
    /// No more specific category applies.
    Unspecified,
}

impl ErrorType {
    /// Returns the wire representation of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::Validation => "validation",
            ErrorType::System => "system",
            ErrorType::Security => "security",
            ErrorType::BusinessRules => "business_rules",
            ErrorType::AccountStatus => "account_status",
            ErrorType::Unspecified => "unspecified",
        }
    }
}

impl FromStr for ErrorType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "validation" => Ok(ErrorType::Validation),
            "system" => Ok(ErrorType::System),
            "security" => Ok(ErrorType::Security),
            "business_rules" => Ok(ErrorType::BusinessRules),
            "account_status" => Ok(ErrorType::AccountStatus),
            "unspecified" => Ok(ErrorType::Unspecified),
            other => Err(Error::internal(format!(
                "Error type [{}] is not a valid error type.",
                other
            ))),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The specific reason for an error (or for an address validation message).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// A required field was missing or empty.
    FieldValueRequired,
    /// A field value was out of range or badly shaped.
    InvalidFieldValue,
    /// The address could not be found.
    AddressNotFound,
    /// The address is not deliverable as given.
    InvalidAddress,
    /// The address was verified down to the house/building level.
    PartiallyVerifiedToPremiseLevel,
    /// Too many requests were sent in a short period.
    RateLimitExceeded,
    /// The request could not complete within the allowed time.
    Timeout,
    /// The API key was rejected.
    Unauthorized,
    /// An identifier (tracking number, carrier code, ...) was not recognized.
    InvalidIdentifier,
    /// No more specific code applies.
    Unspecified,
}

impl ErrorCode {
    /// Returns the wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::FieldValueRequired => "field_value_required",
            ErrorCode::InvalidFieldValue => "invalid_field_value",
            ErrorCode::AddressNotFound => "address_not_found",
            ErrorCode::InvalidAddress => "invalid_address",
            ErrorCode::PartiallyVerifiedToPremiseLevel => "partially_verified_to_premise_level",
            ErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            ErrorCode::Timeout => "timeout",
            ErrorCode::Unauthorized => "unauthorized",
            ErrorCode::InvalidIdentifier => "invalid_identifier",
            ErrorCode::Unspecified => "unspecified",
        }
    }
}

impl FromStr for ErrorCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "field_value_required" => Ok(ErrorCode::FieldValueRequired),
            "invalid_field_value" => Ok(ErrorCode::InvalidFieldValue),
            "address_not_found" => Ok(ErrorCode::AddressNotFound),
            "invalid_address" => Ok(ErrorCode::InvalidAddress),
            "partially_verified_to_premise_level" => Ok(ErrorCode::PartiallyVerifiedToPremiseLevel),
            "rate_limit_exceeded" => Ok(ErrorCode::RateLimitExceeded),
            "timeout" => Ok(ErrorCode::Timeout),
            "unauthorized" => Ok(ErrorCode::Unauthorized),
            "invalid_identifier" => Ok(ErrorCode::InvalidIdentifier),
            "unspecified" => Ok(ErrorCode::Unspecified),
            other => Err(Error::internal(format!(
                "Error code [{}] is not a valid error code.",
                other
            ))),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The structured fields shared by every [`Error`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    message: String,
    request_id: Option<String>,
    source: ErrorSource,
    error_type: ErrorType,
    error_code: ErrorCode,
}

impl ErrorDetails {
    /// Creates details with no request id.
    pub fn new(
        message: impl Into<String>,
        source: ErrorSource,
        error_type: ErrorType,
        error_code: ErrorCode,
    ) -> Self {
        Self {
            message: message.into(),
            request_id: None,
            source,
            error_type,
            error_code,
        }
    }

    /// Attaches the server-assigned request id.
    pub fn with_request_id(mut self, request_id: Option<String>) -> Self {
        self.request_id = request_id;
        self
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The request id assigned by the server, if the error came from a response.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Where the error originated.
    pub fn source(&self) -> ErrorSource {
        self.source
    }

    /// The broad category of the error.
    pub fn error_type(&self) -> ErrorType {
        self.error_type
    }

    /// The specific error code.
    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// The main error type for ShipEngine API calls.
///
/// Local validation failures ([`Error::Validation`], [`Error::InvalidFieldValue`])
/// never carry a request id and are raised before any network call. Errors
/// built from server responses carry the server's request id when it sent one.
///
/// # Examples
///
/// ```no_run
/// use shipengine::{Address, Error, ErrorCode, ShipEngine};
///
/// # async fn example(client: ShipEngine, address: Address) {
/// match client.validate_address(&address).await {
///     Ok(result) => println!("valid: {}", result.is_valid),
///     Err(Error::ClientTimeout { retry_after, .. }) => {
///         eprintln!("gave up, backoff would exceed {}s", retry_after);
///     }
///     Err(e) if e.error_code() == ErrorCode::FieldValueRequired => {
///         eprintln!("fix the address: {}", e.message());
///     }
///     Err(e) => eprintln!("request {:?} failed: {}", e.request_id(), e),
/// }
/// # }
/// ```
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Caller input was malformed. Detected before any network call.
    #[error("{0}")]
    Validation(ErrorDetails),

    /// A specific field failed a range or shape check.
    #[error("{details}")]
    InvalidFieldValue {
        /// Common error fields.
        details: ErrorDetails,
        /// The name of the offending field.
        field_name: String,
        /// The offending value, rendered as a string.
        field_value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// ShipEngine or the carrier reported a system-level failure, or the
    /// transport could not produce a usable response.
    #[error("{0}")]
    ClientSystem(ErrorDetails),

    /// The server asked us to back off for longer than the configured timeout.
    #[error("{details}")]
    ClientTimeout {
        /// Common error fields.
        details: ErrorDetails,
        /// The ceiling actually applied, in seconds (the configured timeout).
        retry_after: u64,
    },

    /// The rate limit was hit and the retries were exhausted.
    #[error("{details}")]
    RateLimitExceeded {
        /// Common error fields.
        details: ErrorDetails,
        /// Seconds the server asked us to wait.
        retry_after: u64,
    },

    /// The SDK was configured inconsistently.
    #[error("Configuration error: {0}")]
    Configuration(ErrorDetails),

    /// The server sent a response that does not follow the wire contract.
    #[error("Protocol error: {0}")]
    Protocol(ErrorDetails),

    /// A programming error inside the SDK, such as an unknown enum value.
    #[error("Internal error: {0}")]
    Internal(ErrorDetails),
}

impl Error {
    /// Builds a [`Error::Validation`] raised locally by the SDK.
    pub fn validation(message: impl Into<String>, error_code: ErrorCode) -> Self {
        Error::Validation(ErrorDetails::new(
            message,
            ErrorSource::ShipEngine,
            ErrorType::Validation,
            error_code,
        ))
    }

    /// Builds a [`Error::InvalidFieldValue`] for the given field.
    pub fn invalid_field_value(
        field_name: impl Into<String>,
        reason: impl Into<String>,
        field_value: impl ToString,
    ) -> Self {
        let field_name = field_name.into();
        let reason = reason.into();
        let details = ErrorDetails::new(
            format!("{} - {}", field_name, reason),
            ErrorSource::ShipEngine,
            ErrorType::Validation,
            ErrorCode::InvalidFieldValue,
        );
        Error::InvalidFieldValue {
            details,
            field_name,
            field_value: field_value.to_string(),
            reason,
        }
    }

    /// Builds a [`Error::ClientTimeout`] carrying the ceiling that was applied.
    pub fn client_timeout(retry_after: u64, request_id: Option<String>) -> Self {
        let details = ErrorDetails::new(
            format!(
                "The request took longer than the {} seconds allowed.",
                retry_after
            ),
            ErrorSource::ShipEngine,
            ErrorType::System,
            ErrorCode::Timeout,
        )
        .with_request_id(request_id);
        Error::ClientTimeout {
            details,
            retry_after,
        }
    }

    /// Builds a [`Error::RateLimitExceeded`] carrying the server's backoff.
    pub fn rate_limit_exceeded(retry_after: u64, request_id: Option<String>) -> Self {
        let details = ErrorDetails::new(
            "You have exceeded the rate limit.",
            ErrorSource::ShipEngine,
            ErrorType::System,
            ErrorCode::RateLimitExceeded,
        )
        .with_request_id(request_id);
        Error::RateLimitExceeded {
            details,
            retry_after,
        }
    }

    /// Builds a [`Error::ClientSystem`] for a failure detected on our side of the wire.
    pub fn transport(message: impl Into<String>) -> Self {
        Error::ClientSystem(ErrorDetails::new(
            message,
            ErrorSource::ShipEngine,
            ErrorType::System,
            ErrorCode::Unspecified,
        ))
    }

    /// Builds a [`Error::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration(Self::sdk_details(message))
    }

    /// Builds a [`Error::Protocol`].
    pub fn protocol(message: impl Into<String>) -> Self {
        Error::Protocol(Self::sdk_details(message))
    }

    /// Builds a [`Error::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal(Self::sdk_details(message))
    }

    fn sdk_details(message: impl Into<String>) -> ErrorDetails {
        ErrorDetails::new(
            message,
            ErrorSource::ShipEngine,
            ErrorType::System,
            ErrorCode::Unspecified,
        )
    }

    /// Returns the structured fields common to every variant.
    pub fn details(&self) -> &ErrorDetails {
        match self {
            Error::Validation(details)
            | Error::ClientSystem(details)
            | Error::Configuration(details)
            | Error::Protocol(details)
            | Error::Internal(details) => details,
            Error::InvalidFieldValue { details, .. }
            | Error::ClientTimeout { details, .. }
            | Error::RateLimitExceeded { details, .. } => details,
        }
    }

    /// The human-readable message.
    pub fn message(&self) -> &str {
        self.details().message()
    }

    /// The id of the request the error belongs to, `None` for local validation errors.
    pub fn request_id(&self) -> Option<&str> {
        self.details().request_id()
    }

    /// Where the error originated.
    pub fn error_source(&self) -> ErrorSource {
        self.details().source()
    }

    /// The broad category of the error.
    pub fn error_type(&self) -> ErrorType {
        self.details().error_type()
    }

    /// The specific error code.
    pub fn error_code(&self) -> ErrorCode {
        self.details().error_code()
    }

    /// The backoff in seconds for timeout and rate-limit errors.
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            Error::ClientTimeout { retry_after, .. }
            | Error::RateLimitExceeded { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// Returns `true` if the SDK may attempt the same call again.
    ///
    /// Only rate-limit errors are retryable; everything else is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::RateLimitExceeded { .. })
    }
}

/// A specialized `Result` type for ShipEngine API calls.
pub type Result<T> = std::result::Result<T, Error>;

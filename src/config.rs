//! Client configuration.
//!
//! [`ShipEngineConfig`] is built once, validated, and then only read. Calls can
//! override parts of it with [`ConfigOverrides`], which produces a new,
//! validated configuration for that call alone.

use crate::dispatcher::EventListener;
use crate::validation::{validate_api_key, validate_page_size, validate_retries, validate_timeout};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// The default ShipEngine JSON-RPC endpoint.
pub const DEFAULT_BASE_URI: &str = "https://api.shipengine.com/jsonrpc";

/// The default number of retries for rate-limited requests.
pub const DEFAULT_RETRIES: u32 = 1;

/// The default time budget for a call, across all attempts.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// The default page size for paged results.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Validated configuration shared by every call a client makes.
///
/// # Examples
///
/// ```
/// use shipengine::ShipEngineConfig;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), shipengine::Error> {
/// let config = ShipEngineConfig::builder()
///     .api_key("TEST_abc123")
///     .retries(3)
///     .timeout(Duration::from_secs(15))
///     .build()?;
///
/// assert_eq!(config.retries(), 3);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ShipEngineConfig {
    api_key: String,
    base_uri: Url,
    page_size: u32,
    retries: u32,
    timeout: Duration,
    event_listener: Option<Arc<dyn EventListener>>,
}

impl ShipEngineConfig {
    /// Creates a configuration with defaults and the given API key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if the API key is empty or contains whitespace.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::builder().api_key(api_key).build()
    }

    /// Creates a new builder.
    pub fn builder() -> ShipEngineConfigBuilder {
        ShipEngineConfigBuilder::default()
    }

    /// Builds a configuration from dictionary-shaped settings.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if no valid API key is given, or
    /// [`Error::InvalidFieldValue`] for out-of-range numbers.
    pub fn from_overrides(settings: &ConfigOverrides) -> Result<Self> {
        let api_key = settings.api_key.clone().unwrap_or_default();
        Self::new(api_key)?.merge(settings)
    }

    /// Returns a copy of this configuration with `overrides` applied.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`ShipEngineConfig::from_overrides`].
    pub fn merge(&self, overrides: &ConfigOverrides) -> Result<Self> {
        let mut merged = self.clone();
        if let Some(api_key) = &overrides.api_key {
            validate_api_key(api_key)?;
            merged.api_key = api_key.clone();
        }
        if let Some(base_uri) = &overrides.base_uri {
            merged.base_uri = parse_base_uri(base_uri)?;
        }
        if let Some(page_size) = overrides.page_size {
            merged.page_size = validate_page_size(page_size)?;
        }
        if let Some(retries) = overrides.retries {
            merged.retries = validate_retries(retries)?;
        }
        if let Some(timeout) = overrides.timeout {
            merged.timeout = validate_timeout(timeout)?;
        }
        Ok(merged)
    }

    /// The API key sent with every request.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The endpoint requests are sent to.
    pub fn base_uri(&self) -> &Url {
        &self.base_uri
    }

    /// The page size for paged results.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// How many times a rate-limited request is retried.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// The time budget of a call, across all attempts. Also caps how long the
    /// client will honor a server-requested backoff.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The listener notified of request lifecycle events.
    pub fn event_listener(&self) -> Option<&Arc<dyn EventListener>> {
        self.event_listener.as_ref()
    }
}

impl fmt::Debug for ShipEngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShipEngineConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_uri", &self.base_uri.as_str())
            .field("page_size", &self.page_size)
            .field("retries", &self.retries)
            .field("timeout", &self.timeout)
            .field("event_listener", &self.event_listener.is_some())
            .finish()
    }
}

/// Builder for [`ShipEngineConfig`].
#[derive(Default)]
pub struct ShipEngineConfigBuilder {
    api_key: Option<String>,
    base_uri: Option<String>,
    page_size: Option<u32>,
    retries: Option<u32>,
    timeout: Option<Duration>,
    event_listener: Option<Arc<dyn EventListener>>,
}

impl ShipEngineConfigBuilder {
    /// Sets the API key. Sandbox keys start with `TEST_`.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the endpoint requests are sent to.
    pub fn base_uri(mut self, base_uri: impl Into<String>) -> Self {
        self.base_uri = Some(base_uri.into());
        self
    }

    /// Sets the page size for paged results.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets how many times a rate-limited request is retried.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Sets the time budget of a call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the listener notified of request lifecycle events.
    pub fn event_listener(mut self, listener: Arc<dyn EventListener>) -> Self {
        self.event_listener = Some(listener);
        self
    }

    /// Validates the settings and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for a missing or malformed API key,
    /// [`Error::InvalidFieldValue`] for a zero page size, and
    /// [`Error::Configuration`] for an unparseable base URI.
    pub fn build(self) -> Result<ShipEngineConfig> {
        let api_key = self.api_key.unwrap_or_default();
        validate_api_key(&api_key)?;

        let base_uri = parse_base_uri(self.base_uri.as_deref().unwrap_or(DEFAULT_BASE_URI))?;
        let page_size = validate_page_size(i64::from(self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)))?;

        Ok(ShipEngineConfig {
            api_key,
            base_uri,
            page_size,
            retries: self.retries.unwrap_or(DEFAULT_RETRIES),
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            event_listener: self.event_listener,
        })
    }
}

/// Dictionary-shaped configuration, as loaded from a file or passed per call.
///
/// Numbers are signed so that negative input is reported as
/// [`Error::InvalidFieldValue`] rather than failing to parse. Both
/// `camelCase` and `snake_case` keys are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigOverrides {
    /// Replaces the API key.
    #[serde(alias = "api_key")]
    pub api_key: Option<String>,
    /// Replaces the endpoint.
    #[serde(alias = "base_uri")]
    pub base_uri: Option<String>,
    /// Replaces the page size.
    #[serde(alias = "page_size")]
    pub page_size: Option<i64>,
    /// Replaces the retry count.
    pub retries: Option<i64>,
    /// Replaces the timeout, in seconds.
    pub timeout: Option<i64>,
}

impl ConfigOverrides {
    /// Overrides the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the retry count.
    pub fn with_retries(mut self, retries: i64) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Overrides the timeout, in seconds.
    pub fn with_timeout(mut self, timeout_secs: i64) -> Self {
        self.timeout = Some(timeout_secs);
        self
    }
}

fn parse_base_uri(base_uri: &str) -> Result<Url> {
    Url::parse(base_uri)
        .map_err(|e| Error::configuration(format!("Invalid base URI [{}]: {}", base_uri, e)))
}

//! # ShipEngine - a client for the ShipEngine shipping API
//!
//! This crate validates addresses, tracks packages and makes arbitrary
//! JSON-RPC calls against the ShipEngine API. Responses are classified into a
//! structured error taxonomy, rate-limited calls are retried within the
//! caller's timeout, and an optional listener is told when each request is
//! sent and when a response is received.
//!
//! ## Quick Start
//!
//! ```no_run
//! use shipengine::{Address, ShipEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), shipengine::Error> {
//!     let client = ShipEngine::new("TEST_abc123")?;
//!
//!     let address = Address::new(
//!         vec!["4 Jersey St".to_string()],
//!         "Boston",
//!         "MA",
//!         "02215",
//!         "US",
//!     );
//!
//!     let result = client.validate_address(&address).await?;
//!     println!("Valid: {}", result.is_valid);
//!     println!("Request took {:?}", result.latency);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Typed results** - address validation and package tracking results, or any `Deserialize` type through [`ShipEngine::call`]
//! - **Structured errors** - every error carries a source, type, code and, for server errors, the request id
//! - **Rate-limit aware retries** - the server's `retryAfter` is honored only while it fits in the timeout
//! - **Lifecycle events** - a listener is notified before each attempt and after a successful response
//! - **Local validation** - malformed input is rejected before any network call
//! - **Logging** - structured logging with `tracing`
//!
//! ## Error Handling
//!
//! Errors are matched by variant and code, never by message:
//!
//! ```no_run
//! use shipengine::{Address, Error, ErrorCode, ShipEngine};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = ShipEngine::new("TEST_abc123")?;
//! # let address = Address::default();
//! match client.validate_address(&address).await {
//!     Ok(response) => println!("Valid: {}", response.is_valid),
//!     Err(Error::RateLimitExceeded { retry_after, .. }) => {
//!         eprintln!("Still rate limited, try again in {}s", retry_after);
//!     }
//!     Err(Error::ClientTimeout { retry_after, .. }) => {
//!         eprintln!("Gave up after {}s", retry_after);
//!     }
//!     Err(e) if e.error_code() == ErrorCode::FieldValueRequired => {
//!         eprintln!("Missing field: {}", e);
//!     }
//!     Err(e) => eprintln!("Request {:?} failed: {}", e.request_id(), e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Listening to Events
//!
//! ```no_run
//! use shipengine::dispatcher::LoggingListener;
//! use shipengine::{ShipEngine, ShipEngineConfig};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), shipengine::Error> {
//! let config = ShipEngineConfig::builder()
//!     .api_key("TEST_abc123")
//!     .event_listener(Arc::new(LoggingListener))
//!     .build()?;
//! let client = ShipEngine::from_config(config)?;
//! # Ok(())
//! # }
//! ```

pub mod classify;
mod client;
mod config;
pub mod context;
pub mod dispatcher;
mod error;
pub mod events;
mod models;
mod response;
pub mod retry;
pub mod transport;
pub mod validation;

pub use client::ShipEngine;
pub use config::{
    ConfigOverrides, ShipEngineConfig, ShipEngineConfigBuilder, DEFAULT_BASE_URI,
    DEFAULT_PAGE_SIZE, DEFAULT_RETRIES, DEFAULT_TIMEOUT,
};
pub use dispatcher::EventListener;
pub use error::{Error, ErrorCode, ErrorDetails, ErrorSource, ErrorType, Result};
pub use models::{
    Address, AddressValidateResult, Carrier, CarrierAccount, Location, Package, Shipment,
    TrackPackageResult, TrackingEvent, TrackingQuery, TrackingStatus, ValidationMessage,
};
pub use response::Response;

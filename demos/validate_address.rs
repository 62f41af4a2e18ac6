//! Validates an address and tracks a package against the ShipEngine API.
//!
//! This example shows how to:
//! - Configure a client with retries, a timeout and a logging listener
//! - Validate an address and read the normalized result
//! - Branch on structured errors instead of messages
//! - Override configuration for a single call
//!
//! Run with: `SHIPENGINE_API_KEY=TEST_... cargo run --example validate_address`

use shipengine::dispatcher::LoggingListener;
use shipengine::{
    Address, ConfigOverrides, Error, ErrorCode, ShipEngine, ShipEngineConfig, TrackingQuery,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter("shipengine=debug,validate_address=info")
        .init();

    let api_key = std::env::var("SHIPENGINE_API_KEY")?;
    let config = ShipEngineConfig::builder()
        .api_key(api_key)
        .retries(2)
        .timeout(Duration::from_secs(15))
        .event_listener(Arc::new(LoggingListener))
        .build()?;
    let client = ShipEngine::from_config(config)?;

    println!("=== Address Validation ===");
    let address = Address::new(
        vec!["4 Jersey St".to_string(), "Suite 200".to_string()],
        "Boston",
        "MA",
        "02215",
        "US",
    )
    .with_company_name("ShipEngine Demo");

    let response = client.validate_address(&address).await?;
    println!("Valid: {}", response.is_valid);
    if let Some(normalized) = &response.normalized_address {
        println!("Normalized street: {:?}", normalized.street);
        println!(
            "City/State/Postal: {} {} {}",
            normalized.city_locality, normalized.state_province, normalized.postal_code
        );
    }
    for warning in &response.warnings {
        println!("Warning [{}]: {}", warning.code, warning.message);
    }
    println!("Request id: {}", response.request_id);
    println!("Latency: {:?} over {} attempt(s)", response.latency, response.attempts);
    println!();

    println!("=== Local Validation ===");
    let incomplete = Address::new(Vec::new(), "Boston", "MA", "02215", "US");
    match client.validate_address(&incomplete).await {
        Ok(_) => println!("Unexpectedly accepted"),
        Err(e) if e.error_code() == ErrorCode::FieldValueRequired => {
            println!("Rejected before sending: {}", e);
        }
        Err(e) => println!("Other error: {}", e),
    }
    println!();

    println!("=== Tracking With Overrides ===");
    let overrides = ConfigOverrides::default().with_retries(0).with_timeout(5);
    let query = TrackingQuery::new("stamps_com", "9400111298370264401222");
    match client.track_package_with(&query, Some(&overrides)).await {
        Ok(tracking) => {
            println!("Events: {}", tracking.events.len());
            if let Some(latest) = tracking.latest_event() {
                println!("Latest: {:?} at {}", latest.status, latest.date_time);
            }
        }
        Err(Error::RateLimitExceeded { retry_after, .. }) => {
            println!("Rate limited, retry in {}s", retry_after);
        }
        Err(e) => {
            println!("Tracking failed: {}", e);
            println!("  Source: {}", e.error_source());
            println!("  Type: {}", e.error_type());
            println!("  Code: {}", e.error_code());
            println!("  Request id: {:?}", e.request_id());
        }
    }

    Ok(())
}

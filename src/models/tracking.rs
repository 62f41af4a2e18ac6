//! Package tracking request and result types.

use super::carrier::{Carrier, CarrierAccount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies a package to track by carrier and tracking number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingQuery {
    /// The carrier code, such as `"fedex"` or `"ups"`.
    pub carrier_code: String,
    /// The carrier-issued tracking number.
    pub tracking_number: String,
}

impl TrackingQuery {
    /// Creates a tracking query.
    pub fn new(carrier_code: impl Into<String>, tracking_number: impl Into<String>) -> Self {
        Self {
            carrier_code: carrier_code.into(),
            tracking_number: tracking_number.into(),
        }
    }
}

/// The status of a tracking event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    /// The carrier has accepted the package.
    Accepted,
    /// The package is moving through the carrier network.
    InTransit,
    /// A delivery attempt failed.
    AttemptedDelivery,
    /// The package was delivered.
    Delivered,
    /// Something went wrong in transit.
    Exception,
    /// The carrier does not know about the package yet.
    NotYetInSystem,
    /// Any status this SDK does not recognize.
    #[serde(other)]
    Unknown,
}

/// Where a tracking event happened.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
    /// City or locality.
    pub city_locality: Option<String>,
    /// State or province.
    pub state_province: Option<String>,
    /// Postal or ZIP code.
    pub postal_code: Option<String>,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: Option<String>,
    /// Latitude, when the carrier reports coordinates.
    pub latitude: Option<f64>,
    /// Longitude, when the carrier reports coordinates.
    pub longitude: Option<f64>,
}

/// A single scan or status change reported by the carrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingEvent {
    /// When the event happened.
    pub date_time: DateTime<Utc>,
    /// When the carrier recorded the event, if different.
    #[serde(default)]
    pub carrier_date_time: Option<DateTime<Utc>>,
    /// The normalized status.
    pub status: TrackingStatus,
    /// Free-form description from the carrier.
    #[serde(default)]
    pub description: Option<String>,
    /// The carrier's own status code.
    #[serde(default)]
    pub carrier_status_code: Option<String>,
    /// Who signed for the package.
    #[serde(default)]
    pub signer: Option<String>,
    /// Where the event happened.
    #[serde(default)]
    pub location: Option<Location>,
}

/// Shipment-level tracking information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Shipment {
    /// The ShipEngine shipment id.
    pub shipment_id: Option<String>,
    /// The carrier account the shipment was sent with.
    pub carrier_account: Option<CarrierAccount>,
    /// The carrier moving the shipment.
    #[serde(rename = "carrierCode")]
    pub carrier: Option<Carrier>,
    /// When the carrier expects to deliver.
    pub estimated_delivery_date_time: Option<DateTime<Utc>>,
    /// When the package was actually delivered.
    pub actual_delivery_date_time: Option<DateTime<Utc>>,
}

impl Shipment {
    /// The carrier, taken from the carrier account when not reported directly.
    pub fn carrier(&self) -> Option<&Carrier> {
        self.carrier
            .as_ref()
            .or_else(|| self.carrier_account.as_ref().map(|a| &a.carrier))
    }
}

/// Package-level tracking information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Package {
    /// The ShipEngine package id.
    pub package_id: Option<String>,
    /// The carrier tracking number.
    pub tracking_number: Option<String>,
    /// A carrier URL for humans to follow the package.
    pub tracking_url: Option<String>,
}

/// The outcome of tracking a package.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackPackageResult {
    /// The id of the request that produced this result.
    #[serde(skip_deserializing)]
    pub request_id: Option<String>,
    /// Shipment details.
    pub shipment: Option<Shipment>,
    /// Package details.
    pub package: Option<Package>,
    /// Tracking events, in the order the carrier reported them.
    pub events: Vec<TrackingEvent>,
}

impl TrackPackageResult {
    /// The most recent event by `date_time`.
    pub fn latest_event(&self) -> Option<&TrackingEvent> {
        self.events.iter().max_by_key(|e| e.date_time)
    }

    /// Returns `true` if any event reports delivery.
    pub fn is_delivered(&self) -> bool {
        self.events
            .iter()
            .any(|e| e.status == TrackingStatus::Delivered)
    }

    /// Events with an exception status.
    pub fn exceptions(&self) -> impl Iterator<Item = &TrackingEvent> {
        self.events
            .iter()
            .filter(|e| e.status == TrackingStatus::Exception)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> TrackPackageResult {
        serde_json::from_value(json!({
            "shipment": {
                "shipmentId": "se-1",
                "carrierAccount": {"carrierCode": "fedex", "accountID": "car_1"},
                "estimatedDeliveryDateTime": "2021-06-10T17:00:00.000Z"
            },
            "package": {"trackingNumber": "1Z999", "trackingUrl": "https://example.com/1Z999"},
            "events": [
                {"dateTime": "2021-06-08T10:00:00Z", "status": "accepted"},
                {"dateTime": "2021-06-09T08:30:00+02:00", "status": "exception", "description": "Weather delay"},
                {"dateTime": "2021-06-10T16:45:00Z", "status": "delivered", "signer": "J. DOE",
                 "location": {"cityLocality": "Austin", "countryCode": "US", "latitude": 30.27, "longitude": -97.74}},
                {"dateTime": "2021-06-07T09:00:00Z", "status": "label_created"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_tracking_result_parses_events() {
        let result = sample();
        assert_eq!(result.events.len(), 4);
        assert_eq!(result.events[3].status, TrackingStatus::Unknown);
        assert_eq!(
            result.package.as_ref().unwrap().tracking_number.as_deref(),
            Some("1Z999")
        );
        let shipment = result.shipment.unwrap();
        assert!(shipment.estimated_delivery_date_time.is_some());
        assert_eq!(shipment.carrier().map(Carrier::code), Some("fedex"));
        assert_eq!(shipment.carrier_account.unwrap().account_id, "car_1");
    }

    #[test]
    fn test_latest_event_and_delivery() {
        let result = sample();
        let latest = result.latest_event().unwrap();
        assert_eq!(latest.status, TrackingStatus::Delivered);
        assert_eq!(latest.signer.as_deref(), Some("J. DOE"));
        assert!(result.is_delivered());
        assert_eq!(result.exceptions().count(), 1);
    }

    #[test]
    fn test_shipment_carrier_code_takes_precedence() {
        let shipment: Shipment = serde_json::from_value(json!({
            "carrierCode": "ups",
            "carrierAccount": {"carrierCode": "fedex", "accountID": "car_1"}
        }))
        .unwrap();
        assert_eq!(shipment.carrier().map(Carrier::code), Some("ups"));
        assert_eq!(Shipment::default().carrier(), None);
    }

    #[test]
    fn test_tracking_query_wire_shape() {
        let value = serde_json::to_value(TrackingQuery::new("fedex", "1Z999")).unwrap();
        assert_eq!(value, json!({"carrierCode": "fedex", "trackingNumber": "1Z999"}));
    }
}

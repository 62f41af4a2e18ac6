//! Domain types sent to and returned by the ShipEngine API.

mod address;
mod carrier;
mod tracking;

pub use address::{Address, AddressValidateResult, ValidationMessage};
pub use carrier::{Carrier, CarrierAccount};
pub use tracking::{
    Location, Package, Shipment, TrackPackageResult, TrackingEvent, TrackingQuery, TrackingStatus,
};

//! Carriers and the accounts connected to them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier codes ShipEngine supports, with their display names.
const KNOWN_CARRIERS: &[(&str, &str)] = &[
    ("fedex", "FedEx"),
    ("ups", "UPS"),
    ("usps", "U.S. Postal Service"),
    ("stamps_com", "Stamps.com"),
    ("dhl_express", "DHL Express"),
    ("dhl_express_uk", "DHL Express UK"),
    ("dhl_express_au", "DHL Express Australia"),
    ("dhl_express_ca", "DHL Express Canada"),
    ("dhl_global_mail", "DHL eCommerce"),
    ("canada_post", "Canada Post"),
    ("australia_post", "Australia Post"),
    ("royal_mail", "Royal Mail"),
    ("access_worldwide", "Access Worldwide"),
    ("apc", "APC"),
    ("asendia", "Asendia"),
    ("firstmile", "FirstMile"),
    ("imex", "IMEX"),
    ("newgistics", "Newgistics"),
    ("ontrac", "OnTrac"),
    ("purolator_canada", "Purolator Canada"),
    ("rr_donnelley", "RR Donnelley"),
    ("sendle", "Sendle"),
];

/// A shipping carrier, identified by its ShipEngine carrier code.
///
/// Serialized as the bare code, e.g. `"fedex"`. Codes outside the known
/// list are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Carrier {
    code: String,
}

impl Carrier {
    /// Creates a carrier from its code. Codes are matched case-insensitively.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into().to_ascii_lowercase(),
        }
    }

    /// The carrier code, such as `"ups"`.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// The display name, if the carrier is known.
    ///
    /// ```
    /// use shipengine::Carrier;
    ///
    /// assert_eq!(Carrier::new("FEDEX").name(), Some("FedEx"));
    /// assert_eq!(Carrier::new("pigeon_post").name(), None);
    /// ```
    pub fn name(&self) -> Option<&'static str> {
        KNOWN_CARRIERS
            .iter()
            .find(|(code, _)| *code == self.code)
            .map(|(_, name)| *name)
    }

    /// Returns `true` if the code is one ShipEngine supports.
    pub fn is_known(&self) -> bool {
        self.name().is_some()
    }
}

impl From<String> for Carrier {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

impl From<Carrier> for String {
    fn from(carrier: Carrier) -> Self {
        carrier.code
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name().unwrap_or(&self.code))
    }
}

/// A carrier account connected to a ShipEngine account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierAccount {
    /// The carrier the account belongs to.
    #[serde(rename = "carrierCode")]
    pub carrier: Carrier,
    /// The ShipEngine id of the account, such as `"car_kfUjTZSEAQ8gHeT"`.
    #[serde(rename = "accountID", alias = "accountId")]
    pub account_id: String,
    /// The account number with the carrier.
    #[serde(default)]
    pub account_number: Option<String>,
    /// The nickname given to the account.
    #[serde(default)]
    pub name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_carrier_is_a_bare_code_on_the_wire() {
        let carrier: Carrier = serde_json::from_value(json!("UPS")).unwrap();
        assert_eq!(carrier.code(), "ups");
        assert_eq!(carrier.to_string(), "UPS");
        assert_eq!(serde_json::to_value(&carrier).unwrap(), json!("ups"));
    }

    #[test]
    fn test_unknown_carrier_is_kept() {
        let carrier = Carrier::new("pigeon_post");
        assert!(!carrier.is_known());
        assert_eq!(carrier.to_string(), "pigeon_post");
    }

    #[test]
    fn test_carrier_account_from_wire() {
        let account: CarrierAccount = serde_json::from_value(json!({
            "carrierCode": "fedex",
            "accountID": "car_kfUjTZSEAQ8gHeT",
            "accountNumber": "41E-4928-29314AAX",
            "name": "FedEx Account #1"
        }))
        .unwrap();

        assert_eq!(account.carrier, Carrier::new("fedex"));
        assert_eq!(account.account_id, "car_kfUjTZSEAQ8gHeT");
        assert_eq!(account.account_number.as_deref(), Some("41E-4928-29314AAX"));
        assert_eq!(account.name.as_deref(), Some("FedEx Account #1"));
    }
}

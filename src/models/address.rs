//! Address validation request and result types.

use crate::ErrorCode;
use serde::{Deserialize, Serialize};

/// A postal address.
///
/// # Examples
///
/// ```
/// use shipengine::Address;
///
/// let address = Address::new(
///     vec!["4 Jersey St".to_string(), "Suite 200".to_string()],
///     "Boston",
///     "MA",
///     "02215",
///     "US",
/// )
/// .with_name("Jane Doe");
///
/// assert_eq!(address.street.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Address {
    /// One to three street lines.
    pub street: Vec<String>,
    /// City or locality.
    pub city_locality: String,
    /// State or province.
    pub state_province: String,
    /// Postal or ZIP code.
    pub postal_code: String,
    /// ISO 3166-1 alpha-2 country code.
    pub country_code: String,
    /// Whether the address is residential, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_residential: Option<bool>,
    /// Recipient name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Recipient phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Recipient company.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl Address {
    /// Creates an address from its required parts.
    pub fn new(
        street: Vec<String>,
        city_locality: impl Into<String>,
        state_province: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            street,
            city_locality: city_locality.into(),
            state_province: state_province.into(),
            postal_code: postal_code.into(),
            country_code: country_code.into(),
            ..Default::default()
        }
    }

    /// Sets the recipient name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the recipient phone number.
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    /// Sets the recipient company.
    pub fn with_company_name(mut self, company_name: impl Into<String>) -> Self {
        self.company_name = Some(company_name.into());
        self
    }

    /// Marks the address as residential or commercial.
    pub fn with_residential(mut self, is_residential: bool) -> Self {
        self.is_residential = Some(is_residential);
        self
    }
}

/// An informational, warning or error message attached to a validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// The message code as sent by the server.
    pub code: String,
    /// The human-readable message.
    pub message: String,
}

impl ValidationMessage {
    /// The code as a known [`ErrorCode`], if it is one.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.code.parse().ok()
    }
}

/// The outcome of validating an address.
///
/// `normalized_address` is always `None` when `is_valid` is `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AddressValidateResponse")]
pub struct AddressValidateResult {
    /// Whether the address could be validated.
    pub is_valid: bool,
    /// The id of the request that produced this result.
    pub request_id: Option<String>,
    /// The address as normalized by the carrier.
    pub normalized_address: Option<Address>,
    /// Informational messages.
    pub info: Vec<ValidationMessage>,
    /// Warnings, such as partial verification.
    pub warnings: Vec<ValidationMessage>,
    /// Errors that explain why the address is invalid.
    pub errors: Vec<ValidationMessage>,
}

impl AddressValidateResult {
    /// Returns the first error message, if any.
    pub fn first_error(&self) -> Option<&ValidationMessage> {
        self.errors.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum MessageType {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(rename = "type")]
    kind: MessageType,
    code: String,
    message: String,
}

/// Wire shape of the address validation result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddressValidateResponse {
    is_valid: bool,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    normalized_address: Option<Address>,
    #[serde(default)]
    messages: Vec<WireMessage>,
}

impl From<AddressValidateResponse> for AddressValidateResult {
    fn from(wire: AddressValidateResponse) -> Self {
        let mut info = Vec::new();
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        for m in wire.messages {
            let message = ValidationMessage {
                code: m.code,
                message: m.message,
            };
            match m.kind {
                MessageType::Info => info.push(message),
                MessageType::Warning => warnings.push(message),
                MessageType::Error => errors.push(message),
            }
        }

        Self {
            is_valid: wire.is_valid,
            request_id: wire.request_id,
            normalized_address: if wire.is_valid {
                wire.normalized_address
            } else {
                None
            },
            info,
            warnings,
            errors,
        }
    }
}

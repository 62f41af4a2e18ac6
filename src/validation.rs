//! Local checks run before any request is sent.
//!
//! Each validator returns `Ok` or the specific [`Error::Validation`] /
//! [`Error::InvalidFieldValue`] describing what is wrong. None of these errors
//! carry a request id.

use crate::models::{Address, TrackingQuery};
use crate::{Error, ErrorCode, Result};
use std::time::Duration;

const API_KEY_MESSAGE: &str = "A ShipEngine API key must be specified.";
const CITY_STATE_POSTAL_MESSAGE: &str = "Invalid address. Either the postal code or the city/locality and state/province must be specified.";

/// ISO 3166-1 alpha-2 country codes.
const COUNTRY_CODES: &[&str] = &[
    "AD", "AE", "AF", "AG", "AI", "AL", "AM", "AO", "AQ", "AR", "AS", "AT", "AU", "AW", "AX",
    "AZ", "BA", "BB", "BD", "BE", "BF", "BG", "BH", "BI", "BJ", "BL", "BM", "BN", "BO", "BQ",
    "BR", "BS", "BT", "BV", "BW", "BY", "BZ", "CA", "CC", "CD", "CF", "CG", "CH", "CI", "CK",
    "CL", "CM", "CN", "CO", "CR", "CU", "CV", "CW", "CX", "CY", "CZ", "DE", "DJ", "DK", "DM",
    "DO", "DZ", "EC", "EE", "EG", "EH", "ER", "ES", "ET", "FI", "FJ", "FK", "FM", "FO", "FR",
    "GA", "GB", "GD", "GE", "GF", "GG", "GH", "GI", "GL", "GM", "GN", "GP", "GQ", "GR", "GS",
    "GT", "GU", "GW", "GY", "HK", "HM", "HN", "HR", "HT", "HU", "ID", "IE", "IL", "IM", "IN",
    "IO", "IQ", "IR", "IS", "IT", "JE", "JM", "JO", "JP", "KE", "KG", "KH", "KI", "KM", "KN",
    "KP", "KR", "KW", "KY", "KZ", "LA", "LB", "LC", "LI", "LK", "LR", "LS", "LT", "LU", "LV",
    "LY", "MA", "MC", "MD", "ME", "MF", "MG", "MH", "MK", "ML", "MM", "MN", "MO", "MP", "MQ",
    "MR", "MS", "MT", "MU", "MV", "MW", "MX", "MY", "MZ", "NA", "NC", "NE", "NF", "NG", "NI",
    "NL", "NO", "NP", "NR", "NU", "NZ", "OM", "PA", "PE", "PF", "PG", "PH", "PK", "PL", "PM",
    "PN", "PR", "PS", "PT", "PW", "PY", "QA", "RE", "RO", "RS", "RU", "RW", "SA", "SB", "SC",
    "SD", "SE", "SG", "SH", "SI", "SJ", "SK", "SL", "SM", "SN", "SO", "SR", "SS", "ST", "SV",
    "SX", "SY", "SZ", "TC", "TD", "TF", "TG", "TH", "TJ", "TK", "TL", "TM", "TN", "TO", "TR",
    "TT", "TV", "TW", "TZ", "UA", "UG", "UM", "US", "UY", "UZ", "VA", "VC", "VE", "VG", "VI",
    "VN", "VU", "WF", "WS", "YE", "YT", "ZA", "ZM", "ZW",
];

/// Checks that the API key is present and contains no whitespace.
///
/// # Errors
///
/// Returns [`Error::Validation`] with [`ErrorCode::FieldValueRequired`].
pub fn validate_api_key(api_key: &str) -> Result<()> {
    if api_key.is_empty() || api_key.chars().any(char::is_whitespace) {
        return Err(Error::validation(API_KEY_MESSAGE, ErrorCode::FieldValueRequired));
    }
    Ok(())
}

/// Checks that a retry count is zero or greater.
///
/// # Errors
///
/// Returns [`Error::InvalidFieldValue`] for negative or oversized values.
pub fn validate_retries(retries: i64) -> Result<u32> {
    if retries < 0 {
        return Err(Error::invalid_field_value(
            "retries",
            "Retries must be zero or greater.",
            retries,
        ));
    }
    u32::try_from(retries)
        .map_err(|_| Error::invalid_field_value("retries", "Retries is too large.", retries))
}

/// Checks that a timeout, in seconds, is zero or greater.
///
/// # Errors
///
/// Returns [`Error::InvalidFieldValue`] for negative values.
pub fn validate_timeout(timeout_secs: i64) -> Result<Duration> {
    u64::try_from(timeout_secs)
        .map(Duration::from_secs)
        .map_err(|_| {
            Error::invalid_field_value("timeout", "Timeout must be zero or greater.", timeout_secs)
        })
}

/// Checks that a page size is at least one.
///
/// # Errors
///
/// Returns [`Error::InvalidFieldValue`] for values below one.
pub fn validate_page_size(page_size: i64) -> Result<u32> {
    u32::try_from(page_size)
        .ok()
        .filter(|size| *size > 0)
        .ok_or_else(|| {
            Error::invalid_field_value("page_size", "Page size must be greater than zero.", page_size)
        })
}

/// Checks that there are between one and three street lines.
///
/// # Errors
///
/// Returns [`Error::Validation`].
pub fn validate_street(street: &[String]) -> Result<()> {
    if street.iter().all(|line| line.trim().is_empty()) {
        return Err(Error::validation(
            "Invalid address. At least one address line is required.",
            ErrorCode::FieldValueRequired,
        ));
    }
    if street.len() > 3 {
        return Err(Error::validation(
            "Invalid address. No more than 3 street lines are allowed.",
            ErrorCode::InvalidFieldValue,
        ));
    }
    Ok(())
}

/// Checks that either a postal code, or both a city and a state, are present,
/// and that a postal code, when given, only holds letters, digits, spaces and
/// hyphens (`78756-123`, `02215`, `M6K 3C3`).
///
/// # Errors
///
/// Returns [`Error::Validation`] with [`ErrorCode::FieldValueRequired`].
pub fn validate_city_state_postal(city: &str, state: &str, postal_code: &str) -> Result<()> {
    let postal_code = postal_code.trim();
    let has_city_and_state = !city.trim().is_empty() && !state.trim().is_empty();

    if postal_code.is_empty() && !has_city_and_state {
        return Err(Error::validation(
            CITY_STATE_POSTAL_MESSAGE,
            ErrorCode::FieldValueRequired,
        ));
    }

    let well_formed = postal_code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-');
    if !well_formed {
        return Err(Error::validation(
            CITY_STATE_POSTAL_MESSAGE,
            ErrorCode::FieldValueRequired,
        ));
    }
    Ok(())
}

/// Checks that the country code is a known ISO 3166-1 alpha-2 code.
///
/// # Errors
///
/// Returns [`Error::Validation`] naming the rejected code.
pub fn validate_country_code(country_code: &str) -> Result<()> {
    let normalized = country_code.trim().to_ascii_uppercase();
    if COUNTRY_CODES.binary_search(&normalized.as_str()).is_err() {
        return Err(Error::validation(
            format!(
                "Invalid address: [{}] is not a valid country code.",
                country_code
            ),
            ErrorCode::FieldValueRequired,
        ));
    }
    Ok(())
}

/// Runs every address check, stopping at the first failure.
///
/// # Errors
///
/// Returns the first [`Error::Validation`] encountered.
pub fn validate_address(address: &Address) -> Result<()> {
    validate_street(&address.street)?;
    validate_city_state_postal(
        &address.city_locality,
        &address.state_province,
        &address.postal_code,
    )?;
    validate_country_code(&address.country_code)
}

/// Checks that a tracking query names a carrier and a tracking number.
///
/// # Errors
///
/// Returns [`Error::Validation`] with [`ErrorCode::FieldValueRequired`].
pub fn validate_tracking_query(query: &TrackingQuery) -> Result<()> {
    if query.carrier_code.trim().is_empty() {
        return Err(Error::validation(
            "Invalid tracking query. A carrier code is required.",
            ErrorCode::FieldValueRequired,
        ));
    }
    if query.tracking_number.trim().is_empty() {
        return Err(Error::validation(
            "Invalid tracking query. A tracking number is required.",
            ErrorCode::FieldValueRequired,
        ));
    }
    Ok(())
}

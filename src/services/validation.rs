use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::ValidationFailure;
use crate::models::shipping::{digits_only, ShippingInfo};

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\S+@\S+\.\S+$").unwrap());
static LEGAL_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{6,12}$").unwrap());

const MIN_PHONE_DIGITS: usize = 10;

/// Validate the checkout form before any network call.
///
/// Checks run in order and stop at the first failure: payment widget, acceptance
/// token, required fields, email, phone, legal id.
pub fn validate_checkout(
    shipping: &ShippingInfo,
    acceptance_token: Option<&str>,
    widget_loaded: bool,
) -> Result<(), ValidationFailure> {
    if !widget_loaded {
        return Err(ValidationFailure::PaymentSystemLoading);
    }

    if acceptance_token.map_or(true, str::is_empty) {
        return Err(ValidationFailure::PaymentSystemUnavailable);
    }

    let missing = missing_required_fields(shipping);
    if !missing.is_empty() {
        return Err(ValidationFailure::MissingFields(missing));
    }

    validate_email(&shipping.email)?;
    validate_phone(&shipping.phone)?;
    validate_legal_id(&shipping.legal_id)?;

    Ok(())
}

/// Names of the required fields that are blank, in form order
pub fn missing_required_fields(shipping: &ShippingInfo) -> Vec<&'static str> {
    [
        ("name", &shipping.name),
        ("email", &shipping.email),
        ("address", &shipping.address),
        ("city", &shipping.city),
        ("state", &shipping.state),
        ("phone", &shipping.phone),
        ("legalId", &shipping.legal_id),
    ]
    .into_iter()
    .filter(|(_, value)| value.trim().is_empty())
    .map(|(field, _)| field)
    .collect()
}

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), ValidationFailure> {
    if !EMAIL_PATTERN.is_match(email) {
        return Err(ValidationFailure::InvalidEmail);
    }
    Ok(())
}

/// Validate phone number: separators are ignored, at least ten digits must remain
pub fn validate_phone(phone: &str) -> Result<(), ValidationFailure> {
    if digits_only(phone).len() < MIN_PHONE_DIGITS {
        return Err(ValidationFailure::InvalidPhone);
    }
    Ok(())
}

/// Validate national identity number (6 to 12 digits)
pub fn validate_legal_id(legal_id: &str) -> Result<(), ValidationFailure> {
    if !LEGAL_ID_PATTERN.is_match(legal_id) {
        return Err(ValidationFailure::InvalidLegalId);
    }
    Ok(())
}

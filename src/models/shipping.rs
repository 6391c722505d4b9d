use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::user::UserProfile;

/// Identity document types accepted by the payment processor.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "UPPERCASE", from = "String")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum LegalIdType {
    /// Cédula de ciudadanía
    #[default]
    Cc,
    /// Cédula de extranjería
    Ce,
    Nit,
    /// Passport
    Pp,
    /// Tarjeta de identidad
    Ti,
    Dni,
    Rg,
    Other,
}

/// Backend profiles carry the document type as free text: blank means the
/// default, unrecognised codes become [`LegalIdType::Other`].
impl From<String> for LegalIdType {
    fn from(code: String) -> Self {
        let code = code.trim();
        if code.is_empty() {
            return Self::default();
        }
        code.parse().unwrap_or(Self::Other)
    }
}

/// Shipping and identity details captured by the checkout form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShippingInfo {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub postal_code: String,
    pub legal_id: String,
    pub legal_id_type: LegalIdType,
}

impl ShippingInfo {
    /// Overlays profile data onto the form. Profile values replace what was typed,
    /// including with empty strings when the profile lacks a field.
    pub fn prefill_from_profile(&mut self, profile: &UserProfile) {
        self.name = profile.name.clone().unwrap_or_default();
        self.email = profile.email.clone().unwrap_or_default();

        if let Some(address) = &profile.shipping_address {
            if let Some(value) = &address.address {
                self.address = value.clone();
            }
            if let Some(value) = &address.city {
                self.city = value.clone();
            }
            if let Some(value) = &address.state {
                self.state = value.clone();
            }
            if let Some(value) = &address.phone {
                self.phone = value.clone();
            }
            if let Some(value) = &address.postal_code {
                self.postal_code = value.clone();
            }
        }

        self.legal_id = profile.legal_id.clone().unwrap_or_default();
        self.legal_id_type = profile.legal_id_type.unwrap_or_default();
    }

    /// Phone number with every non-digit removed
    pub fn phone_digits(&self) -> String {
        digits_only(&self.phone)
    }

    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }
}

pub fn digits_only(value: &str) -> String {
    value.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Phone in the international form the processor expects: digits, prefixed with
/// the country code unless already present.
pub fn international_phone(phone: &str, country_prefix: &str) -> String {
    let digits = digits_only(phone);
    if digits.starts_with(country_prefix) {
        digits
    } else {
        format!("{}{}", country_prefix, digits)
    }
}

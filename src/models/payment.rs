use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::shipping::LegalIdType;

/// Card details as captured by the payment form. Never logged, never sent to the merchant backend.
#[derive(Clone, Serialize, Deserialize)]
pub struct CardFields {
    pub number: String,
    pub exp_month: String,
    pub exp_year: String,
    pub cvc: String,
    pub card_holder: String,
}

impl fmt::Debug for CardFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last4: String = self
            .number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        f.debug_struct("CardFields")
            .field("last4", &last4)
            .field("card_holder", &self.card_holder)
            .finish_non_exhaustive()
    }
}

/// Single-use token the processor issued in exchange for card data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardToken(pub String);

impl CardToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Processor terms acceptance, required on every transaction
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresignedAcceptance {
    #[serde(default)]
    pub acceptance_token: Option<String>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MerchantInfo {
    #[serde(default)]
    pub presigned_acceptance: Option<PresignedAcceptance>,
}

/// Body of `GET /merchants/{id}`
#[derive(Debug, Deserialize)]
pub struct MerchantResponse {
    #[serde(default)]
    pub data: Option<MerchantInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentMethod {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub installments: u32,
    pub token: String,
    pub payment_source_id: Option<String>,
}

impl PaymentMethod {
    pub fn card(token: CardToken) -> Self {
        Self {
            kind: "CARD",
            installments: 1,
            token: token.0,
            payment_source_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerData {
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub legal_id_type: LegalIdType,
    pub legal_id: String,
}

/// Transaction submitted to the merchant payment bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub amount_in_cents: i64,
    pub currency: String,
    pub customer_email: String,
    pub payment_method: PaymentMethod,
    pub reference: String,
    pub redirect_url: String,
    pub customer_data: CustomerData,
    pub acceptance_token: String,
    pub signature: String,
}

/// Converts a store-currency total into the processor's cent amount
pub fn amount_in_cents(total: i64) -> Option<i64> {
    total.checked_mul(100)
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentBridgeData {
    #[serde(rename = "paymentUrl", default)]
    pub payment_url: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Envelope returned by the payment bridge on success
#[derive(Debug, Default, Deserialize)]
pub struct PaymentBridgeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<PaymentBridgeData>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl PaymentBridgeResponse {
    /// Processor checkout URL, preferring `paymentUrl` over `redirect_url`
    pub fn redirect_target(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let present = |url: &Option<String>| url.clone().filter(|url| !url.is_empty());
        present(&data.payment_url).or_else(|| present(&data.redirect_url))
    }
}

/// Error body of the payment bridge. `details` and `error.messages` carry
/// field-level validation feedback from the processor.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentBridgeError {
    #[serde(default)]
    pub details: Option<Vec<String>>,
    #[serde(default)]
    pub error: Option<BridgeErrorBody>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BridgeErrorBody {
    Structured {
        #[serde(default)]
        messages: Option<BTreeMap<String, serde_json::Value>>,
        #[serde(default)]
        reason: Option<String>,
    },
    Text(String),
}

impl PaymentBridgeError {
    /// Aggregated human-readable detail, if the backend supplied any
    pub fn detail(&self) -> Option<String> {
        if let Some(details) = self.details.as_ref().filter(|d| !d.is_empty()) {
            return Some(details.join(", "));
        }
        match self.error.as_ref()? {
            BridgeErrorBody::Structured {
                messages: Some(messages),
                ..
            } if !messages.is_empty() => Some(render_field_messages(messages)),
            BridgeErrorBody::Structured {
                reason: Some(reason),
                ..
            } => Some(reason.clone()),
            BridgeErrorBody::Structured { .. } => None,
            BridgeErrorBody::Text(text) => Some(text.clone()),
        }
    }
}

/// Renders `{field: [a, b]}` as `field: a, b; other: c`
pub fn render_field_messages(messages: &BTreeMap<String, serde_json::Value>) -> String {
    messages
        .iter()
        .map(|(field, value)| {
            let rendered = match value {
                serde_json::Value::Array(values) => values
                    .iter()
                    .map(|v| match v {
                        serde_json::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            format!("{}: {}", field, rendered)
        })
        .collect::<Vec<_>>()
        .join("; ")
}

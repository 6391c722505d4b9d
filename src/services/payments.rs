use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::errors::{CheckoutError, TransportError};
use crate::models::payment::{
    amount_in_cents, CardFields, CustomerData, PaymentBridgeError, PaymentBridgeResponse,
    PaymentMethod, PaymentRequest,
};
use crate::models::shipping::{international_phone, ShippingInfo};
use crate::services::api_client::ApiClient;
use crate::services::signature::IntegritySigner;
use crate::services::tokenizer::CardTokenizer;

const CREATE_TRANSACTION_PATH: &str = "/api/wompi/create-transaction";
const PAYMENT_ERROR_PREFIX: &str = "Error processing payment";

/// Issues `ORD-{orderId}-{millis}` references. Millisecond stamps never repeat
/// within a process, even for attempts made in the same millisecond.
#[derive(Debug, Default)]
pub struct ReferenceGenerator {
    last_millis: AtomicI64,
}

impl ReferenceGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, order_id: &str) -> String {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_millis
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        format!("ORD-{}-{}", order_id, now.max(previous + 1))
    }
}

/// Everything a single payment attempt needs for an already created order
#[derive(Debug, Clone, Copy)]
pub struct PaymentAttempt<'a> {
    pub order_id: &'a str,
    pub shipping: &'a ShippingInfo,
    pub total: i64,
    pub card: &'a CardFields,
    pub acceptance_token: &'a str,
    pub auth_token: &'a str,
}

/// Result of a successful handoff to the payment bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentInitiation {
    pub redirect_url: Option<String>,
    pub reference: String,
}

fn payment_error(detail: impl std::fmt::Display) -> CheckoutError {
    CheckoutError::PaymentInitiation(format!("{}: {}", PAYMENT_ERROR_PREFIX, detail))
}

/// Builds, signs and submits processor transactions through the merchant
/// backend's payment bridge.
#[derive(Clone)]
pub struct PaymentInitiationClient {
    api: ApiClient,
    tokenizer: Arc<dyn CardTokenizer>,
    signer: IntegritySigner,
    references: Arc<ReferenceGenerator>,
    currency: String,
    phone_prefix: String,
    storefront_origin: String,
    timeout: Duration,
}

impl PaymentInitiationClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        api: ApiClient,
        tokenizer: Arc<dyn CardTokenizer>,
        signer: IntegritySigner,
        currency: impl Into<String>,
        phone_prefix: impl Into<String>,
        storefront_origin: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            api,
            tokenizer,
            signer,
            references: Arc::new(ReferenceGenerator::new()),
            currency: currency.into(),
            phone_prefix: phone_prefix.into(),
            storefront_origin: storefront_origin.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// Where the processor sends the shopper back after paying
    pub fn order_page_url(&self, order_id: &str) -> String {
        format!("{}/order/{}", self.storefront_origin, order_id)
    }

    #[instrument(skip(self, attempt), fields(order_id = attempt.order_id, total = attempt.total))]
    pub async fn initiate_payment(
        &self,
        attempt: PaymentAttempt<'_>,
    ) -> Result<PaymentInitiation, CheckoutError> {
        let amount = amount_in_cents(attempt.total)
            .ok_or_else(|| payment_error("order total is out of range"))?;

        let token = self.tokenizer.tokenize_card(attempt.card).await?;

        let reference = self.references.next(attempt.order_id);
        let signature = self.signer.sign(&reference, amount, &self.currency);

        let shipping = attempt.shipping;
        let email = shipping.normalized_email();
        let request = PaymentRequest {
            amount_in_cents: amount,
            currency: self.currency.clone(),
            customer_email: email.clone(),
            payment_method: PaymentMethod::card(token),
            reference: reference.clone(),
            redirect_url: self.order_page_url(attempt.order_id),
            customer_data: CustomerData {
                full_name: shipping.name.trim().to_string(),
                phone_number: international_phone(&shipping.phone, &self.phone_prefix),
                email,
                legal_id_type: shipping.legal_id_type,
                legal_id: shipping.legal_id.clone(),
            },
            acceptance_token: attempt.acceptance_token.to_string(),
            signature,
        };

        info!("Submitting transaction {}", reference);

        let response = self
            .api
            .post(
                CREATE_TRANSACTION_PATH,
                &request,
                Some(attempt.auth_token),
                Some(self.timeout),
                &[],
            )
            .await
            .map_err(|err| match err {
                TransportError::Unauthorized(_) => {
                    CheckoutError::Unauthorized("payment initiation rejected".to_string())
                }
                other => payment_error(other),
            })?;

        if !response.is_success() {
            let detail = response
                .json::<PaymentBridgeError>()
                .ok()
                .and_then(|body| body.detail())
                .unwrap_or_else(|| format!("request failed with status {}", response.status.as_u16()));
            warn!("Payment bridge rejected {}: {}", reference, detail);
            return Err(payment_error(detail));
        }

        let body: PaymentBridgeResponse = response
            .json()
            .map_err(|e| payment_error(format!("invalid response from payment bridge: {}", e)))?;

        if !body.success {
            let detail = match &body.error {
                Some(serde_json::Value::String(msg)) if !msg.is_empty() => msg.clone(),
                _ => "no valid response from the payment processor".to_string(),
            };
            warn!("Payment bridge reported failure for {}: {}", reference, detail);
            return Err(payment_error(detail));
        }

        Ok(PaymentInitiation {
            redirect_url: body.redirect_target(),
            reference,
        })
    }
}

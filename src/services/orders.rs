use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::errors::{CheckoutError, TransportError};
use crate::models::order::{Order, OrderEnvelope, OrderRequest};
use crate::services::api_client::ApiClient;

const ORDERS_PATH: &str = "/api/orders";
const ORDER_CREATION_FAILED: &str = "Failed to create order";

/// Client for the merchant backend's order endpoint.
///
/// Exactly one `POST /api/orders` per call; there is no retry. The caller supplies
/// an idempotency key so a resubmitted attempt can be recognised server side.
#[derive(Clone)]
pub struct OrderServiceClient {
    api: ApiClient,
    timeout: Duration,
}

impl OrderServiceClient {
    pub fn new(api: ApiClient, timeout: Duration) -> Self {
        Self { api, timeout }
    }

    #[instrument(skip(self, request, auth_token), fields(items = request.items().len(), total = request.total_price()))]
    pub async fn create_order(
        &self,
        request: &OrderRequest,
        auth_token: &str,
        idempotency_key: &str,
    ) -> Result<Order, CheckoutError> {
        let response = self
            .api
            .post(
                ORDERS_PATH,
                request,
                Some(auth_token),
                Some(self.timeout),
                &[("Idempotency-Key", idempotency_key)],
            )
            .await
            .map_err(|err| match err {
                TransportError::Unauthorized(_) => {
                    CheckoutError::Unauthorized("order creation rejected".to_string())
                }
                TransportError::Timeout(after) => CheckoutError::OrderCreation(format!(
                    "Order creation timed out after {}s",
                    after.as_secs()
                )),
                TransportError::Request(msg) => {
                    warn!("Order request failed: {}", msg);
                    CheckoutError::OrderCreation(ORDER_CREATION_FAILED.to_string())
                }
            })?;

        let envelope: Option<OrderEnvelope> = response.json().ok();

        if !response.is_success() {
            let message = envelope
                .and_then(|body| body.error)
                .filter(|msg| !msg.is_empty())
                .unwrap_or_else(|| ORDER_CREATION_FAILED.to_string());
            return Err(CheckoutError::OrderCreation(message));
        }

        let envelope = envelope.ok_or_else(|| {
            warn!("Order response body could not be parsed");
            CheckoutError::OrderCreation(ORDER_CREATION_FAILED.to_string())
        })?;
        let backend_error = envelope.error.clone().filter(|msg| !msg.is_empty());

        let order = envelope.into_order().ok_or_else(|| {
            warn!("Order response lacks success flag or order id");
            CheckoutError::OrderCreation(
                backend_error.unwrap_or_else(|| ORDER_CREATION_FAILED.to_string()),
            )
        })?;

        info!("Order {} created", order.id);
        Ok(order)
    }
}

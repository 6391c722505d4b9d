use std::time::Duration;

use tracing::{error, info, instrument};

use crate::errors::CheckoutError;
use crate::logging::redact;
use crate::models::payment::{MerchantResponse, PresignedAcceptance};

/// Fetches the processor's presigned acceptance for the merchant.
///
/// Called once per checkout session. Any failure is reported as
/// [`CheckoutError::TokenFetch`] and is never retried.
#[derive(Clone)]
pub struct AcceptanceTokenFetcher {
    client: reqwest::Client,
    base_url: String,
    merchant_id: String,
    private_key: String,
    timeout: Duration,
}

impl AcceptanceTokenFetcher {
    pub fn new(
        base_url: impl Into<String>,
        merchant_id: impl Into<String>,
        private_key: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            merchant_id: merchant_id.into(),
            private_key: private_key.into(),
            timeout,
        }
    }

    /// Returns the full presigned acceptance, guaranteed to carry a non-empty token
    #[instrument(skip(self), fields(merchant_id = %self.merchant_id, key = %redact(&self.private_key)))]
    pub async fn fetch(&self) -> Result<PresignedAcceptance, CheckoutError> {
        let url = format!("{}/merchants/{}", self.base_url, self.merchant_id);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.private_key)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                error!("Acceptance token request failed: {}", e);
                if e.is_timeout() {
                    CheckoutError::TokenFetch(format!(
                        "request timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    CheckoutError::TokenFetch(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Processor returned {} for merchant lookup: {}", status, error_text);
            return Err(CheckoutError::TokenFetch(format!(
                "processor returned status {}",
                status
            )));
        }

        let merchant: MerchantResponse = response.json().await.map_err(|e| {
            CheckoutError::TokenFetch(format!("Failed to parse merchant response: {}", e))
        })?;

        let acceptance = merchant
            .data
            .and_then(|data| data.presigned_acceptance)
            .filter(|acceptance| {
                acceptance
                    .acceptance_token
                    .as_deref()
                    .map_or(false, |token| !token.is_empty())
            })
            .ok_or_else(|| {
                CheckoutError::TokenFetch("response has no acceptance token".to_string())
            })?;

        info!(
            "Acceptance token obtained ({})",
            redact(acceptance.acceptance_token.as_deref().unwrap_or_default())
        );
        Ok(acceptance)
    }
}

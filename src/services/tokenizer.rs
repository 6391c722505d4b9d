use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::errors::CheckoutError;
use crate::logging::redact;
use crate::models::payment::{render_field_messages, CardFields, CardToken};

/// Exchanges raw card data for a single-use processor token.
///
/// `load` is the one-shot initializer that makes the capability available; the
/// checkout session marks the payment widget as loaded once it succeeds.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CardTokenizer: Send + Sync {
    async fn load(&self) -> Result<(), CheckoutError>;

    async fn tokenize_card(&self, card: &CardFields) -> Result<CardToken, CheckoutError>;
}

#[derive(Debug, Deserialize)]
struct TokenData {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    messages: Option<std::collections::BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    data: Option<TokenData>,
    #[serde(default)]
    error: Option<TokenErrorBody>,
}

impl TokenErrorBody {
    fn message(&self) -> String {
        if let Some(messages) = self.messages.as_ref().filter(|m| !m.is_empty()) {
            return render_field_messages(messages);
        }
        self.reason
            .clone()
            .or_else(|| self.kind.clone())
            .unwrap_or_else(|| "card was rejected".to_string())
    }
}

/// Tokenizer backed by the processor's public card-token endpoint
#[derive(Clone)]
pub struct HttpCardTokenizer {
    client: reqwest::Client,
    base_url: String,
    public_key: String,
    timeout: Duration,
}

impl HttpCardTokenizer {
    pub fn new(base_url: impl Into<String>, public_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            public_key: public_key.into(),
            timeout,
        }
    }
}

#[async_trait]
impl CardTokenizer for HttpCardTokenizer {
    async fn load(&self) -> Result<(), CheckoutError> {
        if self.public_key.trim().is_empty() {
            return Err(CheckoutError::Tokenization(
                "payment widget is not available".to_string(),
            ));
        }
        info!("Card tokenizer ready at {}", self.base_url);
        Ok(())
    }

    #[instrument(skip(self, card))]
    async fn tokenize_card(&self, card: &CardFields) -> Result<CardToken, CheckoutError> {
        let url = format!("{}/tokens/cards", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.public_key)
            .timeout(self.timeout)
            .json(card)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CheckoutError::Tokenization(format!(
                        "tokenization timed out after {}s",
                        self.timeout.as_secs()
                    ))
                } else {
                    CheckoutError::Tokenization(e.to_string())
                }
            })?;

        let status = response.status();
        let body: TokenResponse = response.json().await.map_err(|e| {
            CheckoutError::Tokenization(format!("Failed to parse token response: {}", e))
        })?;

        if let Some(error) = body.error {
            let message = error.message();
            warn!("Card tokenization rejected ({}): {}", status, message);
            return Err(CheckoutError::Tokenization(message));
        }

        if !status.is_success() {
            return Err(CheckoutError::Tokenization(format!(
                "processor returned status {}",
                status
            )));
        }

        let token = body
            .data
            .and_then(|data| data.id)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| CheckoutError::Tokenization("no token in response".to_string()))?;

        info!(
            "Card tokenized as {} (status {})",
            redact(&token),
            body.status.as_deref().unwrap_or("unknown")
        );
        Ok(CardToken(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn card() -> CardFields {
        CardFields {
            number: "4242424242424242".into(),
            exp_month: "12".into(),
            exp_year: "29".into(),
            cvc: "123".into(),
            card_holder: "Ana Pérez".into(),
        }
    }

    #[tokio::test]
    async fn returns_token_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens/cards"))
            .and(header("authorization", "Bearer pub_test_key"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "status": "CREATED",
                "data": {"id": "tok_test_123", "brand": "VISA"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tokenizer = HttpCardTokenizer::new(server.uri(), "pub_test_key", Duration::from_secs(5));
        let token = tokenizer.tokenize_card(&card()).await.unwrap();
        assert_eq!(token.as_str(), "tok_test_123");
    }

    #[tokio::test]
    async fn surfaces_field_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens/cards"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "error": {
                    "type": "INPUT_VALIDATION_ERROR",
                    "messages": {"number": ["Número de tarjeta inválido"]}
                }
            })))
            .mount(&server)
            .await;

        let tokenizer = HttpCardTokenizer::new(server.uri(), "pub_test_key", Duration::from_secs(5));
        match tokenizer.tokenize_card(&card()).await {
            Err(CheckoutError::Tokenization(msg)) => {
                assert_eq!(msg, "number: Número de tarjeta inválido")
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn load_requires_public_key() {
        let tokenizer = HttpCardTokenizer::new("https://example.test", "", Duration::from_secs(5));
        assert!(tokenizer.load().await.is_err());
    }
}

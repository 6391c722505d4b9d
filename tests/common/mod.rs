#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use storefront_checkout::{
    config::CheckoutConfig,
    errors::CheckoutError,
    models::{CardFields, CardToken, CartItem, InMemoryCart, ShippingInfo},
    services::{tokenizer::CardTokenizer, CheckoutOrchestrator, Navigator, TokenProvider},
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const MERCHANT_ID: &str = "test_merchant";
pub const INTEGRITY_SECRET: &str = "test_integrity_secret";
pub const ACCEPTANCE_TOKEN: &str = "acc_tok_test";

/// Records every navigation instead of performing it
#[derive(Default)]
pub struct RecordingNavigator {
    pub redirects: Mutex<Vec<String>>,
    pub logins: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().unwrap().clone()
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }
}

#[async_trait]
impl Navigator for RecordingNavigator {
    async fn redirect(&self, url: &str) {
        self.redirects.lock().unwrap().push(url.to_string());
    }

    async fn redirect_to_login(&self, return_to: &str) {
        self.logins.lock().unwrap().push(return_to.to_string());
    }
}

/// Token provider with a fixed token that can be revoked
pub struct StaticTokenProvider {
    token: Mutex<Option<String>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: Mutex::new(token.map(str::to_string)),
        }
    }

    pub fn current(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Option<String> {
        self.current()
    }

    async fn invalidate(&self) {
        *self.token.lock().unwrap() = None;
    }
}

/// Tokenizer that never touches the network
pub struct FakeTokenizer {
    pub loads: bool,
    pub result: Result<String, String>,
    pub calls: Mutex<usize>,
}

impl FakeTokenizer {
    pub fn issuing(token: &str) -> Self {
        Self {
            loads: true,
            result: Ok(token.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn declining(reason: &str) -> Self {
        Self {
            loads: true,
            result: Err(reason.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl CardTokenizer for FakeTokenizer {
    async fn load(&self) -> Result<(), CheckoutError> {
        if self.loads {
            Ok(())
        } else {
            Err(CheckoutError::Tokenization("widget unavailable".to_string()))
        }
    }

    async fn tokenize_card(&self, _card: &CardFields) -> Result<CardToken, CheckoutError> {
        *self.calls.lock().unwrap() += 1;
        self.result
            .clone()
            .map(CardToken)
            .map_err(CheckoutError::Tokenization)
    }
}

pub fn test_config(server: &MockServer) -> CheckoutConfig {
    let mut config = CheckoutConfig::new(
        server.uri(),
        server.uri(),
        MERCHANT_ID,
        "prv_test_key",
        "pub_test_key",
        INTEGRITY_SECRET,
    );
    config.storefront_origin = "https://shop.example".to_string();
    config.redirect_delay_ms = 0;
    config
}

pub fn valid_shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Ana Pérez".into(),
        email: "ana@example.com".into(),
        address: "Calle 1 # 2-3".into(),
        city: "Bogotá".into(),
        state: "Cundinamarca".into(),
        phone: "300 555 1234".into(),
        legal_id: "1020304050".into(),
        ..Default::default()
    }
}

pub fn test_card() -> CardFields {
    CardFields {
        number: "4111111111111111".into(),
        exp_month: "08".into(),
        exp_year: "30".into(),
        cvc: "999".into(),
        card_holder: "Ana Pérez".into(),
    }
}

pub fn cart_item(id: &str, price: i64, quantity: u32) -> CartItem {
    CartItem {
        id: id.to_string(),
        name: format!("Product {}", id),
        unit_price: price,
        quantity,
        image: None,
    }
}

pub async fn mount_acceptance(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/merchants/{}", MERCHANT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": {
                "presigned_acceptance": {
                    "acceptance_token": ACCEPTANCE_TOKEN,
                    "permalink": "https://processor.example/terms.pdf",
                    "type": "END_USER_POLICY"
                }
            }
        })))
        .mount(server)
        .await;
}

/// Checkout wired against a mock backend, with handles to every collaborator
pub struct TestCheckout {
    pub server: MockServer,
    pub cart: Arc<InMemoryCart>,
    pub tokens: Arc<StaticTokenProvider>,
    pub navigator: Arc<RecordingNavigator>,
    pub tokenizer: Arc<FakeTokenizer>,
    pub checkout: CheckoutOrchestrator,
}

impl TestCheckout {
    pub async fn new(items: Vec<CartItem>, token: Option<&str>, tokenizer: FakeTokenizer) -> Self {
        let server = MockServer::start().await;
        Self::with_server(server, items, token, tokenizer)
    }

    pub fn with_server(
        server: MockServer,
        items: Vec<CartItem>,
        token: Option<&str>,
        tokenizer: FakeTokenizer,
    ) -> Self {
        let config = test_config(&server);
        Self::with_config(server, &config, items, token, tokenizer)
    }

    pub fn with_config(
        server: MockServer,
        config: &CheckoutConfig,
        items: Vec<CartItem>,
        token: Option<&str>,
        tokenizer: FakeTokenizer,
    ) -> Self {
        let cart = Arc::new(InMemoryCart::with_items(items));
        let tokens = Arc::new(StaticTokenProvider::new(token));
        let navigator = Arc::new(RecordingNavigator::default());
        let tokenizer = Arc::new(tokenizer);

        let checkout = CheckoutOrchestrator::from_config(
            config,
            cart.clone(),
            tokens.clone(),
            navigator.clone(),
            tokenizer.clone(),
        )
        .expect("checkout wiring");

        Self {
            server,
            cart,
            tokens,
            navigator,
            tokenizer,
            checkout,
        }
    }

    /// Fetches the acceptance token and fills in a valid form
    pub async fn ready(&self) {
        mount_acceptance(&self.server).await;
        self.checkout.initialize().await.expect("initialize");
        self.checkout.session().set_shipping(valid_shipping()).await;
    }
}

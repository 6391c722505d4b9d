//! Payment initiation against a mocked payment bridge: how backend and
//! processor feedback ends up in the message shown to the shopper.

mod common;

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use common::{test_card, valid_shipping, FakeTokenizer, INTEGRITY_SECRET};
use rstest::rstest;
use serde_json::{json, Value};
use storefront_checkout::{
    errors::CheckoutError,
    services::{
        api_client::ApiClient,
        payments::{PaymentAttempt, PaymentInitiationClient},
        signature::IntegritySigner,
    },
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, timeout: Duration) -> PaymentInitiationClient {
    PaymentInitiationClient::new(
        ApiClient::new(server.uri(), Duration::from_secs(5)).unwrap(),
        Arc::new(FakeTokenizer::issuing("tok_test")),
        IntegritySigner::new(INTEGRITY_SECRET).unwrap(),
        "COP",
        "57",
        "https://shop.example",
        timeout,
    )
}

async fn initiate(
    server: &MockServer,
    timeout: Duration,
) -> Result<storefront_checkout::services::payments::PaymentInitiation, CheckoutError> {
    let shipping = valid_shipping();
    let card = test_card();
    client(server, timeout)
        .initiate_payment(PaymentAttempt {
            order_id: "abc123",
            shipping: &shipping,
            total: 58_000,
            card: &card,
            acceptance_token: "acc_tok",
            auth_token: "jwt",
        })
        .await
}

#[rstest]
#[case::details_array(
    json!({"details": ["amount_in_cents is invalid", "reference already used"]}),
    "Error processing payment: amount_in_cents is invalid, reference already used"
)]
#[case::field_messages(
    json!({"error": {"type": "INPUT_VALIDATION_ERROR", "messages": {
        "customer_data.legal_id": ["is too short", "must be numeric"],
        "signature": ["does not match"]
    }}}),
    "Error processing payment: customer_data.legal_id: is too short, must be numeric; signature: does not match"
)]
#[case::error_string(
    json!({"error": "Invalid acceptance token"}),
    "Error processing payment: Invalid acceptance token"
)]
#[case::no_detail(json!({}), "Error processing payment: request failed with status 422")]
#[tokio::test]
async fn bridge_errors_are_aggregated(#[case] body: Value, #[case] expected: &str) {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wompi/create-transaction"))
        .respond_with(ResponseTemplate::new(422).set_body_json(body))
        .mount(&server)
        .await;

    assert_matches!(
        initiate(&server, Duration::from_secs(5)).await,
        Err(CheckoutError::PaymentInitiation(msg)) if msg == expected
    );
}

#[tokio::test]
async fn falls_back_to_redirect_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wompi/create-transaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"paymentUrl": "", "redirect_url": "https://processor.example/redirect/9"}
        })))
        .mount(&server)
        .await;

    let initiation = initiate(&server, Duration::from_secs(5)).await.unwrap();
    assert_eq!(
        initiation.redirect_url.as_deref(),
        Some("https://processor.example/redirect/9")
    );
}

#[tokio::test]
async fn slow_bridge_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wompi/create-transaction"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    assert_matches!(
        initiate(&server, Duration::from_secs(1)).await,
        Err(CheckoutError::PaymentInitiation(msg))
            if msg.starts_with("Error processing payment:") && msg.contains("timed out")
    );
}

#[tokio::test]
async fn signature_matches_sent_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/wompi/create-transaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"paymentUrl": "https://pay.example/1"}
        })))
        .mount(&server)
        .await;

    let initiation = initiate(&server, Duration::from_secs(5)).await.unwrap();
    let requests = server.received_requests().await.unwrap();
    let sent: Value = serde_json::from_slice(&requests[0].body).unwrap();

    let signer = IntegritySigner::new(INTEGRITY_SECRET).unwrap();
    assert_eq!(sent["reference"], initiation.reference.as_str());
    assert_eq!(
        sent["signature"],
        signer.sign(&initiation.reference, 5_800_000, "COP")
    );
    assert_ne!(
        sent["signature"],
        signer.sign(&initiation.reference, 5_800_001, "COP")
    );
}

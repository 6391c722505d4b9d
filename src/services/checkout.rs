use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::CheckoutConfig;
use crate::errors::CheckoutError;
use crate::models::cart::{CartStore, CartTotals, PricingRules};
use crate::models::order::OrderRequest;
use crate::models::payment::CardFields;
use crate::services::acceptance::AcceptanceTokenFetcher;
use crate::services::api_client::ApiClient;
use crate::services::orders::OrderServiceClient;
use crate::services::payments::{PaymentAttempt, PaymentInitiationClient};
use crate::services::session::{CheckoutSession, CheckoutState, PendingOrder};
use crate::services::signature::IntegritySigner;
use crate::services::tokenizer::CardTokenizer;
use crate::services::validation::validate_checkout;

/// Route the login step returns the shopper to
pub const CART_ROUTE: &str = "/cart";

const REDIRECT_MESSAGE: &str = "Order created successfully. Redirecting to payment...";
const WIDGET_LOAD_FAILED: &str = "Error loading the payment system";

/// Where the shopper is sent when checkout leaves the storefront.
#[async_trait]
pub trait Navigator: Send + Sync {
    async fn redirect(&self, url: &str);

    /// Sends the shopper to sign in, coming back to `return_to` afterwards
    async fn redirect_to_login(&self, return_to: &str);
}

/// Source of the merchant backend bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;

    /// Drops the stored token after the backend rejected it
    async fn invalidate(&self);
}

/// How a submit ended when it did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutOutcome {
    Redirected {
        order_id: String,
        reference: String,
        redirect_url: String,
    },
    LoginRequired,
}

/// Drives a checkout attempt from form validation to the payment redirect.
#[derive(Clone)]
pub struct CheckoutOrchestrator {
    session: Arc<CheckoutSession>,
    cart: Arc<dyn CartStore>,
    tokens: Arc<dyn TokenProvider>,
    navigator: Arc<dyn Navigator>,
    tokenizer: Arc<dyn CardTokenizer>,
    acceptance: AcceptanceTokenFetcher,
    orders: OrderServiceClient,
    payments: PaymentInitiationClient,
    pricing: PricingRules,
    redirect_delay: Duration,
}

impl CheckoutOrchestrator {
    /// Wires the backend and processor clients from configuration.
    ///
    /// Fails before any network call when the integrity secret is unusable.
    pub fn from_config(
        config: &CheckoutConfig,
        cart: Arc<dyn CartStore>,
        tokens: Arc<dyn TokenProvider>,
        navigator: Arc<dyn Navigator>,
        tokenizer: Arc<dyn CardTokenizer>,
    ) -> Result<Self, CheckoutError> {
        let api = ApiClient::new(config.api_base_url.clone(), config.http_timeout())?;
        let signer = IntegritySigner::new(config.integrity_secret.clone())?;

        let acceptance = AcceptanceTokenFetcher::new(
            config.processor_base_url.clone(),
            config.merchant_id.clone(),
            config.processor_private_key.clone(),
            config.acceptance_timeout(),
        );
        let orders = OrderServiceClient::new(api.clone(), config.order_timeout());
        let payments = PaymentInitiationClient::new(
            api,
            tokenizer.clone(),
            signer,
            config.currency.clone(),
            config.phone_country_prefix.clone(),
            config.storefront_origin.clone(),
            config.payment_timeout(),
        );

        Ok(Self {
            session: Arc::new(CheckoutSession::new()),
            cart,
            tokens,
            navigator,
            tokenizer,
            acceptance,
            orders,
            payments,
            pricing: PricingRules {
                free_shipping_threshold: config.free_shipping_threshold,
                flat_shipping_fee: config.flat_shipping_fee,
            },
            redirect_delay: config.redirect_delay(),
        })
    }

    pub fn session(&self) -> &Arc<CheckoutSession> {
        &self.session
    }

    pub fn pricing(&self) -> PricingRules {
        self.pricing
    }

    pub async fn totals(&self) -> CartTotals {
        CartTotals::from_items(&self.cart.items().await, &self.pricing)
    }

    /// Loads the card tokenizer and fetches the acceptance token, once per session.
    ///
    /// A failed token fetch disables checkout for the rest of the session.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<(), CheckoutError> {
        if !self.session.begin_initialization() {
            return Ok(());
        }

        match self.tokenizer.load().await {
            Ok(()) => self.session.mark_widget_loaded(),
            Err(err) => {
                error!("Card tokenizer failed to load: {}", err);
                self.session.set_error(WIDGET_LOAD_FAILED).await;
            }
        }

        match self.acceptance.fetch().await {
            Ok(acceptance) => {
                self.session.store_acceptance(acceptance);
                Ok(())
            }
            Err(err) => {
                error!("Could not obtain acceptance token: {}", err);
                let message = err.user_message();
                if err.is_fatal() {
                    self.session.record_fatal_error(message.clone());
                }
                self.session.set_error(message).await;
                Err(err)
            }
        }
    }

    /// Runs one checkout attempt with the card data captured by the payment form.
    #[instrument(skip(self, card))]
    pub async fn submit(&self, card: CardFields) -> Result<CheckoutOutcome, CheckoutError> {
        let _processing = self.session.begin_processing()?;

        let items = self.cart.items().await;
        if items.is_empty() {
            let err = CheckoutError::EmptyCart;
            self.session.set_error(err.user_message()).await;
            return Err(err);
        }

        self.session.transition(CheckoutState::Validating).await?;
        self.session.clear_messages().await;

        let shipping = self.session.shipping().await;
        if let Err(failure) = validate_checkout(
            &shipping,
            self.session.acceptance_token(),
            self.session.widget_loaded(),
        ) {
            return Err(self.fail(failure.into()).await);
        }

        let auth_token = match self.tokens.bearer_token().await {
            Some(token) => token,
            None => {
                info!("No session token, routing to login");
                let err = CheckoutError::Unauthorized("no session token".to_string());
                self.session.set_error(err.user_message()).await;
                self.session.transition(CheckoutState::Idle).await?;
                self.navigator.redirect_to_login(CART_ROUTE).await;
                return Ok(CheckoutOutcome::LoginRequired);
            }
        };

        self.session.transition(CheckoutState::CreatingOrder).await?;

        let totals = CartTotals::from_items(&items, &self.pricing);
        let request = OrderRequest::new(&items, &shipping, totals);
        let pending = match self.pending_for(&request).await {
            Ok(pending) => pending,
            Err(err) => return Err(self.fail(err).await),
        };

        let order_id = match pending.order_id.clone() {
            Some(order_id) => {
                info!("Resuming payment for unpaid order {}", order_id);
                order_id
            }
            None => {
                let created = self
                    .orders
                    .create_order(&request, &auth_token, &pending.idempotency_key)
                    .await;
                match created {
                    Ok(order) => {
                        self.session
                            .set_pending_order(Some(PendingOrder {
                                order_id: Some(order.id.clone()),
                                ..pending
                            }))
                            .await;
                        order.id
                    }
                    Err(err) => return Err(self.fail(err).await),
                }
            }
        };

        self.session
            .transition(CheckoutState::InitiatingPayment)
            .await?;

        let acceptance_token = self.session.acceptance_token().unwrap_or_default();
        let initiation = self
            .payments
            .initiate_payment(PaymentAttempt {
                order_id: &order_id,
                shipping: &shipping,
                total: totals.total,
                card: &card,
                acceptance_token,
                auth_token: &auth_token,
            })
            .await;

        let initiation = match initiation {
            Ok(initiation) => initiation,
            Err(err) => {
                warn!("Order {} created but not paid", order_id);
                return Err(self.fail(err).await);
            }
        };

        self.session.transition(CheckoutState::Redirecting).await?;
        self.cart.clear().await;
        self.session.set_pending_order(None).await;
        self.session.set_success(REDIRECT_MESSAGE).await;

        let redirect_url = initiation
            .redirect_url
            .unwrap_or_else(|| self.payments.order_page_url(&order_id));

        if !self.redirect_delay.is_zero() {
            tokio::time::sleep(self.redirect_delay).await;
        }
        info!("Redirecting order {} to {}", order_id, redirect_url);
        self.navigator.redirect(&redirect_url).await;

        Ok(CheckoutOutcome::Redirected {
            order_id,
            reference: initiation.reference,
            redirect_url,
        })
    }

    /// Pending order entry for this request. A different request replaces any
    /// previous entry, leaving that order unpaid on the backend.
    async fn pending_for(&self, request: &OrderRequest) -> Result<PendingOrder, CheckoutError> {
        let fingerprint = request.fingerprint()?;

        if let Some(existing) = self.session.pending_order().await {
            if existing.fingerprint == fingerprint {
                return Ok(existing);
            }
            if let Some(order_id) = &existing.order_id {
                warn!(
                    "Cart changed since order {} was created; it remains unpaid",
                    order_id
                );
            }
        }

        let pending = PendingOrder {
            fingerprint,
            idempotency_key: Uuid::new_v4().to_string(),
            order_id: None,
        };
        self.session.set_pending_order(Some(pending.clone())).await;
        Ok(pending)
    }

    /// Records the failure on the session and hands the error back
    async fn fail(&self, err: CheckoutError) -> CheckoutError {
        warn!("Checkout attempt failed: {}", err);
        self.session.set_error(err.user_message()).await;
        if let Err(transition_err) = self.session.transition(CheckoutState::Failed).await {
            error!("{}", transition_err);
        }

        if matches!(err, CheckoutError::Unauthorized(_)) {
            self.tokens.invalidate().await;
            self.navigator.redirect_to_login(CART_ROUTE).await;
        }
        err
    }
}

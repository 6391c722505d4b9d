use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use once_cell::sync::OnceCell;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::errors::CheckoutError;
use crate::models::payment::PresignedAcceptance;
use crate::models::shipping::ShippingInfo;
use crate::models::user::UserProfile;

/// Phases of a single checkout attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CheckoutState {
    #[default]
    Idle,
    Validating,
    CreatingOrder,
    InitiatingPayment,
    Redirecting,
    Failed,
}

impl fmt::Display for CheckoutState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CheckoutState::Idle => "idle",
            CheckoutState::Validating => "validating",
            CheckoutState::CreatingOrder => "creating_order",
            CheckoutState::InitiatingPayment => "initiating_payment",
            CheckoutState::Redirecting => "redirecting",
            CheckoutState::Failed => "failed",
        };
        f.write_str(name)
    }
}

impl CheckoutState {
    pub fn can_transition_to(self, next: CheckoutState) -> bool {
        use CheckoutState::*;
        matches!(
            (self, next),
            (Idle, Validating)
                | (Validating, Failed)
                | (Validating, CreatingOrder)
                | (Validating, Idle)
                | (CreatingOrder, Failed)
                | (CreatingOrder, InitiatingPayment)
                | (InitiatingPayment, Failed)
                | (InitiatingPayment, Redirecting)
                | (Failed, Validating)
        )
    }
}

/// An order the backend created whose payment has not been handed off yet.
///
/// Keyed by the fingerprint of the order request so that a retry with the same
/// cart and destination pays for this order instead of creating another one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingOrder {
    pub fingerprint: String,
    pub idempotency_key: String,
    pub order_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusMessages {
    pub error: Option<String>,
    pub success: Option<String>,
}

/// State shared by every checkout attempt of one storefront session.
///
/// The acceptance token and the fatal initialization error are written at most
/// once. The widget flag is only written by the initializer.
#[derive(Debug, Default)]
pub struct CheckoutSession {
    initialized: AtomicBool,
    acceptance: OnceCell<PresignedAcceptance>,
    fatal_error: OnceCell<String>,
    widget_loaded: AtomicBool,
    processing: AtomicBool,
    state: RwLock<CheckoutState>,
    shipping: RwLock<ShippingInfo>,
    status: RwLock<StatusMessages>,
    pending_order: Mutex<Option<PendingOrder>>,
}

impl CheckoutSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the one-shot initialization. Returns false if it already ran.
    pub(crate) fn begin_initialization(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    pub fn acceptance_token(&self) -> Option<&str> {
        self.acceptance
            .get()
            .and_then(|acceptance| acceptance.acceptance_token.as_deref())
    }

    /// Terms link to show next to the payment button
    pub fn acceptance_permalink(&self) -> Option<&str> {
        self.acceptance
            .get()
            .and_then(|acceptance| acceptance.permalink.as_deref())
    }

    pub(crate) fn store_acceptance(&self, acceptance: PresignedAcceptance) {
        if self.acceptance.set(acceptance).is_err() {
            debug!("Acceptance token already stored, keeping the first one");
        }
    }

    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal_error.get().map(String::as_str)
    }

    pub(crate) fn record_fatal_error(&self, message: String) {
        let _ = self.fatal_error.set(message);
    }

    pub fn widget_loaded(&self) -> bool {
        self.widget_loaded.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_widget_loaded(&self) {
        self.widget_loaded.store(true, Ordering::SeqCst);
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Whether the pay button should be enabled
    pub fn can_submit(&self) -> bool {
        self.widget_loaded()
            && self.acceptance_token().is_some()
            && self.fatal_error().is_none()
            && !self.is_processing()
    }

    /// Marks an attempt as running. The flag is released when the guard drops.
    pub(crate) fn begin_processing(&self) -> Result<ProcessingGuard<'_>, CheckoutError> {
        self.processing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CheckoutError::CheckoutInProgress)?;
        Ok(ProcessingGuard { session: self })
    }

    pub async fn state(&self) -> CheckoutState {
        *self.state.read().await
    }

    pub(crate) async fn transition(&self, next: CheckoutState) -> Result<(), CheckoutError> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(next) {
            return Err(CheckoutError::InvalidTransition(format!(
                "from {} to {}",
                *state, next
            )));
        }
        debug!("Checkout state {} -> {}", *state, next);
        *state = next;
        Ok(())
    }

    pub async fn shipping(&self) -> ShippingInfo {
        self.shipping.read().await.clone()
    }

    pub async fn set_shipping(&self, shipping: ShippingInfo) {
        *self.shipping.write().await = shipping;
    }

    /// Applies an edit to the shipping form in place
    pub async fn update_shipping<F>(&self, edit: F)
    where
        F: FnOnce(&mut ShippingInfo),
    {
        edit(&mut *self.shipping.write().await);
    }

    pub async fn prefill_from_profile(&self, profile: &UserProfile) {
        self.shipping.write().await.prefill_from_profile(profile);
    }

    pub async fn status(&self) -> StatusMessages {
        self.status.read().await.clone()
    }

    pub async fn error_message(&self) -> Option<String> {
        self.status.read().await.error.clone()
    }

    pub async fn success_message(&self) -> Option<String> {
        self.status.read().await.success.clone()
    }

    pub(crate) async fn set_error(&self, message: impl Into<String>) {
        let mut status = self.status.write().await;
        status.error = Some(message.into());
        status.success = None;
    }

    pub(crate) async fn set_success(&self, message: impl Into<String>) {
        let mut status = self.status.write().await;
        status.success = Some(message.into());
        status.error = None;
    }

    pub(crate) async fn clear_messages(&self) {
        *self.status.write().await = StatusMessages::default();
    }

    pub async fn pending_order(&self) -> Option<PendingOrder> {
        self.pending_order.lock().await.clone()
    }

    pub(crate) async fn set_pending_order(&self, pending: Option<PendingOrder>) {
        *self.pending_order.lock().await = pending;
    }
}

/// Releases the session's processing flag on drop
#[derive(Debug)]
pub struct ProcessingGuard<'a> {
    session: &'a CheckoutSession,
}

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.session.processing.store(false, Ordering::SeqCst);
    }
}

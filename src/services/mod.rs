// Merchant backend transport
pub mod api_client;

// Checkout flow
pub mod checkout;
pub mod session;
pub mod validation;

// Payment processor
pub mod acceptance;
pub mod payments;
pub mod signature;
pub mod tokenizer;

// Merchant backend resources
pub mod auth;
pub mod catalog;
pub mod orders;

pub use checkout::{CheckoutOrchestrator, CheckoutOutcome, Navigator, TokenProvider};
pub use session::{CheckoutSession, CheckoutState};

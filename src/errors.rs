use std::time::Duration;

use thiserror::Error;

/// Why a checkout form was rejected before any network call was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("The payment system is still loading. Please wait a moment.")]
    PaymentSystemLoading,

    #[error("The payment system is temporarily unavailable. Please try again later.")]
    PaymentSystemUnavailable,

    #[error("Please complete all required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Phone number must have at least 10 digits")]
    InvalidPhone,

    #[error("Invalid legal ID. It must have between 6 and 12 digits")]
    InvalidLegalId,
}

/// Failures raised by the merchant API transport before a response body is inspected.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Carries the backend's `message` when the 401 body had one
    #[error("Unauthorized: the session is no longer valid")]
    Unauthorized(Option<String>),

    #[error("request timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("{0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Request(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("{0}")]
    Validation(#[from] ValidationFailure),

    #[error("Your cart is empty")]
    EmptyCart,

    #[error("A checkout attempt is already in progress")]
    CheckoutInProgress,

    #[error("Acceptance token error: {0}")]
    TokenFetch(String),

    #[error("Card tokenization error: {0}")]
    Tokenization(String),

    #[error("Signature generation error: {0}")]
    Signature(String),

    #[error("{0}")]
    OrderCreation(String),

    #[error("{0}")]
    PaymentInitiation(String),

    #[error("{operation} timed out after {seconds}s")]
    NetworkTimeout {
        operation: &'static str,
        seconds: u64,
    },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Catalog error: {0}")]
    Catalog(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid checkout transition: {0}")]
    InvalidTransition(String),
}

impl CheckoutError {
    /// Message suitable for display next to the checkout form.
    /// Internal failures return generic text to avoid leaking implementation details.
    pub fn user_message(&self) -> String {
        match self {
            Self::TokenFetch(_) => {
                "Could not connect to the payment processor. Try reloading the page.".to_string()
            }
            Self::Signature(_) => "Failed to generate the payment security signature".to_string(),
            Self::Unauthorized(_) => "You must sign in to continue with your purchase".to_string(),
            Self::Config(_) | Self::Serialization(_) | Self::InvalidTransition(_) => {
                "Error processing the order. Check your details and try again.".to_string()
            }
            Self::Tokenization(msg) => format!("Error processing payment: {}", msg),
            _ => self.to_string(),
        }
    }

    /// Whether this failure disables checkout for the rest of the session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TokenFetch(_))
    }

    /// Maps a transport failure for an operation that reports timeouts generically.
    pub fn from_transport(
        operation: &'static str,
        err: TransportError,
        wrap: fn(String) -> Self,
    ) -> Self {
        match err {
            TransportError::Unauthorized(_) => Self::Unauthorized(format!("{} rejected", operation)),
            TransportError::Timeout(after) => Self::NetworkTimeout {
                operation,
                seconds: after.as_secs(),
            },
            TransportError::Request(msg) => wrap(msg),
        }
    }
}

impl From<serde_json::Error> for CheckoutError {
    fn from(err: serde_json::Error) -> Self {
        CheckoutError::Serialization(err.to_string())
    }
}

pub type CheckoutResult<T> = Result<T, CheckoutError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_lists_names_in_order() {
        let failure = ValidationFailure::MissingFields(vec!["name", "phone"]);
        assert_eq!(
            failure.to_string(),
            "Please complete all required fields: name, phone"
        );
    }

    #[test]
    fn backend_detail_is_shown_verbatim() {
        let err = CheckoutError::OrderCreation("Product out of stock".to_string());
        assert_eq!(err.user_message(), "Product out of stock");
    }

    #[test]
    fn internal_errors_are_masked() {
        let err = CheckoutError::Config("integrity_secret missing".to_string());
        assert!(!err.user_message().contains("integrity_secret"));
    }

    #[test]
    fn only_token_fetch_is_fatal() {
        assert!(CheckoutError::TokenFetch("boom".into()).is_fatal());
        assert!(!CheckoutError::OrderCreation("boom".into()).is_fatal());
        assert!(!CheckoutError::EmptyCart.is_fatal());
    }

    #[test]
    fn timeouts_keep_operation_name() {
        let err = CheckoutError::from_transport(
            "fetch products",
            TransportError::Timeout(Duration::from_secs(15)),
            CheckoutError::Catalog,
        );
        assert_eq!(err.to_string(), "fetch products timed out after 15s");
    }
}

use sha2::{Digest, Sha256};

use crate::errors::CheckoutError;

/// Integrity signature generator for processor transactions.
///
/// The digest is SHA-256 over `reference ‖ amount_in_cents ‖ currency ‖ secret`,
/// hex encoded. The processor recomputes it and rejects the transaction on mismatch.
#[derive(Clone)]
pub struct IntegritySigner {
    secret: String,
}

impl IntegritySigner {
    pub fn new(secret: impl Into<String>) -> Result<Self, CheckoutError> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return Err(CheckoutError::Signature(
                "integrity secret is not configured".to_string(),
            ));
        }
        Ok(Self { secret })
    }

    pub fn sign(&self, reference: &str, amount_in_cents: i64, currency: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(reference.as_bytes());
        hasher.update(amount_in_cents.to_string().as_bytes());
        hasher.update(currency.as_bytes());
        hasher.update(self.secret.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl std::fmt::Debug for IntegritySigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntegritySigner").finish_non_exhaustive()
    }
}

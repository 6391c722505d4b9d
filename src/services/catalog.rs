use tracing::{error, instrument};

use crate::errors::CheckoutError;
use crate::models::product::Product;
use crate::services::api_client::ApiClient;

const PRODUCTS_FAILED: &str = "Error fetching products";
const PRODUCT_FAILED: &str = "Error fetching product";

/// Read-only client for the product catalog
#[derive(Clone)]
pub struct ProductServiceClient {
    api: ApiClient,
}

impl ProductServiceClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>, CheckoutError> {
        let response = self
            .api
            .get("/products", None, None)
            .await
            .map_err(|e| CheckoutError::from_transport("fetch products", e, CheckoutError::Catalog))?;

        if !response.is_success() {
            error!("Catalog returned {} listing products", response.status);
            return Err(CheckoutError::Catalog(PRODUCTS_FAILED.to_string()));
        }

        Ok(response.json()?)
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &str) -> Result<Product, CheckoutError> {
        let response = self
            .api
            .get(&format!("/products/{}", id), None, None)
            .await
            .map_err(|e| CheckoutError::from_transport("fetch product", e, CheckoutError::Catalog))?;

        if !response.is_success() {
            error!("Catalog returned {} for product {}", response.status, id);
            return Err(CheckoutError::Catalog(PRODUCT_FAILED.to_string()));
        }

        Ok(response.json()?)
    }
}

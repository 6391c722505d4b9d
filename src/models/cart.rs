use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

const PLACEHOLDER_IMAGE: &str = "/placeholder-product.jpg";

/// A product line in the shopper's cart. Prices are integer amounts in the store currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "price")]
    pub unit_price: i64,
    pub quantity: u32,
    #[serde(default, rename = "image", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl CartItem {
    /// Saturates instead of overflowing; an out-of-range total is rejected at payment time.
    pub fn line_total(&self) -> i64 {
        self.unit_price.saturating_mul(i64::from(self.quantity))
    }

    /// Resolves the item image against the merchant upload directory.
    pub fn image_url(&self, api_base_url: &str) -> String {
        match self.image.as_deref().filter(|path| !path.is_empty()) {
            None => PLACEHOLDER_IMAGE.to_string(),
            Some(path) if path.starts_with("http") => path.to_string(),
            Some(path) => format!(
                "{}/uploads/products/{}",
                api_base_url.trim_end_matches('/'),
                path
            ),
        }
    }
}

/// Shipping and totals derived from the cart subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingRules {
    /// Subtotals strictly above this amount ship for free
    pub free_shipping_threshold: i64,
    pub flat_shipping_fee: i64,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self {
            free_shipping_threshold: 100_000,
            flat_shipping_fee: 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartTotals {
    pub subtotal: i64,
    pub shipping: i64,
    pub total: i64,
}

impl CartTotals {
    pub fn from_subtotal(subtotal: i64, rules: &PricingRules) -> Self {
        let shipping = if subtotal > rules.free_shipping_threshold {
            0
        } else {
            rules.flat_shipping_fee
        };
        Self {
            subtotal,
            shipping,
            total: subtotal.saturating_add(shipping),
        }
    }

    pub fn from_items(items: &[CartItem], rules: &PricingRules) -> Self {
        let subtotal = items
            .iter()
            .map(CartItem::line_total)
            .fold(0i64, i64::saturating_add);
        Self::from_subtotal(subtotal, rules)
    }
}

/// Cart collaborator the checkout reads from and clears after a successful payment handoff.
#[async_trait]
pub trait CartStore: Send + Sync {
    async fn items(&self) -> Vec<CartItem>;
    async fn clear(&self);
}

/// Cart kept in process memory for the lifetime of the storefront session
#[derive(Debug, Default)]
pub struct InMemoryCart {
    items: RwLock<Vec<CartItem>>,
}

impl InMemoryCart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items(items: Vec<CartItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Adds an item, merging quantities when the product is already in the cart
    pub async fn add_item(&self, item: CartItem) {
        let mut items = self.items.write().await;
        match items.iter_mut().find(|existing| existing.id == item.id) {
            Some(existing) => existing.quantity = existing.quantity.saturating_add(item.quantity),
            None => items.push(item),
        }
    }

    pub async fn remove_item(&self, product_id: &str) {
        self.items.write().await.retain(|item| item.id != product_id);
    }

    /// Sets the quantity of a line; anything below one removes it
    pub async fn update_quantity(&self, product_id: &str, quantity: u32) {
        if quantity < 1 {
            self.remove_item(product_id).await;
            return;
        }
        let mut items = self.items.write().await;
        if let Some(item) = items.iter_mut().find(|item| item.id == product_id) {
            item.quantity = quantity;
        }
    }

    pub async fn totals(&self, rules: &PricingRules) -> CartTotals {
        CartTotals::from_items(&self.items.read().await, rules)
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[async_trait]
impl CartStore for InMemoryCart {
    async fn items(&self) -> Vec<CartItem> {
        self.items.read().await.clone()
    }

    async fn clear(&self) {
        self.items.write().await.clear();
    }
}

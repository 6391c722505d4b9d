use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::cart::{CartItem, CartTotals};
use super::shipping::{LegalIdType, ShippingInfo};

const DEFAULT_POSTAL_CODE: &str = "000000";
const PAYMENT_METHOD_CARD: &str = "credit_card";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderItem {
    pub product: String,
    pub name: String,
    pub price: i64,
    pub quantity: u32,
    pub image: Option<String>,
}

impl From<&CartItem> for OrderItem {
    fn from(item: &CartItem) -> Self {
        Self {
            product: item.id.clone(),
            name: item.name.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            image: item.image.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub email: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub phone: String,
    pub legal_id: String,
    pub legal_id_type: LegalIdType,
}

impl From<&ShippingInfo> for ShippingAddress {
    fn from(info: &ShippingInfo) -> Self {
        let postal_code = match info.postal_code.trim() {
            "" => DEFAULT_POSTAL_CODE.to_string(),
            code => code.to_string(),
        };
        Self {
            name: info.name.trim().to_string(),
            email: info.normalized_email(),
            address: info.address.trim().to_string(),
            city: info.city.trim().to_string(),
            state: info.state.trim().to_string(),
            postal_code,
            phone: info.phone_digits(),
            legal_id: info.legal_id.clone(),
            legal_id_type: info.legal_id_type,
        }
    }
}

/// Snapshot of the cart, destination and pricing sent once per checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    order_items: Vec<OrderItem>,
    shipping_address: ShippingAddress,
    payment_method: &'static str,
    items_price: i64,
    shipping_price: i64,
    total_price: i64,
}

impl OrderRequest {
    pub fn new(items: &[CartItem], shipping: &ShippingInfo, totals: CartTotals) -> Self {
        Self {
            order_items: items.iter().map(OrderItem::from).collect(),
            shipping_address: ShippingAddress::from(shipping),
            payment_method: PAYMENT_METHOD_CARD,
            items_price: totals.subtotal,
            shipping_price: totals.shipping,
            total_price: totals.total,
        }
    }

    pub fn items(&self) -> &[OrderItem] {
        &self.order_items
    }

    pub fn shipping_address(&self) -> &ShippingAddress {
        &self.shipping_address
    }

    pub fn total_price(&self) -> i64 {
        self.total_price
    }

    /// Stable digest of the request body, used to recognise a retry of the same order
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let body = serde_json::to_vec(self)?;
        let mut hasher = Sha256::new();
        hasher.update(&body);
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Order as assigned by the merchant backend
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Envelope returned by `POST /api/orders`
#[derive(Debug, Deserialize)]
pub struct OrderEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub order: Option<OrderPayload>,
    #[serde(default)]
    pub error: Option<String>,
}

/// The order object inside the envelope; the id may be missing on malformed responses
#[derive(Debug, Deserialize)]
pub struct OrderPayload {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl OrderEnvelope {
    pub fn into_order(self) -> Option<Order> {
        if !self.success {
            return None;
        }
        let payload = self.order?;
        let id = payload.id.filter(|id| !id.is_empty())?;
        Some(Order {
            id,
            status: payload.status,
        })
    }
}

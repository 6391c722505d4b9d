pub mod cart;
pub mod order;
pub mod payment;
pub mod product;
pub mod shipping;
pub mod user;

pub use cart::{CartItem, CartStore, CartTotals, InMemoryCart, PricingRules};
pub use order::{Order, OrderRequest};
pub use payment::{CardFields, CardToken, PaymentRequest, PresignedAcceptance};
pub use product::Product;
pub use shipping::{LegalIdType, ShippingInfo};
pub use user::{LoginCredentials, UserProfile};

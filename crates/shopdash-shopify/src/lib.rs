pub mod client;
pub mod error;
pub mod normalize;
pub mod pagination;
pub mod types;

pub use client::{AdminClientOptions, ShopifyAdminClient};
pub use error::ShopifyError;
pub use normalize::{normalize_customer, normalize_order, normalize_product};
pub use pagination::{PageSequence, MAX_PAGES};
pub use types::{
    CustomersPage, OrdersPage, ProductsPage, RawAmount, ResourcePage, ShopifyCustomer,
    ShopifyId, ShopifyLineItem, ShopifyOrder, ShopifyProduct, ShopifyVariant,
};

//! Read-only lookups and ledger writes the pricing core depends on.
//!
//! Every store is an `async_trait` object so handlers can hold them behind `Arc<dyn _>`
//! and tests can swap in [`crate::infrastructure::memory::MemoryStore`].

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;
use crate::domain::aggregates::{Coupon, CouponUsage, FlashSale, FlashSaleProduct, IneligibleReason, Product, ProductVariant, ShippingZone};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError>;
    async fn get_variant(&self, id: Uuid) -> Result<Option<ProductVariant>, StoreError>;
}

#[async_trait]
pub trait FlashSaleStore: Send + Sync + 'static {
    /// Sales whose stored status is active. The window is not guaranteed to be open.
    async fn list_active_sales(&self) -> Result<Vec<FlashSale>, StoreError>;
    async fn list_sale_products(&self, sale_id: Uuid) -> Result<Vec<FlashSaleProduct>, StoreError>;
}

/// Result of an attempted redemption.
#[derive(Debug, Clone, PartialEq)]
pub enum Redemption {
    Recorded { usage: CouponUsage, usage_count: i32 },
    CouponMissing,
    /// A cap was hit at write time, typically by a concurrent redemption.
    Rejected(IneligibleReason),
}

#[async_trait]
pub trait CouponStore: Send + Sync + 'static {
    /// Exact, case-sensitive lookup.
    async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError>;
    async fn count_user_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64, StoreError>;
    /// Appends the ledger row and increments `usage_count` as one unit, re-checking
    /// `max_usage_count` and `max_usage_per_user` while holding the coupon.
    async fn record_usage(&self, usage: CouponUsage) -> Result<Redemption, StoreError>;
}

#[async_trait]
pub trait ShippingZoneStore: Send + Sync + 'static {
    /// Active zones, most recently created first.
    async fn list_active_zones(&self) -> Result<Vec<ShippingZone>, StoreError>;
}

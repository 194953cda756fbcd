//! In-process store backing tests and local demos.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;
use crate::domain::aggregates::{Coupon, CouponUsage, FlashSale, FlashSaleProduct, FlashSaleStatus, IneligibleReason, Product, ProductVariant, ShippingZone};
use crate::ports::{CatalogStore, CouponStore, FlashSaleStore, Redemption, ShippingZoneStore, StoreError};

#[derive(Default)]
struct CouponBook {
    coupons: HashMap<Uuid, Coupon>,
    usages: Vec<CouponUsage>,
}

impl CouponBook {
    fn user_usage(&self, coupon_id: Uuid, user_id: Uuid) -> i64 {
        self.usages.iter().filter(|u| u.coupon_id == coupon_id && u.user_id == user_id).count() as i64
    }
}

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<Uuid, Product>>,
    variants: Mutex<HashMap<Uuid, ProductVariant>>,
    sales: Mutex<Vec<FlashSale>>,
    sale_products: Mutex<Vec<FlashSaleProduct>>,
    book: Mutex<CouponBook>,
    zones: Mutex<Vec<ShippingZone>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub async fn add_product(&self, product: Product) { self.products.lock().await.insert(product.id, product); }
    pub async fn add_variant(&self, variant: ProductVariant) { self.variants.lock().await.insert(variant.id, variant); }

    pub async fn add_flash_sale(&self, sale: FlashSale, products: Vec<FlashSaleProduct>) {
        self.sales.lock().await.push(sale);
        self.sale_products.lock().await.extend(products);
    }

    pub async fn add_coupon(&self, coupon: Coupon) { self.book.lock().await.coupons.insert(coupon.id, coupon); }
    pub async fn add_zone(&self, zone: ShippingZone) { self.zones.lock().await.push(zone); }

    pub async fn coupon(&self, id: Uuid) -> Option<Coupon> { self.book.lock().await.coupons.get(&id).cloned() }
    pub async fn usages(&self) -> Vec<CouponUsage> { self.book.lock().await.usages.clone() }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        Ok(self.products.lock().await.get(&id).cloned())
    }

    async fn get_variant(&self, id: Uuid) -> Result<Option<ProductVariant>, StoreError> {
        Ok(self.variants.lock().await.get(&id).cloned())
    }
}

#[async_trait]
impl FlashSaleStore for MemoryStore {
    async fn list_active_sales(&self) -> Result<Vec<FlashSale>, StoreError> {
        Ok(self.sales.lock().await.iter().filter(|s| s.status == FlashSaleStatus::Active).cloned().collect())
    }

    async fn list_sale_products(&self, sale_id: Uuid) -> Result<Vec<FlashSaleProduct>, StoreError> {
        Ok(self.sale_products.lock().await.iter().filter(|p| p.flash_sale_id == sale_id).cloned().collect())
    }
}

#[async_trait]
impl CouponStore for MemoryStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        Ok(self.book.lock().await.coupons.values().find(|c| c.code == code).cloned())
    }

    async fn count_user_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64, StoreError> {
        Ok(self.book.lock().await.user_usage(coupon_id, user_id))
    }

    async fn record_usage(&self, usage: CouponUsage) -> Result<Redemption, StoreError> {
        let mut book = self.book.lock().await;
        let user_usage = book.user_usage(usage.coupon_id, usage.user_id);
        let Some(coupon) = book.coupons.get_mut(&usage.coupon_id) else {
            return Ok(Redemption::CouponMissing);
        };
        if coupon.max_usage_count.is_some_and(|max| coupon.usage_count >= max) {
            return Ok(Redemption::Rejected(IneligibleReason::UsageLimitReached));
        }
        if let Err(reason) = coupon.check_user_usage(user_usage) {
            return Ok(Redemption::Rejected(reason));
        }
        coupon.usage_count += 1;
        let usage_count = coupon.usage_count;
        book.usages.push(usage.clone());
        Ok(Redemption::Recorded { usage, usage_count })
    }
}

#[async_trait]
impl ShippingZoneStore for MemoryStore {
    async fn list_active_zones(&self) -> Result<Vec<ShippingZone>, StoreError> {
        let mut zones: Vec<ShippingZone> = self.zones.lock().await.iter().filter(|z| z.is_active()).cloned().collect();
        zones.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(zones)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn redemption_respects_global_cap() {
        let store = MemoryStore::new();
        let mut coupon = Coupon::fixed("ONCE", Decimal::from(5_000));
        coupon.max_usage_count = Some(1);
        let id = coupon.id;
        store.add_coupon(coupon).await;

        let first = store.record_usage(CouponUsage::new(id, Uuid::now_v7(), Uuid::now_v7(), Decimal::from(5_000))).await.unwrap();
        assert!(matches!(first, Redemption::Recorded { usage_count: 1, .. }));
        let second = store.record_usage(CouponUsage::new(id, Uuid::now_v7(), Uuid::now_v7(), Decimal::from(5_000))).await.unwrap();
        assert_eq!(second, Redemption::Rejected(IneligibleReason::UsageLimitReached));
        assert_eq!(store.usages().await.len(), 1);
        assert_eq!(store.coupon(id).await.unwrap().usage_count, 1);
    }

    #[tokio::test]
    async fn redemption_respects_per_user_cap() {
        let store = MemoryStore::new();
        let mut coupon = Coupon::percentage("PERUSER", Decimal::from(10));
        coupon.max_usage_per_user = Some(1);
        let id = coupon.id;
        store.add_coupon(coupon).await;
        let user = Uuid::now_v7();

        store.record_usage(CouponUsage::new(id, user, Uuid::now_v7(), Decimal::ONE)).await.unwrap();
        let again = store.record_usage(CouponUsage::new(id, user, Uuid::now_v7(), Decimal::ONE)).await.unwrap();
        assert_eq!(again, Redemption::Rejected(IneligibleReason::UserLimitReached));
        let other = store.record_usage(CouponUsage::new(id, Uuid::now_v7(), Uuid::now_v7(), Decimal::ONE)).await.unwrap();
        assert!(matches!(other, Redemption::Recorded { usage_count: 2, .. }));
        assert_eq!(store.count_user_usage(id, user).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unknown_coupon_is_reported() {
        let store = MemoryStore::new();
        let usage = CouponUsage::new(Uuid::now_v7(), Uuid::now_v7(), Uuid::now_v7(), Decimal::ONE);
        assert_eq!(store.record_usage(usage).await.unwrap(), Redemption::CouponMissing);
    }

    #[tokio::test]
    async fn code_lookup_is_case_sensitive() {
        let store = MemoryStore::new();
        store.add_coupon(Coupon::fixed("Hemat", Decimal::ONE)).await;
        assert!(store.get_by_code("Hemat").await.unwrap().is_some());
        assert!(store.get_by_code("HEMAT").await.unwrap().is_none());
    }
}

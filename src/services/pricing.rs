//! Line-item price resolution.
//!
//! Discounts follow a fixed precedence, evaluated top-down with early return:
//! flash sale, then reseller volume tiering, then retail bulk discount, then none.
//! Tier and bulk schedules are cliff functions: the band reached by the whole
//! quantity sets one percentage for every unit.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use crate::domain::value_objects::{percent_of, round_money, CustomerType, DiscountType, Quantity};
use crate::ports::{CatalogStore, StoreError};
use crate::services::flash_sale::{FlashOverride, FlashSaleResolver};
use crate::{PricingError, Result};

/// Reseller volume tiers as (minimum quantity, percent off), highest band first.
pub const RESELLER_TIERS: [(u32, u32); 6] = [(100, 30), (50, 25), (20, 20), (10, 15), (5, 10), (0, 5)];

/// Retail bulk bands as (minimum quantity, percent off), highest band first.
pub const RETAIL_BULK: [(u32, u32); 3] = [(10, 10), (5, 5), (0, 0)];

pub fn band_percent(bands: &[(u32, u32)], quantity: u32) -> Decimal {
    bands.iter().find(|(min, _)| quantity >= *min).map(|(_, pct)| Decimal::from(*pct)).unwrap_or(Decimal::ZERO)
}

#[derive(Clone, Debug, Deserialize)]
pub struct PriceCalculationRequest {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
    pub customer_type: CustomerType,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceCalculationResponse {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    pub product_name: String,
    pub quantity: u32,
    pub customer_type: CustomerType,
    /// Unit price before discount.
    pub base_price: Decimal,
    pub discount_percentage: Decimal,
    /// Savings per unit.
    pub discount_amount: Decimal,
    pub final_unit_price: Decimal,
    pub total_base_price: Decimal,
    pub total_discount: Decimal,
    /// Line total after discount.
    pub final_price: Decimal,
    pub discount_type: DiscountType,
    pub flash_sale_id: Option<Uuid>,
    pub flash_sale_ends_at: Option<DateTime<Utc>>,
    pub unit_weight_kg: Decimal,
}

/// Inputs of the precedence chain. Everything here is already looked up.
#[derive(Clone, Debug)]
pub struct PricingContext {
    pub base_price: Decimal,
    pub quantity: Quantity,
    pub customer_type: CustomerType,
    pub flash_sale: Option<FlashOverride>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnitPrice {
    pub price: Decimal,
    pub percent: Decimal,
    pub discount_type: DiscountType,
}

pub trait DiscountRule: Sync {
    /// `None` passes the decision to the next rule.
    fn apply(&self, ctx: &PricingContext) -> Option<UnitPrice>;
}

pub struct FlashSaleRule;
pub struct ResellerTierRule;
pub struct RetailBulkRule;

impl DiscountRule for FlashSaleRule {
    fn apply(&self, ctx: &PricingContext) -> Option<UnitPrice> {
        let sale = ctx.flash_sale.as_ref()?;
        let percent = if ctx.base_price.is_zero() {
            Decimal::ZERO
        } else {
            round_money((ctx.base_price - sale.price) * Decimal::ONE_HUNDRED / ctx.base_price)
        };
        Some(UnitPrice { price: sale.price, percent, discount_type: DiscountType::FlashSale })
    }
}

impl DiscountRule for ResellerTierRule {
    fn apply(&self, ctx: &PricingContext) -> Option<UnitPrice> {
        if ctx.customer_type != CustomerType::Reseller { return None; }
        let percent = band_percent(&RESELLER_TIERS, ctx.quantity.value());
        percent_off(ctx.base_price, percent, DiscountType::Reseller)
    }
}

impl DiscountRule for RetailBulkRule {
    fn apply(&self, ctx: &PricingContext) -> Option<UnitPrice> {
        if ctx.customer_type != CustomerType::Retail { return None; }
        let percent = band_percent(&RETAIL_BULK, ctx.quantity.value());
        if percent.is_zero() { return None; }
        percent_off(ctx.base_price, percent, DiscountType::Bulk)
    }
}

// Cannot fail for prices accepted by `PriceCalculator::calculate`.
fn percent_off(base: Decimal, percent: Decimal, discount_type: DiscountType) -> Option<UnitPrice> {
    Some(UnitPrice { price: base - percent_of(base, percent)?, percent, discount_type })
}

/// Upper bound on stored unit prices; keeps every percentage of a price representable.
fn in_price_range(amount: Decimal) -> bool {
    amount.checked_mul(Decimal::ONE_HUNDRED).is_some()
}

/// Rules in precedence order.
pub static DISCOUNT_POLICY: &[&dyn DiscountRule] = &[&FlashSaleRule, &ResellerTierRule, &RetailBulkRule];

/// Unit price under [`DISCOUNT_POLICY`]. Pure.
pub fn resolve_unit_price(ctx: &PricingContext) -> UnitPrice {
    DISCOUNT_POLICY
        .iter()
        .find_map(|rule| rule.apply(ctx))
        .unwrap_or(UnitPrice { price: ctx.base_price, percent: Decimal::ZERO, discount_type: DiscountType::None })
}

#[derive(Clone)]
pub struct PriceCalculator {
    catalog: Arc<dyn CatalogStore>,
    flash_sales: FlashSaleResolver,
}

impl PriceCalculator {
    pub fn new(catalog: Arc<dyn CatalogStore>, flash_sales: FlashSaleResolver) -> Self { Self { catalog, flash_sales } }

    pub async fn calculate(&self, req: &PriceCalculationRequest) -> Result<PriceCalculationResponse> {
        let quantity = Quantity::new(req.quantity).map_err(|e| PricingError::invalid(e.to_string()))?;
        let product = self.catalog.get_product(req.product_id).await?
            .ok_or_else(|| PricingError::not_found(format!("product {}", req.product_id)))?;
        let variant = match req.variant_id {
            Some(id) => {
                let variant = self.catalog.get_variant(id).await?
                    .ok_or_else(|| PricingError::not_found(format!("variant {id}")))?;
                if !variant.belongs_to(product.id) {
                    return Err(PricingError::invalid(format!("variant {id} does not belong to product {}", product.id)));
                }
                Some(variant)
            }
            None => None,
        };

        let ctx = PricingContext {
            base_price: product.base_price(variant.as_ref()),
            quantity,
            customer_type: req.customer_type,
            flash_sale: self.flash_sales.active_override(product.id).await?,
        };
        if !in_price_range(ctx.base_price) || ctx.flash_sale.as_ref().is_some_and(|s| !in_price_range(s.price)) {
            return Err(StoreError::Corrupt(format!("product {} has a price out of range", product.id)).into());
        }
        let unit = resolve_unit_price(&ctx);
        tracing::debug!(product_id = %product.id, discount_type = unit.discount_type.as_str(), unit_price = %unit.price, "price resolved");

        let qty = quantity.as_decimal();
        let savings = ctx.base_price - unit.price;
        let line = |amount: Decimal| amount.checked_mul(qty)
            .ok_or_else(|| PricingError::invalid(format!("quantity {} too large for this product", quantity.value())));
        Ok(PriceCalculationResponse {
            product_id: product.id,
            variant_id: variant.as_ref().map(|v| v.id),
            product_name: product.name,
            quantity: quantity.value(),
            customer_type: req.customer_type,
            base_price: ctx.base_price,
            discount_percentage: unit.percent,
            discount_amount: savings,
            final_unit_price: unit.price,
            total_base_price: line(ctx.base_price)?,
            total_discount: line(savings)?,
            final_price: line(unit.price)?,
            discount_type: unit.discount_type,
            flash_sale_id: ctx.flash_sale.as_ref().map(|s| s.flash_sale_id),
            flash_sale_ends_at: ctx.flash_sale.as_ref().map(|s| s.ends_at),
            unit_weight_kg: product.weight_kg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;
    use rstest::rstest;
    use crate::clock::FixedClock;
    use crate::domain::aggregates::{FlashSale, FlashSaleProduct, FlashSaleStatus, Product, ProductVariant};
    use crate::infrastructure::MemoryStore;

    fn d(v: i64) -> Decimal { Decimal::from(v) }

    fn ctx(qty: i64, customer_type: CustomerType, flash: Option<i64>) -> PricingContext {
        PricingContext {
            base_price: d(100_000),
            quantity: Quantity::new(qty).unwrap(),
            customer_type,
            flash_sale: flash.map(|p| FlashOverride { flash_sale_id: Uuid::nil(), price: d(p), ends_at: Utc::now() }),
        }
    }

    #[rstest]
    #[case(1, 5)]
    #[case(4, 5)]
    #[case(5, 10)]
    #[case(9, 10)]
    #[case(10, 15)]
    #[case(19, 15)]
    #[case(20, 20)]
    #[case(49, 20)]
    #[case(50, 25)]
    #[case(99, 25)]
    #[case(100, 30)]
    #[case(5000, 30)]
    fn reseller_tiers(#[case] qty: i64, #[case] pct: i64) {
        let unit = resolve_unit_price(&ctx(qty, CustomerType::Reseller, None));
        assert_eq!(unit.percent, d(pct));
        assert_eq!(unit.discount_type, DiscountType::Reseller);
        assert_eq!(unit.price, d(100_000) - d(1_000) * d(pct));
    }

    #[rstest]
    #[case(1, 0, DiscountType::None)]
    #[case(4, 0, DiscountType::None)]
    #[case(5, 5, DiscountType::Bulk)]
    #[case(9, 5, DiscountType::Bulk)]
    #[case(10, 10, DiscountType::Bulk)]
    #[case(250, 10, DiscountType::Bulk)]
    fn retail_bulk(#[case] qty: i64, #[case] pct: i64, #[case] tag: DiscountType) {
        let unit = resolve_unit_price(&ctx(qty, CustomerType::Retail, None));
        assert_eq!(unit.percent, d(pct));
        assert_eq!(unit.discount_type, tag);
    }

    #[rstest]
    #[case(1, CustomerType::Retail)]
    #[case(10, CustomerType::Retail)]
    #[case(1, CustomerType::Reseller)]
    #[case(100, CustomerType::Reseller)]
    fn flash_sale_always_wins(#[case] qty: i64, #[case] customer_type: CustomerType) {
        let unit = resolve_unit_price(&ctx(qty, customer_type, Some(80_000)));
        assert_eq!(unit.price, d(80_000));
        assert_eq!(unit.percent, d(20));
        assert_eq!(unit.discount_type, DiscountType::FlashSale);
    }

    proptest! {
        #[test]
        fn retail_bulk_is_non_decreasing(q in 1u32..10_000) {
            prop_assert!(band_percent(&RETAIL_BULK, q) <= band_percent(&RETAIL_BULK, q + 1));
        }

        #[test]
        fn reseller_tiers_are_non_decreasing(q in 1u32..10_000) {
            prop_assert!(band_percent(&RESELLER_TIERS, q) <= band_percent(&RESELLER_TIERS, q + 1));
        }

        #[test]
        fn reseller_always_beats_or_matches_retail(q in 1i64..1_000) {
            let reseller = resolve_unit_price(&ctx(q, CustomerType::Reseller, None));
            let retail = resolve_unit_price(&ctx(q, CustomerType::Retail, None));
            prop_assert!(reseller.price <= retail.price);
        }
    }

    fn calculator(now: DateTime<Utc>) -> (PriceCalculator, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(FixedClock(now));
        let flash = FlashSaleResolver::new(store.clone(), clock);
        (PriceCalculator::new(store.clone(), flash), store)
    }

    fn request(product_id: Uuid, quantity: i64, customer_type: CustomerType) -> PriceCalculationRequest {
        PriceCalculationRequest { product_id, variant_id: None, quantity, customer_type }
    }

    #[tokio::test]
    async fn reseller_twenty_units() {
        let (calc, store) = calculator(Utc::now());
        let product = Product::new("Hijab Segi Empat", d(100_000), Decimal::new(2, 1));
        store.add_product(product.clone()).await;

        let res = calc.calculate(&request(product.id, 20, CustomerType::Reseller)).await.unwrap();
        assert_eq!(res.final_price, d(1_600_000));
        assert_eq!(res.total_base_price, d(2_000_000));
        assert_eq!(res.total_discount, d(400_000));
        assert_eq!(res.discount_type, DiscountType::Reseller);
    }

    #[tokio::test]
    async fn flash_sale_single_retail_unit() {
        let now = Utc::now();
        let (calc, store) = calculator(now);
        let product = Product::new("Sepatu Lari", d(100_000), Decimal::ONE);
        store.add_product(product.clone()).await;
        let sale = FlashSale::new("Harbolnas", FlashSaleStatus::Active, now - Duration::hours(1), now + Duration::hours(1));
        let enrolled = FlashSaleProduct { flash_sale_id: sale.id, product_id: product.id, flash_sale_price: d(50_000), stock_limit: 100 };
        store.add_flash_sale(sale.clone(), vec![enrolled]).await;

        let res = calc.calculate(&request(product.id, 1, CustomerType::Retail)).await.unwrap();
        assert_eq!(res.final_price, d(50_000));
        assert_eq!(res.discount_type, DiscountType::FlashSale);
        assert_eq!(res.discount_amount, d(50_000));
        assert_eq!(res.flash_sale_ends_at, Some(sale.end_time));
    }

    #[tokio::test]
    async fn variant_price_is_the_base() {
        let (calc, store) = calculator(Utc::now());
        let product = Product::new("Kaos", d(100_000), Decimal::ONE);
        let variant = ProductVariant::new(product.id, Some(d(120_000)));
        store.add_product(product.clone()).await;
        store.add_variant(variant.clone()).await;

        let mut req = request(product.id, 5, CustomerType::Retail);
        req.variant_id = Some(variant.id);
        let res = calc.calculate(&req).await.unwrap();
        assert_eq!(res.base_price, d(120_000));
        assert_eq!(res.final_unit_price, d(114_000));
        assert_eq!(res.final_price, d(570_000));
    }

    #[tokio::test]
    async fn rejects_bad_input() {
        let (calc, store) = calculator(Utc::now());
        let product = Product::new("Topi", d(40_000), Decimal::ONE);
        let stranger = ProductVariant::new(Uuid::now_v7(), None);
        store.add_product(product.clone()).await;
        store.add_variant(stranger.clone()).await;

        let zero = calc.calculate(&request(product.id, 0, CustomerType::Retail)).await;
        assert!(matches!(zero, Err(PricingError::InvalidArgument(_))));

        let missing = calc.calculate(&request(Uuid::now_v7(), 1, CustomerType::Retail)).await;
        assert!(matches!(missing, Err(PricingError::NotFound(_))));

        let mut req = request(product.id, 1, CustomerType::Retail);
        req.variant_id = Some(stranger.id);
        assert!(matches!(calc.calculate(&req).await, Err(PricingError::InvalidArgument(_))));

        req.variant_id = Some(Uuid::now_v7());
        assert!(matches!(calc.calculate(&req).await, Err(PricingError::NotFound(_))));
    }

    #[tokio::test]
    async fn oversized_line_total_is_invalid() {
        let (calc, store) = calculator(Utc::now());
        let product = Product::new("Emas Batangan", Decimal::from_i128_with_scale(10_i128.pow(20), 0), Decimal::ONE);
        store.add_product(product.clone()).await;

        let err = calc.calculate(&request(product.id, i64::from(u32::MAX), CustomerType::Retail)).await.unwrap_err();
        assert!(matches!(err, PricingError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unrepresentable_price_is_an_upstream_error() {
        let (calc, store) = calculator(Utc::now());
        let product = Product::new("Rusak", Decimal::MAX, Decimal::ONE);
        store.add_product(product.clone()).await;

        let err = calc.calculate(&request(product.id, 1, CustomerType::Reseller)).await.unwrap_err();
        assert!(matches!(err, PricingError::Upstream(StoreError::Corrupt(_))));
    }
}

//! PostgreSQL-backed stores (sqlx). Schema lives in `migrations/`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;
use crate::domain::aggregates::{CarrierRates, Coupon, CouponUsage, FlashSale, FlashSaleProduct, Product, ProductVariant, ShippingZone};
use crate::ports::{CatalogStore, CouponStore, FlashSaleStore, Redemption, ShippingZoneStore, StoreError};

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => StoreError::Unavailable(e.to_string()),
            other => StoreError::Database(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[derive(Debug, sqlx::FromRow)]
struct ProductRow { id: Uuid, name: String, price: Decimal, category: Option<String>, weight_kg: Decimal, created_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct VariantRow { id: Uuid, product_id: Uuid, size: Option<String>, color: Option<String>, price: Option<Decimal>, stock: i32 }

#[derive(Debug, sqlx::FromRow)]
struct FlashSaleRow { id: Uuid, name: String, status: String, start_time: DateTime<Utc>, end_time: DateTime<Utc>, created_at: DateTime<Utc> }

#[derive(Debug, sqlx::FromRow)]
struct FlashSaleProductRow { flash_sale_id: Uuid, product_id: Uuid, flash_sale_price: Decimal, stock_limit: i32 }

#[derive(Debug, sqlx::FromRow)]
struct CouponRow {
    id: Uuid, code: String, name: String, coupon_type: String, discount_value: Decimal,
    max_discount: Option<Decimal>, min_purchase: Option<Decimal>, max_usage_count: Option<i32>, max_usage_per_user: Option<i32>,
    valid_from: Option<DateTime<Utc>>, valid_until: Option<DateTime<Utc>>, for_retail: bool, for_reseller: bool,
    usage_count: i32, status: String, created_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct ZoneRow {
    id: Uuid, name: String, status: String, regions: Vec<String>, excluded_regions: Vec<String>,
    jne_rate: Decimal, jnt_rate: Decimal, sicepat_rate: Decimal, pos_rate: Decimal,
    minimum_cost: Decimal, handling_fee: Decimal, free_shipping_enabled: bool, free_shipping_threshold: Decimal,
    created_at: DateTime<Utc>,
}

fn corrupt(table: &str, id: Uuid, e: impl std::fmt::Display) -> StoreError {
    StoreError::Corrupt(format!("{table} {id}: {e}"))
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product { id: r.id, name: r.name, price: r.price, category: r.category, weight_kg: r.weight_kg, created_at: r.created_at }
    }
}

impl From<VariantRow> for ProductVariant {
    fn from(r: VariantRow) -> Self {
        ProductVariant { id: r.id, product_id: r.product_id, size: r.size, color: r.color, price: r.price, stock: r.stock }
    }
}

impl TryFrom<FlashSaleRow> for FlashSale {
    type Error = StoreError;
    fn try_from(r: FlashSaleRow) -> Result<Self, Self::Error> {
        let status = r.status.parse().map_err(|e| corrupt("flash_sales", r.id, e))?;
        Ok(FlashSale { id: r.id, name: r.name, status, start_time: r.start_time, end_time: r.end_time, created_at: r.created_at })
    }
}

impl From<FlashSaleProductRow> for FlashSaleProduct {
    fn from(r: FlashSaleProductRow) -> Self {
        FlashSaleProduct { flash_sale_id: r.flash_sale_id, product_id: r.product_id, flash_sale_price: r.flash_sale_price, stock_limit: r.stock_limit }
    }
}

impl TryFrom<CouponRow> for Coupon {
    type Error = StoreError;
    fn try_from(r: CouponRow) -> Result<Self, Self::Error> {
        Ok(Coupon {
            coupon_type: r.coupon_type.parse().map_err(|e| corrupt("coupons", r.id, e))?,
            status: r.status.parse().map_err(|e| corrupt("coupons", r.id, e))?,
            id: r.id, code: r.code, name: r.name, discount_value: r.discount_value,
            max_discount: r.max_discount, min_purchase: r.min_purchase,
            max_usage_count: r.max_usage_count, max_usage_per_user: r.max_usage_per_user,
            valid_from: r.valid_from, valid_until: r.valid_until,
            for_retail: r.for_retail, for_reseller: r.for_reseller,
            usage_count: r.usage_count, created_at: r.created_at,
        })
    }
}

impl TryFrom<ZoneRow> for ShippingZone {
    type Error = StoreError;
    fn try_from(r: ZoneRow) -> Result<Self, Self::Error> {
        Ok(ShippingZone {
            status: r.status.parse().map_err(|e| corrupt("shipping_zones", r.id, e))?,
            id: r.id, name: r.name, regions: r.regions, excluded_regions: r.excluded_regions,
            rates: CarrierRates { jne: r.jne_rate, jnt: r.jnt_rate, sicepat: r.sicepat_rate, pos: r.pos_rate },
            minimum_cost: r.minimum_cost, handling_fee: r.handling_fee,
            free_shipping_enabled: r.free_shipping_enabled, free_shipping_threshold: r.free_shipping_threshold,
            created_at: r.created_at,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>("SELECT id, name, price, category, weight_kg, created_at FROM products WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(Product::from))
    }

    async fn get_variant(&self, id: Uuid) -> Result<Option<ProductVariant>, StoreError> {
        let row = sqlx::query_as::<_, VariantRow>("SELECT id, product_id, size, color, price, stock FROM product_variants WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await?;
        Ok(row.map(ProductVariant::from))
    }
}

#[async_trait]
impl FlashSaleStore for PgStore {
    async fn list_active_sales(&self) -> Result<Vec<FlashSale>, StoreError> {
        sqlx::query_as::<_, FlashSaleRow>("SELECT id, name, status, start_time, end_time, created_at FROM flash_sales WHERE status = 'active' ORDER BY start_time")
            .fetch_all(&self.pool).await?
            .into_iter().map(FlashSale::try_from).collect()
    }

    async fn list_sale_products(&self, sale_id: Uuid) -> Result<Vec<FlashSaleProduct>, StoreError> {
        let rows = sqlx::query_as::<_, FlashSaleProductRow>("SELECT flash_sale_id, product_id, flash_sale_price, stock_limit FROM flash_sale_products WHERE flash_sale_id = $1")
            .bind(sale_id).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(FlashSaleProduct::from).collect())
    }
}

const COUPON_COLUMNS: &str = "id, code, name, coupon_type, discount_value, max_discount, min_purchase, max_usage_count, max_usage_per_user, valid_from, valid_until, for_retail, for_reseller, usage_count, status, created_at";

#[async_trait]
impl CouponStore for PgStore {
    async fn get_by_code(&self, code: &str) -> Result<Option<Coupon>, StoreError> {
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1");
        sqlx::query_as::<_, CouponRow>(&sql).bind(code).fetch_optional(&self.pool).await?
            .map(Coupon::try_from).transpose()
    }

    async fn count_user_usage(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64, StoreError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
            .bind(coupon_id).bind(user_id).fetch_one(&self.pool).await?;
        Ok(count)
    }

    async fn record_usage(&self, usage: CouponUsage) -> Result<Redemption, StoreError> {
        let mut tx = self.pool.begin().await?;
        // Row lock serialises concurrent redeemers of the same coupon until commit.
        let sql = format!("SELECT {COUPON_COLUMNS} FROM coupons WHERE id = $1 FOR UPDATE");
        let Some(row) = sqlx::query_as::<_, CouponRow>(&sql).bind(usage.coupon_id).fetch_optional(&mut *tx).await? else {
            tx.rollback().await?;
            return Ok(Redemption::CouponMissing);
        };
        let coupon = Coupon::try_from(row)?;
        let (user_usage,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM coupon_usages WHERE coupon_id = $1 AND user_id = $2")
            .bind(usage.coupon_id).bind(usage.user_id).fetch_one(&mut *tx).await?;

        let verdict = match coupon.max_usage_count {
            Some(max) if coupon.usage_count >= max => Err(crate::IneligibleReason::UsageLimitReached),
            _ => coupon.check_user_usage(user_usage),
        };
        if let Err(reason) = verdict {
            tx.rollback().await?;
            return Ok(Redemption::Rejected(reason));
        }

        sqlx::query("INSERT INTO coupon_usages (id, coupon_id, user_id, order_id, discount_amount, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(usage.id).bind(usage.coupon_id).bind(usage.user_id).bind(usage.order_id).bind(usage.discount_amount).bind(usage.created_at)
            .execute(&mut *tx).await?;
        let (usage_count,): (i32,) = sqlx::query_as("UPDATE coupons SET usage_count = usage_count + 1, updated_at = NOW() WHERE id = $1 RETURNING usage_count")
            .bind(usage.coupon_id).fetch_one(&mut *tx).await?;
        tx.commit().await?;
        Ok(Redemption::Recorded { usage, usage_count })
    }
}

#[async_trait]
impl ShippingZoneStore for PgStore {
    async fn list_active_zones(&self) -> Result<Vec<ShippingZone>, StoreError> {
        sqlx::query_as::<_, ZoneRow>("SELECT id, name, status, regions, excluded_regions, jne_rate, jnt_rate, sicepat_rate, pos_rate, minimum_cost, handling_fee, free_shipping_enabled, free_shipping_threshold, created_at FROM shipping_zones WHERE status = 'active' ORDER BY created_at DESC")
            .fetch_all(&self.pool).await?
            .into_iter().map(ShippingZone::try_from).collect()
    }
}

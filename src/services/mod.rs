//! Pricing services and the facade the API layer calls.
pub mod coupon;
pub mod flash_sale;
pub mod order_summary;
pub mod pricing;
pub mod shipping;

use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use crate::clock::Clock;
use crate::config::PricingConfig;
use crate::ports::{CatalogStore, CouponStore, FlashSaleStore, ShippingZoneStore};
use crate::Result;

pub use coupon::{CouponValidation, CouponValidator, RecordedUsage};
pub use flash_sale::{FlashOverride, FlashSaleResolver};
pub use order_summary::{CouponRequest, LineItemRequest, OrderSummary, OrderSummaryAggregator, OrderSummaryRequest, ShippingDestination};
pub use pricing::{PriceCalculationRequest, PriceCalculationResponse, PriceCalculator};
pub use shipping::{ShippingCalculationRequest, ShippingCalculationResponse, ShippingRateResolver};

#[derive(Clone)]
pub struct PricingService {
    pricing: Arc<PriceCalculator>,
    shipping: Arc<ShippingRateResolver>,
    coupons: Arc<CouponValidator>,
    orders: OrderSummaryAggregator,
}

impl PricingService {
    /// Wires every component to one store that serves all four ports.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, config: PricingConfig) -> Self
    where
        S: CatalogStore + FlashSaleStore + CouponStore + ShippingZoneStore,
    {
        Self::from_parts(store.clone(), store.clone(), store.clone(), store, clock, config)
    }

    pub fn from_parts(
        catalog: Arc<dyn CatalogStore>,
        flash_sales: Arc<dyn FlashSaleStore>,
        coupons: Arc<dyn CouponStore>,
        zones: Arc<dyn ShippingZoneStore>,
        clock: Arc<dyn Clock>,
        config: PricingConfig,
    ) -> Self {
        let tax_rate_percent = config.tax_rate_percent;
        let pricing = Arc::new(PriceCalculator::new(catalog, FlashSaleResolver::new(flash_sales, clock.clone())));
        let shipping = Arc::new(ShippingRateResolver::new(zones, config));
        let coupons = Arc::new(CouponValidator::new(coupons, clock));
        let orders = OrderSummaryAggregator::new(pricing.clone(), shipping.clone(), coupons.clone(), tax_rate_percent);
        Self { pricing, shipping, coupons, orders }
    }

    pub async fn calculate_price(&self, req: &PriceCalculationRequest) -> Result<PriceCalculationResponse> {
        self.pricing.calculate(req).await
    }

    pub async fn calculate_shipping_cost(&self, req: &ShippingCalculationRequest) -> Result<ShippingCalculationResponse> {
        self.shipping.calculate(req).await
    }

    pub async fn check_free_shipping(&self, order_amount: Decimal, region_code: &str) -> Result<bool> {
        self.shipping.is_free_shipping(order_amount, region_code).await
    }

    pub async fn calculate_order_summary(&self, req: &OrderSummaryRequest) -> Result<OrderSummary> {
        self.orders.summarize(req).await
    }

    pub async fn validate_and_apply_coupon(&self, summary: OrderSummary, req: &CouponRequest) -> Result<OrderSummary> {
        self.orders.apply_coupon(summary, req).await
    }

    pub async fn validate_coupon(&self, code: &str, user_id: Uuid, purchase_amount: Decimal, customer_type: &str) -> Result<CouponValidation> {
        self.coupons.validate_with_discount(code, user_id, purchase_amount, customer_type).await
    }

    pub async fn record_coupon_usage(&self, coupon_id: Uuid, user_id: Uuid, order_id: Uuid, discount_amount: Decimal) -> Result<RecordedUsage> {
        self.coupons.record_usage(coupon_id, user_id, order_id, discount_amount).await
    }
}

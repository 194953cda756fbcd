//! Order summary: line items, shipping, tax and an optional coupon.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use crate::domain::value_objects::{percent_of, CustomerType, DiscountType};
use crate::services::coupon::CouponValidator;
use crate::services::pricing::{PriceCalculationRequest, PriceCalculationResponse, PriceCalculator};
use crate::services::shipping::{ShippingCalculationRequest, ShippingCalculationResponse, ShippingRateResolver};
use crate::{PricingError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LineItemRequest {
    pub product_id: Uuid,
    #[serde(default)]
    pub variant_id: Option<Uuid>,
    pub quantity: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ShippingDestination {
    pub region_code: String,
    pub carrier: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OrderSummaryRequest {
    pub items: Vec<LineItemRequest>,
    pub shipping: ShippingDestination,
    pub customer_type: CustomerType,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub coupon_code: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CouponRequest {
    pub code: String,
    pub user_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub items: Vec<PriceCalculationResponse>,
    pub item_count: u32,
    pub customer_type: CustomerType,
    /// Sum of undiscounted line totals.
    pub subtotal: Decimal,
    /// Sum of per-item discounts. Coupon discount is kept apart.
    pub total_discount: Decimal,
    pub total_weight_kg: Decimal,
    pub shipping: ShippingCalculationResponse,
    pub shipping_cost: Decimal,
    pub free_shipping: bool,
    pub tax_rate_percent: Decimal,
    pub tax: Decimal,
    pub coupon_applied: bool,
    pub coupon_code: Option<String>,
    pub coupon_discount: Decimal,
    /// Order-level discount tag; `coupon` once a coupon is applied.
    pub discount_type: DiscountType,
    pub total: Decimal,
}

impl OrderSummary {
    /// Amount coupons are validated and computed against. `None` if it does not fit.
    pub fn net_amount(&self) -> Option<Decimal> { self.subtotal.checked_sub(self.total_discount) }
}

#[derive(Clone)]
pub struct OrderSummaryAggregator {
    pricing: Arc<PriceCalculator>,
    shipping: Arc<ShippingRateResolver>,
    coupons: Arc<CouponValidator>,
    tax_rate_percent: Decimal,
}

impl OrderSummaryAggregator {
    pub fn new(pricing: Arc<PriceCalculator>, shipping: Arc<ShippingRateResolver>, coupons: Arc<CouponValidator>, tax_rate_percent: Decimal) -> Self {
        Self { pricing, shipping, coupons, tax_rate_percent }
    }

    /// Fails on the first item or shipping error; no partial summary is produced.
    pub async fn summarize(&self, req: &OrderSummaryRequest) -> Result<OrderSummary> {
        if req.items.is_empty() {
            return Err(PricingError::invalid("order has no line items"));
        }
        if req.coupon_code.is_some() && req.user_id.is_none() {
            return Err(PricingError::invalid("user_id is required to apply a coupon"));
        }

        let mut items = Vec::with_capacity(req.items.len());
        let (mut subtotal, mut total_discount, mut total_weight, mut item_count) = (Decimal::ZERO, Decimal::ZERO, Decimal::ZERO, 0u32);
        for item in &req.items {
            let priced = self.pricing.calculate(&PriceCalculationRequest {
                product_id: item.product_id,
                variant_id: item.variant_id,
                quantity: item.quantity,
                customer_type: req.customer_type,
            }).await?;
            subtotal = subtotal.checked_add(priced.total_base_price).ok_or_else(out_of_range)?;
            total_discount = total_discount.checked_add(priced.total_discount).ok_or_else(out_of_range)?;
            total_weight = priced.unit_weight_kg.checked_mul(Decimal::from(priced.quantity))
                .and_then(|w| total_weight.checked_add(w))
                .ok_or_else(out_of_range)?;
            item_count = item_count.saturating_add(priced.quantity);
            items.push(priced);
        }

        let net = subtotal.checked_sub(total_discount).ok_or_else(out_of_range)?;
        let shipping = self.shipping.calculate(&ShippingCalculationRequest {
            region_code: req.shipping.region_code.clone(),
            carrier: req.shipping.carrier.clone(),
            weight_kg: total_weight,
            order_amount: Some(net),
        }).await?;
        let shipping_cost = shipping.payable();
        let tax = percent_of(net, self.tax_rate_percent).ok_or_else(out_of_range)?;
        let total = net.checked_add(shipping_cost).and_then(|t| t.checked_add(tax)).ok_or_else(out_of_range)?;

        let summary = OrderSummary {
            items,
            item_count,
            customer_type: req.customer_type,
            subtotal,
            total_discount,
            total_weight_kg: total_weight,
            free_shipping: shipping.free_shipping,
            shipping,
            shipping_cost,
            tax_rate_percent: self.tax_rate_percent,
            tax,
            coupon_applied: false,
            coupon_code: None,
            coupon_discount: Decimal::ZERO,
            discount_type: DiscountType::None,
            total,
        };
        tracing::debug!(items = summary.items.len(), %subtotal, total = %summary.total, "order summarized");

        match (&req.coupon_code, req.user_id) {
            (Some(code), Some(user_id)) => self.apply_coupon(summary, &CouponRequest { code: code.clone(), user_id }).await,
            _ => Ok(summary),
        }
    }

    /// Validates the coupon against the summary's net amount and subtracts its discount
    /// from the total. Tax is not recomputed.
    pub async fn apply_coupon(&self, mut summary: OrderSummary, req: &CouponRequest) -> Result<OrderSummary> {
        if summary.coupon_applied {
            return Err(PricingError::invalid("a coupon is already applied to this order"));
        }
        let net = summary.net_amount().ok_or_else(out_of_range)?;
        let coupon = self.coupons.validate(&req.code, req.user_id, net, summary.customer_type.as_str()).await?;
        let discount = self.coupons.calculate_discount(&coupon, net)?;

        summary.total = summary.total.checked_sub(discount).ok_or_else(out_of_range)?;
        summary.coupon_applied = true;
        summary.coupon_code = Some(coupon.code);
        summary.coupon_discount = discount;
        summary.discount_type = DiscountType::Coupon;
        Ok(summary)
    }
}

fn out_of_range() -> PricingError {
    PricingError::invalid("order amount out of range")
}

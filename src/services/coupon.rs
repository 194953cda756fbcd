//! Coupon eligibility, discount and redemption

use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use crate::clock::Clock;
use crate::domain::aggregates::{Coupon, CouponUsage};
use crate::domain::events::{CouponEvent, DomainEvent};
use crate::domain::value_objects::{CouponCode, CouponCodeError, CustomerType};
use crate::ports::{CouponStore, Redemption};
use crate::{PricingError, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CouponValidation {
    pub coupon: Coupon,
    pub discount_amount: Decimal,
}

#[derive(Clone, Debug)]
pub struct RecordedUsage {
    pub usage: CouponUsage,
    pub usage_count: i32,
    pub event: DomainEvent,
}

#[derive(Clone)]
pub struct CouponValidator {
    store: Arc<dyn CouponStore>,
    clock: Arc<dyn Clock>,
}

impl CouponValidator {
    pub fn new(store: Arc<dyn CouponStore>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

    /// Returns the coupon if every rule passes. The coupon is not marked as used.
    ///
    /// `customer_type` is taken raw: anything other than `retail` or `reseller` fails the
    /// customer-type rule in its usual place rather than up front.
    pub async fn validate(&self, code: &str, user_id: Uuid, purchase_amount: Decimal, customer_type: &str) -> Result<Coupon> {
        let code = match CouponCode::new(code) {
            Ok(code) => code,
            // No stored code can be longer, so this is an unknown code.
            Err(CouponCodeError::TooLong) => return Err(PricingError::not_found("coupon")),
            Err(e) => return Err(PricingError::invalid(e.to_string())),
        };
        if purchase_amount.is_sign_negative() {
            return Err(PricingError::invalid("purchase amount must not be negative"));
        }
        let coupon = self.store.get_by_code(code.as_str()).await?
            .ok_or_else(|| PricingError::not_found("coupon"))?;
        let customer_type = customer_type.parse::<CustomerType>().ok();
        if let Err(reason) = coupon.check_eligibility(self.clock.now(), purchase_amount, customer_type) {
            tracing::debug!(%code, ?reason, "coupon rejected");
            return Err(PricingError::Ineligible(reason));
        }
        let used = self.store.count_user_usage(coupon.id, user_id).await?;
        if let Err(reason) = coupon.check_user_usage(used) {
            tracing::debug!(%code, %user_id, ?reason, "coupon rejected");
            return Err(PricingError::Ineligible(reason));
        }
        Ok(coupon)
    }

    pub fn calculate_discount(&self, coupon: &Coupon, purchase_amount: Decimal) -> Result<Decimal> {
        coupon.calculate_discount(purchase_amount)
            .ok_or_else(|| PricingError::invalid(format!("purchase amount {purchase_amount} out of range")))
    }

    /// Validates and prices in one step.
    pub async fn validate_with_discount(&self, code: &str, user_id: Uuid, purchase_amount: Decimal, customer_type: &str) -> Result<CouponValidation> {
        let coupon = self.validate(code, user_id, purchase_amount, customer_type).await?;
        let discount_amount = self.calculate_discount(&coupon, purchase_amount)?;
        Ok(CouponValidation { coupon, discount_amount })
    }

    /// Appends the ledger row and bumps the usage counter atomically.
    pub async fn record_usage(&self, coupon_id: Uuid, user_id: Uuid, order_id: Uuid, discount_amount: Decimal) -> Result<RecordedUsage> {
        if discount_amount.is_sign_negative() {
            return Err(PricingError::invalid("discount amount must not be negative"));
        }
        let usage = CouponUsage::new(coupon_id, user_id, order_id, discount_amount);
        match self.store.record_usage(usage).await? {
            Redemption::Recorded { usage, usage_count } => {
                tracing::info!(%coupon_id, %user_id, %order_id, %discount_amount, usage_count, "coupon redeemed");
                let event = DomainEvent::Coupon(CouponEvent::Redeemed {
                    coupon_id, user_id, order_id, discount_amount, redeemed_at: usage.created_at,
                });
                Ok(RecordedUsage { usage, usage_count, event })
            }
            Redemption::CouponMissing => Err(PricingError::not_found(format!("coupon {coupon_id}"))),
            Redemption::Rejected(reason) => {
                tracing::warn!(%coupon_id, %user_id, ?reason, "redemption refused at write time");
                Err(PricingError::Ineligible(reason))
            }
        }
    }
}

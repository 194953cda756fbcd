//! Coupon aggregate and its usage ledger

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::flash_sale::UnknownStatus;
use crate::domain::value_objects::{percent_of, CustomerType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    Percentage,
    Fixed,
}

impl CouponType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Percentage => "percentage", Self::Fixed => "fixed" }
    }
}

impl FromStr for CouponType {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(Self::Percentage),
            "fixed" => Ok(Self::Fixed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CouponStatus {
    Active,
    #[default]
    Inactive,
}

impl CouponStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive" }
    }
}

impl FromStr for CouponStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Why a coupon was turned down. Variants are listed in evaluation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IneligibleReason {
    Inactive,
    NotYetValid,
    Expired,
    BelowMinimumPurchase,
    CustomerTypeNotAllowed,
    UsageLimitReached,
    UserLimitReached,
}

impl fmt::Display for IneligibleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Inactive => "coupon is not active",
            Self::NotYetValid => "coupon is not valid yet",
            Self::Expired => "coupon has expired",
            Self::BelowMinimumPurchase => "purchase amount is below the coupon minimum",
            Self::CustomerTypeNotAllowed => "coupon is not available for this customer type",
            Self::UsageLimitReached => "coupon usage limit reached",
            Self::UserLimitReached => "coupon usage limit for this user reached",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub coupon_type: CouponType,
    pub discount_value: Decimal,
    /// Only meaningful for percentage coupons.
    pub max_discount: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    pub max_usage_count: Option<i32>,
    pub max_usage_per_user: Option<i32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub for_retail: bool,
    pub for_reseller: bool,
    pub usage_count: i32,
    pub status: CouponStatus,
    pub created_at: DateTime<Utc>,
}

/// One redemption. Rows are append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CouponUsage {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub discount_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn percentage(code: impl Into<String>, percent: Decimal) -> Self { Self::create(code, CouponType::Percentage, percent) }
    pub fn fixed(code: impl Into<String>, amount: Decimal) -> Self { Self::create(code, CouponType::Fixed, amount) }

    fn create(code: impl Into<String>, coupon_type: CouponType, discount_value: Decimal) -> Self {
        let code = code.into();
        Self {
            id: Uuid::now_v7(), name: code.clone(), code, coupon_type, discount_value,
            max_discount: None, min_purchase: None, max_usage_count: None, max_usage_per_user: None,
            valid_from: None, valid_until: None, for_retail: true, for_reseller: true,
            usage_count: 0, status: CouponStatus::Active, created_at: Utc::now(),
        }
    }

    /// Runs every rule that needs no ledger lookup, stopping at the first failure.
    /// `customer_type` is `None` when the caller supplied an unrecognised classification.
    pub fn check_eligibility(&self, now: DateTime<Utc>, purchase_amount: Decimal, customer_type: Option<CustomerType>) -> Result<(), IneligibleReason> {
        if self.status != CouponStatus::Active { return Err(IneligibleReason::Inactive); }
        if self.valid_from.is_some_and(|from| now < from) { return Err(IneligibleReason::NotYetValid); }
        if self.valid_until.is_some_and(|until| now > until) { return Err(IneligibleReason::Expired); }
        if self.min_purchase.is_some_and(|min| purchase_amount < min) { return Err(IneligibleReason::BelowMinimumPurchase); }
        if !self.allows(customer_type) { return Err(IneligibleReason::CustomerTypeNotAllowed); }
        if self.max_usage_count.is_some_and(|max| self.usage_count >= max) { return Err(IneligibleReason::UsageLimitReached); }
        Ok(())
    }

    pub fn check_user_usage(&self, user_usage_count: i64) -> Result<(), IneligibleReason> {
        match self.max_usage_per_user {
            Some(max) if user_usage_count >= i64::from(max) => Err(IneligibleReason::UserLimitReached),
            _ => Ok(()),
        }
    }

    fn allows(&self, customer_type: Option<CustomerType>) -> bool {
        match customer_type {
            Some(CustomerType::Retail) => self.for_retail,
            Some(CustomerType::Reseller) => self.for_reseller,
            None => false,
        }
    }

    /// Discount this coupon grants on `purchase_amount`. `None` if the percentage overflows.
    pub fn calculate_discount(&self, purchase_amount: Decimal) -> Option<Decimal> {
        match self.coupon_type {
            CouponType::Percentage => {
                let amount = percent_of(purchase_amount, self.discount_value)?;
                Some(match self.max_discount {
                    Some(cap) if amount > cap => cap,
                    _ => amount,
                })
            }
            CouponType::Fixed => Some(self.discount_value.min(purchase_amount)),
        }
    }
}

impl CouponUsage {
    pub fn new(coupon_id: Uuid, user_id: Uuid, order_id: Uuid, discount_amount: Decimal) -> Self {
        Self { id: Uuid::now_v7(), coupon_id, user_id, order_id, discount_amount, created_at: Utc::now() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn d(v: i64) -> Decimal { Decimal::from(v) }

    #[test]
    fn checks_run_in_order() {
        let now = Utc::now();
        let mut c = Coupon::percentage("HEMAT", d(10));
        c.status = CouponStatus::Inactive;
        c.valid_until = Some(now - Duration::days(1));
        c.min_purchase = Some(d(500_000));
        assert_eq!(c.check_eligibility(now, d(1), Some(CustomerType::Retail)), Err(IneligibleReason::Inactive));
        c.status = CouponStatus::Active;
        assert_eq!(c.check_eligibility(now, d(1), Some(CustomerType::Retail)), Err(IneligibleReason::Expired));
        c.valid_until = None;
        assert_eq!(c.check_eligibility(now, d(1), Some(CustomerType::Retail)), Err(IneligibleReason::BelowMinimumPurchase));
        assert_eq!(c.check_eligibility(now, d(500_000), Some(CustomerType::Retail)), Ok(()));
    }

    #[test]
    fn validity_window() {
        let now = Utc::now();
        let mut c = Coupon::fixed("WINDOW", d(5_000));
        c.valid_from = Some(now + Duration::hours(1));
        assert_eq!(c.check_eligibility(now, d(10), Some(CustomerType::Retail)), Err(IneligibleReason::NotYetValid));
        c.valid_from = Some(now);
        c.valid_until = Some(now);
        assert_eq!(c.check_eligibility(now, d(10), Some(CustomerType::Retail)), Ok(()));
    }

    #[test]
    fn customer_type_flags() {
        let now = Utc::now();
        let mut c = Coupon::fixed("RESELLER", d(5_000));
        c.for_retail = false;
        assert_eq!(c.check_eligibility(now, d(10), Some(CustomerType::Retail)), Err(IneligibleReason::CustomerTypeNotAllowed));
        assert_eq!(c.check_eligibility(now, d(10), Some(CustomerType::Reseller)), Ok(()));
        assert_eq!(c.check_eligibility(now, d(10), None), Err(IneligibleReason::CustomerTypeNotAllowed));
    }

    #[test]
    fn usage_caps() {
        let now = Utc::now();
        let mut c = Coupon::fixed("CAP", d(5_000));
        c.max_usage_count = Some(3);
        c.usage_count = 3;
        assert_eq!(c.check_eligibility(now, d(10), Some(CustomerType::Retail)), Err(IneligibleReason::UsageLimitReached));
        c.max_usage_per_user = Some(1);
        assert_eq!(c.check_user_usage(0), Ok(()));
        assert_eq!(c.check_user_usage(1), Err(IneligibleReason::UserLimitReached));
    }

    #[test]
    fn percentage_discount_is_capped() {
        let mut c = Coupon::percentage("PCT", d(20));
        assert_eq!(c.calculate_discount(d(100_000)), Some(d(20_000)));
        c.max_discount = Some(d(15_000));
        assert_eq!(c.calculate_discount(d(100_000)), Some(d(15_000)));
        assert_eq!(c.calculate_discount(d(50_000)), Some(d(10_000)));
    }

    #[test]
    fn fixed_discount_never_exceeds_purchase() {
        let c = Coupon::fixed("FIX", d(25_000));
        assert_eq!(c.calculate_discount(d(100_000)), Some(d(25_000)));
        assert_eq!(c.calculate_discount(d(10_000)), Some(d(10_000)));
    }

    #[test]
    fn oversized_percentage_base_reports_overflow() {
        let c = Coupon::percentage("BESAR", d(50));
        assert_eq!(c.calculate_discount(Decimal::MAX), None);
    }
}

//! Domain events
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    Coupon(CouponEvent),
}

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CouponEvent {
    Redeemed { coupon_id: Uuid, user_id: Uuid, order_id: Uuid, discount_amount: Decimal, redeemed_at: DateTime<Utc> },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Coupon(CouponEvent::Redeemed { .. }) => "ecommerce.coupon.redeemed",
        }
    }
}

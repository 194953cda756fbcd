//! Flash sale entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashSaleStatus {
    #[default]
    Draft,
    Upcoming,
    Active,
    Ended,
}

impl FlashSaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Draft => "draft", Self::Upcoming => "upcoming", Self::Active => "active", Self::Ended => "ended" }
    }
}

impl FromStr for FlashSaleStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "upcoming" => Ok(Self::Upcoming),
            "active" => Ok(Self::Active),
            "ended" => Ok(Self::Ended),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct UnknownStatus(pub String);
impl std::error::Error for UnknownStatus {}
impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown status '{}'", self.0) }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlashSale {
    pub id: Uuid,
    pub name: String,
    pub status: FlashSaleStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Enrollment of a product in a sale, with its override price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlashSaleProduct {
    pub flash_sale_id: Uuid,
    pub product_id: Uuid,
    pub flash_sale_price: Decimal,
    pub stock_limit: i32,
}

impl FlashSale {
    pub fn new(name: impl Into<String>, status: FlashSaleStatus, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), name: name.into(), status, start_time, end_time, created_at: Utc::now() }
    }

    /// Status alone lags the clock, so the window is checked as well. Both bounds are inclusive.
    pub fn is_currently_active(&self, now: DateTime<Utc>) -> bool {
        self.status == FlashSaleStatus::Active && self.start_time <= now && now <= self.end_time
    }
}

//! Value Objects for pricing

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Scale of every rounded monetary amount.
pub const MONEY_SCALE: u32 = 2;

/// Rounds a derived amount to [`MONEY_SCALE`] places, midpoint away from zero.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// `percent` per cent of `amount`, rounded. `None` when the product overflows.
pub fn percent_of(amount: Decimal, percent: Decimal) -> Option<Decimal> {
    amount.checked_mul(percent).map(|v| round_money(v / Decimal::ONE_HUNDRED))
}

/// Buyer classification that selects the quantity discount schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomerType {
    Retail,
    Reseller,
}

impl CustomerType {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Retail => "retail", Self::Reseller => "reseller" }
    }
}

impl FromStr for CustomerType {
    type Err = CustomerTypeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retail" => Ok(Self::Retail),
            "reseller" => Ok(Self::Reseller),
            other => Err(CustomerTypeError(other.to_string())),
        }
    }
}

impl fmt::Display for CustomerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub struct CustomerTypeError(pub String);
impl std::error::Error for CustomerTypeError {}
impl fmt::Display for CustomerTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "unknown customer type '{}'", self.0) }
}

/// Shipping carrier. Unknown names resolve to the default carrier (JNE).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Carrier {
    #[default]
    Jne,
    Jnt,
    Sicepat,
    Pos,
}

impl Carrier {
    pub const ALL: [Carrier; 4] = [Carrier::Jne, Carrier::Jnt, Carrier::Sicepat, Carrier::Pos];

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "jnt" | "j&t" | "jt" => Self::Jnt,
            "sicepat" => Self::Sicepat,
            "pos" | "pos_indonesia" => Self::Pos,
            _ => Self::Jne,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self { Self::Jne => "jne", Self::Jnt => "jnt", Self::Sicepat => "sicepat", Self::Pos => "pos" }
    }
}

impl fmt::Display for Carrier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Coupon code. Matching is exact and case-sensitive, so no normalisation happens here.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CouponCode(String);

impl CouponCode {
    pub const MAX_LEN: usize = 64;

    pub fn new(value: impl Into<String>) -> Result<Self, CouponCodeError> {
        let value = value.into();
        if value.trim().is_empty() { return Err(CouponCodeError::Empty); }
        if value.len() > Self::MAX_LEN { return Err(CouponCodeError::TooLong); }
        Ok(Self(value))
    }
    pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for CouponCode {
    type Error = CouponCodeError;
    fn try_from(value: String) -> Result<Self, Self::Error> { Self::new(value) }
}

impl From<CouponCode> for String {
    fn from(code: CouponCode) -> Self { code.0 }
}

impl fmt::Display for CouponCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum CouponCodeError { Empty, TooLong }
impl std::error::Error for CouponCodeError {}
impl fmt::Display for CouponCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Empty => write!(f, "coupon code empty"), Self::TooLong => write!(f, "coupon code too long") }
    }
}

/// Strictly positive line-item quantity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: i64) -> Result<Self, QuantityError> {
        if value <= 0 { return Err(QuantityError::NotPositive(value)); }
        u32::try_from(value).map(Self).map_err(|_| QuantityError::TooLarge(value))
    }
    pub fn value(&self) -> u32 { self.0 }
    pub fn as_decimal(&self) -> Decimal { Decimal::from(self.0) }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum QuantityError { NotPositive(i64), TooLarge(i64) }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPositive(v) => write!(f, "quantity must be positive, got {v}"),
            Self::TooLarge(v) => write!(f, "quantity {v} out of range"),
        }
    }
}

/// Tag describing which rule produced a price.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[default]
    None,
    Bulk,
    Reseller,
    FlashSale,
    Coupon,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Bulk => "bulk",
            Self::Reseller => "reseller",
            Self::FlashSale => "flash_sale",
            Self::Coupon => "coupon",
        }
    }
}

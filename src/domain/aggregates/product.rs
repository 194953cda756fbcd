//! Catalog entities as seen by the pricing engine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub category: Option<String>,
    /// Shipping weight of one unit, in kilograms.
    pub weight_kg: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A size/color variant. When it carries its own price, that price supersedes
/// the parent product's base price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductVariant {
    pub id: Uuid,
    pub product_id: Uuid,
    pub size: Option<String>,
    pub color: Option<String>,
    pub price: Option<Decimal>,
    pub stock: i32,
}

impl Product {
    pub fn new(name: impl Into<String>, price: Decimal, weight_kg: Decimal) -> Self {
        Self { id: Uuid::now_v7(), name: name.into(), price, category: None, weight_kg, created_at: Utc::now() }
    }

    /// Unit price before any discount, honouring the variant override.
    pub fn base_price(&self, variant: Option<&ProductVariant>) -> Decimal {
        variant.and_then(|v| v.price).unwrap_or(self.price)
    }
}

impl ProductVariant {
    pub fn new(product_id: Uuid, price: Option<Decimal>) -> Self {
        Self { id: Uuid::now_v7(), product_id, size: None, color: None, price, stock: 0 }
    }

    pub fn belongs_to(&self, product_id: Uuid) -> bool { self.product_id == product_id }
}

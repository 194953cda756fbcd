//! Flash sale window resolution

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use crate::clock::Clock;
use crate::ports::FlashSaleStore;
use crate::Result;

/// An override price that applies right now.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlashOverride {
    pub flash_sale_id: Uuid,
    pub price: Decimal,
    pub ends_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct FlashSaleResolver {
    store: Arc<dyn FlashSaleStore>,
    clock: Arc<dyn Clock>,
}

impl FlashSaleResolver {
    pub fn new(store: Arc<dyn FlashSaleStore>, clock: Arc<dyn Clock>) -> Self { Self { store, clock } }

    /// First sale, in store order, that is open now and lists `product_id`.
    /// A product enrolled in several open sales gets whichever is met first.
    pub async fn active_override(&self, product_id: Uuid) -> Result<Option<FlashOverride>> {
        let now = self.clock.now();
        for sale in self.store.list_active_sales().await? {
            if !sale.is_currently_active(now) {
                tracing::debug!(sale_id = %sale.id, "flash sale marked active outside its window, skipping");
                continue;
            }
            let products = self.store.list_sale_products(sale.id).await?;
            if let Some(entry) = products.into_iter().find(|p| p.product_id == product_id) {
                return Ok(Some(FlashOverride { flash_sale_id: sale.id, price: entry.flash_sale_price, ends_at: sale.end_time }));
            }
        }
        Ok(None)
    }
}

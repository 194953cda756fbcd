//! Shipping zone resolution and weight-based rates

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use crate::config::PricingConfig;
use crate::domain::aggregates::ShippingZone;
use crate::domain::value_objects::{round_money, Carrier};
use crate::ports::ShippingZoneStore;
use crate::{PricingError, Result};

#[derive(Clone, Debug, Deserialize)]
pub struct ShippingCalculationRequest {
    pub region_code: String,
    /// Free-form carrier name; unknown names are rated as JNE.
    pub carrier: String,
    pub weight_kg: Decimal,
    /// When present, the free-shipping policy is evaluated against it.
    #[serde(default)]
    pub order_amount: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingCalculationResponse {
    pub region_code: String,
    pub carrier: Carrier,
    pub zone_id: Option<Uuid>,
    pub zone_name: Option<String>,
    pub used_default_rates: bool,
    pub weight_kg: Decimal,
    pub rate_per_kg: Decimal,
    pub minimum_cost: Decimal,
    pub handling_fee: Decimal,
    /// Cost before any free-shipping waiver.
    pub shipping_cost: Decimal,
    pub free_shipping: bool,
}

impl ShippingCalculationResponse {
    /// What the customer pays for shipping.
    pub fn payable(&self) -> Decimal {
        if self.free_shipping { Decimal::ZERO } else { self.shipping_cost }
    }
}

/// Breakdown of [`ShippingRateResolver::cost`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShippingQuote {
    pub rate_per_kg: Decimal,
    pub minimum_cost: Decimal,
    pub handling_fee: Decimal,
    pub cost: Decimal,
}

#[derive(Clone)]
pub struct ShippingRateResolver {
    store: Arc<dyn ShippingZoneStore>,
    config: PricingConfig,
}

impl ShippingRateResolver {
    pub fn new(store: Arc<dyn ShippingZoneStore>, config: PricingConfig) -> Self { Self { store, config } }

    /// First active zone, newest first, that covers `region_code`.
    pub async fn resolve(&self, region_code: &str) -> Result<Option<ShippingZone>> {
        let mut zones = self.store.list_active_zones().await?;
        zones.retain(|z| z.is_active());
        zones.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(zones.into_iter().find(|z| z.covers(region_code)))
    }

    /// `max(weight * rate, minimum) + handling`. Without a zone the configured defaults
    /// apply and there is no handling fee.
    pub fn cost(&self, weight_kg: Decimal, carrier: Carrier, zone: Option<&ShippingZone>) -> Result<ShippingQuote> {
        let (rate_per_kg, minimum_cost, handling_fee) = match zone {
            Some(z) => (z.rates.rate_for(carrier), z.minimum_cost, z.handling_fee),
            None => (self.config.default_rate(carrier), self.config.default_minimum_cost, Decimal::ZERO),
        };
        let cost = weight_kg.checked_mul(rate_per_kg)
            .and_then(|carried| round_money(carried).max(minimum_cost).checked_add(handling_fee))
            .ok_or_else(|| PricingError::invalid(format!("weight {weight_kg} kg out of range")))?;
        Ok(ShippingQuote { rate_per_kg, minimum_cost, handling_fee, cost })
    }

    /// False whenever no zone covers the region.
    pub async fn is_free_shipping(&self, order_amount: Decimal, region_code: &str) -> Result<bool> {
        Ok(self.resolve(region_code).await?.is_some_and(|z| z.grants_free_shipping(order_amount)))
    }

    pub async fn calculate(&self, req: &ShippingCalculationRequest) -> Result<ShippingCalculationResponse> {
        if req.weight_kg.is_sign_negative() {
            return Err(PricingError::invalid("weight must not be negative"));
        }
        if req.region_code.trim().is_empty() {
            return Err(PricingError::invalid("region code is required"));
        }
        let carrier = Carrier::from_name(&req.carrier);
        let zone = self.resolve(&req.region_code).await?;
        if zone.is_none() {
            tracing::debug!(region = %req.region_code, "no shipping zone, using default rates");
        }
        let quote = self.cost(req.weight_kg, carrier, zone.as_ref())?;
        let free_shipping = match (&zone, req.order_amount) {
            (Some(z), Some(amount)) => z.grants_free_shipping(amount),
            _ => false,
        };
        Ok(ShippingCalculationResponse {
            region_code: req.region_code.clone(),
            carrier,
            zone_id: zone.as_ref().map(|z| z.id),
            zone_name: zone.as_ref().map(|z| z.name.clone()),
            used_default_rates: zone.is_none(),
            weight_kg: req.weight_kg,
            rate_per_kg: quote.rate_per_kg,
            minimum_cost: quote.minimum_cost,
            handling_fee: quote.handling_fee,
            shipping_cost: quote.cost,
            free_shipping,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use crate::domain::aggregates::{CarrierRates, ZoneStatus};
    use crate::infrastructure::MemoryStore;

    fn d(v: i64) -> Decimal { Decimal::from(v) }

    fn rates(jne: i64) -> CarrierRates {
        CarrierRates { jne: d(jne), jnt: d(16_000), sicepat: d(14_000), pos: d(12_000) }
    }

    fn jakarta() -> ShippingZone {
        let mut zone = ShippingZone::new("Jabodetabek", &["31", "32.01", "36.03"], rates(15_000));
        zone.minimum_cost = d(9_000);
        zone.handling_fee = d(5_000);
        zone
    }

    fn resolver(store: &Arc<MemoryStore>) -> ShippingRateResolver {
        ShippingRateResolver::new(store.clone(), PricingConfig::default())
    }

    fn request(region: &str, carrier: &str, weight: Decimal) -> ShippingCalculationRequest {
        ShippingCalculationRequest { region_code: region.into(), carrier: carrier.into(), weight_kg: weight, order_amount: None }
    }

    #[tokio::test]
    async fn light_parcel_is_raised_to_minimum_plus_handling() {
        let store = Arc::new(MemoryStore::new());
        store.add_zone(jakarta()).await;
        let res = resolver(&store).calculate(&request("31", "jne", Decimal::new(2, 1))).await.unwrap();
        assert_eq!(res.shipping_cost, d(14_000));
        assert_eq!(res.rate_per_kg, d(15_000));
        assert!(!res.used_default_rates);
    }

    #[tokio::test]
    async fn heavy_parcel_pays_weight_rate_plus_handling_once() {
        let store = Arc::new(MemoryStore::new());
        store.add_zone(jakarta()).await;
        let res = resolver(&store).calculate(&request("31", "sicepat", Decimal::new(25, 1))).await.unwrap();
        assert_eq!(res.shipping_cost, d(35_000) + d(5_000));
    }

    #[tokio::test]
    async fn default_rates_without_zone() {
        let store = Arc::new(MemoryStore::new());
        let r = resolver(&store);
        let res = r.calculate(&request("91", "pos", d(3))).await.unwrap();
        assert!(res.used_default_rates);
        assert_eq!(res.shipping_cost, d(24_000));
        assert_eq!(res.handling_fee, Decimal::ZERO);

        let light = r.calculate(&request("91", "jne", Decimal::new(5, 1))).await.unwrap();
        assert_eq!(light.shipping_cost, d(10_000));

        let unknown = r.calculate(&request("91", "anteraja", d(2))).await.unwrap();
        assert_eq!(unknown.carrier, Carrier::Jne);
        assert_eq!(unknown.shipping_cost, d(20_000));
    }

    #[tokio::test]
    async fn exclusion_beats_inclusion() {
        let store = Arc::new(MemoryStore::new());
        let mut zone = jakarta();
        zone.excluded_regions = vec!["31".into()];
        store.add_zone(zone).await;
        assert!(resolver(&store).resolve("31").await.unwrap().is_none());
        assert!(resolver(&store).resolve("32.01").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn newest_matching_zone_wins_and_inactive_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        let mut old = jakarta();
        old.created_at = Utc::now() - Duration::days(30);
        let mut newer = ShippingZone::new("Jakarta Pusat", &["31"], rates(20_000));
        newer.created_at = Utc::now() - Duration::days(1);
        let mut newest = ShippingZone::new("Disabled", &["31"], rates(1));
        newest.status = ZoneStatus::Inactive;
        for z in [old, newer.clone(), newest] {
            store.add_zone(z).await;
        }
        assert_eq!(resolver(&store).resolve("31").await.unwrap().map(|z| z.id), Some(newer.id));
    }

    #[tokio::test]
    async fn free_shipping_checks() {
        let store = Arc::new(MemoryStore::new());
        let mut zone = jakarta();
        zone.free_shipping_enabled = true;
        zone.free_shipping_threshold = d(250_000);
        store.add_zone(zone).await;
        let r = resolver(&store);
        assert!(r.is_free_shipping(d(250_000), "31").await.unwrap());
        assert!(!r.is_free_shipping(d(249_999), "31").await.unwrap());
        assert!(!r.is_free_shipping(d(1_000_000), "94").await.unwrap());

        let mut req = request("31", "jne", d(1));
        req.order_amount = Some(d(300_000));
        let res = r.calculate(&req).await.unwrap();
        assert!(res.free_shipping);
        assert_eq!(res.payable(), Decimal::ZERO);
        assert_eq!(res.shipping_cost, d(20_000));
    }

    #[tokio::test]
    async fn rejects_negative_weight() {
        let store = Arc::new(MemoryStore::new());
        let err = resolver(&store).calculate(&request("31", "jne", d(-1))).await.unwrap_err();
        assert!(matches!(err, PricingError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn absurd_weight_is_invalid_not_a_panic() {
        let store = Arc::new(MemoryStore::new());
        store.add_zone(jakarta()).await;
        let r = resolver(&store);
        let huge = Decimal::from_i128_with_scale(10_i128.pow(25), 0);
        let err = r.calculate(&request("31", "jne", huge)).await.unwrap_err();
        assert!(matches!(err, PricingError::InvalidArgument(_)));
        let err = r.calculate(&request("91", "jne", huge)).await.unwrap_err();
        assert!(matches!(err, PricingError::InvalidArgument(_)));
    }
}

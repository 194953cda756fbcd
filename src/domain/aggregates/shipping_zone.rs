//! Shipping zone aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::aggregates::flash_sale::UnknownStatus;
use crate::domain::value_objects::Carrier;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneStatus {
    #[default]
    Active,
    Inactive,
}

impl ZoneStatus {
    pub fn as_str(&self) -> &'static str {
        match self { Self::Active => "active", Self::Inactive => "inactive" }
    }
}

impl FromStr for ZoneStatus {
    type Err = UnknownStatus;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "inactive" => Ok(Self::Inactive),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Per-kilogram rate for each carrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarrierRates {
    pub jne: Decimal,
    pub jnt: Decimal,
    pub sicepat: Decimal,
    pub pos: Decimal,
}

impl CarrierRates {
    pub fn rate_for(&self, carrier: Carrier) -> Decimal {
        match carrier {
            Carrier::Jne => self.jne,
            Carrier::Jnt => self.jnt,
            Carrier::Sicepat => self.sicepat,
            Carrier::Pos => self.pos,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShippingZone {
    pub id: Uuid,
    pub name: String,
    pub status: ZoneStatus,
    pub regions: Vec<String>,
    pub excluded_regions: Vec<String>,
    pub rates: CarrierRates,
    pub minimum_cost: Decimal,
    pub handling_fee: Decimal,
    pub free_shipping_enabled: bool,
    pub free_shipping_threshold: Decimal,
    pub created_at: DateTime<Utc>,
}

impl ShippingZone {
    pub fn new(name: impl Into<String>, regions: &[&str], rates: CarrierRates) -> Self {
        Self {
            id: Uuid::now_v7(), name: name.into(), status: ZoneStatus::Active,
            regions: regions.iter().map(|r| r.to_string()).collect(), excluded_regions: vec![],
            rates, minimum_cost: Decimal::ZERO, handling_fee: Decimal::ZERO,
            free_shipping_enabled: false, free_shipping_threshold: Decimal::ZERO, created_at: Utc::now(),
        }
    }

    /// Exclusion wins over inclusion.
    pub fn covers(&self, region_code: &str) -> bool {
        self.regions.iter().any(|r| r == region_code) && !self.excluded_regions.iter().any(|r| r == region_code)
    }

    pub fn is_active(&self) -> bool { self.status == ZoneStatus::Active }

    pub fn grants_free_shipping(&self, order_amount: Decimal) -> bool {
        self.free_shipping_enabled && order_amount >= self.free_shipping_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rates() -> CarrierRates {
        CarrierRates { jne: Decimal::from(15_000), jnt: Decimal::from(16_000), sicepat: Decimal::from(14_000), pos: Decimal::from(12_000) }
    }

    #[test]
    fn exclusion_overrides_inclusion() {
        let mut zone = ShippingZone::new("Jabodetabek", &["31", "32", "36"], rates());
        zone.excluded_regions = vec!["32".into()];
        assert!(zone.covers("31"));
        assert!(!zone.covers("32"));
        assert!(!zone.covers("51"));
    }

    #[test]
    fn free_shipping_needs_flag_and_threshold() {
        let mut zone = ShippingZone::new("Jawa", &["33"], rates());
        zone.free_shipping_threshold = Decimal::from(300_000);
        assert!(!zone.grants_free_shipping(Decimal::from(500_000)));
        zone.free_shipping_enabled = true;
        assert!(zone.grants_free_shipping(Decimal::from(300_000)));
        assert!(!zone.grants_free_shipping(Decimal::from(299_999)));
    }

    #[test]
    fn rate_lookup_by_carrier() {
        assert_eq!(rates().rate_for(Carrier::Sicepat), Decimal::from(14_000));
        assert_eq!(rates().rate_for(Carrier::from_name("unknown")), Decimal::from(15_000));
    }
}

//! Service configuration, read from the environment (and `.env` via dotenvy in `main`).

use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use crate::domain::aggregates::CarrierRates;
use crate::domain::value_objects::Carrier;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub db_max_connections: u32,
    pub pricing: PricingConfig,
}

/// Constants of the pricing rules. `Default` carries the production values.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    pub tax_rate_percent: Decimal,
    /// Rates used when no shipping zone covers the destination.
    pub default_rates: CarrierRates,
    pub default_minimum_cost: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate_percent: Decimal::from(11),
            default_rates: CarrierRates {
                jne: Decimal::from(10_000),
                jnt: Decimal::from(11_000),
                sicepat: Decimal::from(9_000),
                pos: Decimal::from(8_000),
            },
            default_minimum_cost: Decimal::from(10_000),
        }
    }
}

impl PricingConfig {
    pub fn default_rate(&self, carrier: Carrier) -> Decimal { self.default_rates.rate_for(carrier) }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let mut pricing = PricingConfig::default();
        if let Some(rate) = parse::<Decimal>(&get, "PRICING_TAX_RATE_PERCENT")? {
            if rate.is_sign_negative() {
                return Err(ConfigError::Invalid { name: "PRICING_TAX_RATE_PERCENT", value: rate.to_string() });
            }
            pricing.tax_rate_percent = rate;
        }
        Ok(Self {
            database_url,
            port: parse(&get, "PORT")?.unwrap_or(8083),
            nats_url: get("NATS_URL").filter(|url| !url.is_empty()),
            db_max_connections: parse(&get, "DB_MAX_CONNECTIONS")?.unwrap_or(10),
            pricing,
        })
    }
}

fn parse<T: FromStr>(get: &impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, ConfigError> {
    match get(name) {
        None => Ok(None),
        Some(value) => value.trim().parse().map(Some).map_err(|_| ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_source(source(&[("DATABASE_URL", "postgres://localhost/shop")])).unwrap();
        assert_eq!(cfg.port, 8083);
        assert_eq!(cfg.db_max_connections, 10);
        assert_eq!(cfg.nats_url, None);
        assert_eq!(cfg.pricing.tax_rate_percent, Decimal::from(11));
        assert_eq!(cfg.pricing.default_rate(Carrier::Jne), Decimal::from(10_000));
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = Config::from_source(source(&[
            ("DATABASE_URL", "postgres://db/shop"),
            ("PORT", "9000"),
            ("NATS_URL", "nats://localhost:4222"),
            ("PRICING_TAX_RATE_PERCENT", "12.5"),
        ])).unwrap();
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.nats_url.as_deref(), Some("nats://localhost:4222"));
        assert_eq!(cfg.pricing.tax_rate_percent, Decimal::new(125, 1));
    }

    #[test]
    fn missing_and_invalid_values() {
        assert_eq!(Config::from_source(source(&[])).unwrap_err(), ConfigError::Missing("DATABASE_URL"));
        let err = Config::from_source(source(&[("DATABASE_URL", "x"), ("PORT", "eighty")])).unwrap_err();
        assert_eq!(err, ConfigError::Invalid { name: "PORT", value: "eighty".into() });
    }
}

//! OpenSASE Pricing Engine
//!
//! Price, discount and shipping resolution for the OpenSASE e-commerce platform.
//!
//! ## Features
//! - Flash sale override prices with a clock-checked sale window
//! - Reseller volume tiering and retail bulk discounts
//! - Coupon eligibility, discount calculation and capped redemption
//! - Zone-based shipping rates with free-shipping thresholds
//! - Order summaries combining items, shipping, tax and coupons

pub mod api;
pub mod clock;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod ports;
pub mod services;

use thiserror::Error;

pub use domain::aggregates::IneligibleReason;
pub use ports::StoreError;
pub use services::PricingService;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Carries the failing rule, but renders the same message for every rule.
    #[error("coupon not found or not applicable")]
    Ineligible(IneligibleReason),

    #[error("Upstream failure: {0}")]
    Upstream(#[from] StoreError),
}

impl PricingError {
    pub fn not_found(what: impl Into<String>) -> Self { Self::NotFound(what.into()) }
    pub fn invalid(msg: impl Into<String>) -> Self { Self::InvalidArgument(msg.into()) }

    /// Coupon rejections are indistinguishable from a missing coupon to callers
    /// that only look at this flag.
    pub fn is_not_found_equivalent(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Ineligible(_))
    }

    pub fn ineligible_reason(&self) -> Option<IneligibleReason> {
        match self { Self::Ineligible(reason) => Some(*reason), _ => None }
    }
}

pub type Result<T> = std::result::Result<T, PricingError>;

//! Aggregates module
pub mod product;
pub mod flash_sale;
pub mod coupon;
pub mod shipping_zone;

pub use product::{Product, ProductVariant};
pub use flash_sale::{FlashSale, FlashSaleProduct, FlashSaleStatus, UnknownStatus};
pub use coupon::{Coupon, CouponStatus, CouponType, CouponUsage, IneligibleReason};
pub use shipping_zone::{CarrierRates, ShippingZone, ZoneStatus};

//! HTTP surface for pricing inquiries and checkout.

use axum::{extract::{Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use validator::Validate;
use crate::domain::aggregates::CouponUsage;
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::CustomerType;
use crate::services::{
    CouponRequest, CouponValidation, LineItemRequest, OrderSummary, OrderSummaryRequest, PriceCalculationRequest,
    PriceCalculationResponse, PricingService, ShippingCalculationRequest, ShippingCalculationResponse, ShippingDestination,
};
use crate::PricingError;

#[derive(Clone)] pub struct AppState { pub pricing: PricingService, pub nats: Option<async_nats::Client> }

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "opensase-pricing"})) }))
        .route("/api/v1/pricing/calculate", post(calculate_price))
        .route("/api/v1/shipping/calculate", post(calculate_shipping))
        .route("/api/v1/shipping/free", get(check_free_shipping))
        .route("/api/v1/orders/summary", post(order_summary))
        .route("/api/v1/orders/summary/coupon", post(apply_coupon))
        .route("/api/v1/coupons/validate", post(validate_coupon))
        .route("/api/v1/coupons/usage", post(record_usage))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

fn reject(e: PricingError) -> (StatusCode, String) {
    match e {
        PricingError::NotFound(_) | PricingError::Ineligible(_) => (StatusCode::NOT_FOUND, e.to_string()),
        PricingError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, e.to_string()),
        PricingError::Upstream(err) => {
            tracing::error!(error = %err, "store failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
        }
    }
}

fn check<T: Validate>(body: &T) -> ApiResult<()> {
    body.validate().map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PriceBody {
    pub product_id: Uuid,
    pub variant_id: Option<Uuid>,
    #[validate(range(min = 1))]
    pub quantity: i64,
    pub customer_type: CustomerType,
}

async fn calculate_price(State(s): State<AppState>, Json(r): Json<PriceBody>) -> ApiResult<Json<PriceCalculationResponse>> {
    check(&r)?;
    let req = PriceCalculationRequest { product_id: r.product_id, variant_id: r.variant_id, quantity: r.quantity, customer_type: r.customer_type };
    s.pricing.calculate_price(&req).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ShippingBody {
    #[validate(length(min = 1, max = 32))]
    pub region_code: String,
    #[serde(default)]
    pub carrier: String,
    pub weight_kg: Decimal,
    pub order_amount: Option<Decimal>,
}

async fn calculate_shipping(State(s): State<AppState>, Json(r): Json<ShippingBody>) -> ApiResult<Json<ShippingCalculationResponse>> {
    check(&r)?;
    let req = ShippingCalculationRequest { region_code: r.region_code, carrier: r.carrier, weight_kg: r.weight_kg, order_amount: r.order_amount };
    s.pricing.calculate_shipping_cost(&req).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct FreeShippingParams { pub order_amount: Decimal, pub region_code: String }
#[derive(Debug, Serialize)] pub struct FreeShippingResponse { pub region_code: String, pub order_amount: Decimal, pub free_shipping: bool }

async fn check_free_shipping(State(s): State<AppState>, Query(p): Query<FreeShippingParams>) -> ApiResult<Json<FreeShippingResponse>> {
    let free_shipping = s.pricing.check_free_shipping(p.order_amount, &p.region_code).await.map_err(reject)?;
    Ok(Json(FreeShippingResponse { region_code: p.region_code, order_amount: p.order_amount, free_shipping }))
}

#[derive(Debug, Deserialize, Validate)]
pub struct OrderSummaryBody {
    #[validate(length(min = 1, max = 200))]
    pub items: Vec<LineItemRequest>,
    pub region_code: String,
    #[serde(default)]
    pub carrier: String,
    pub customer_type: CustomerType,
    pub user_id: Option<Uuid>,
    pub coupon_code: Option<String>,
}

async fn order_summary(State(s): State<AppState>, Json(r): Json<OrderSummaryBody>) -> ApiResult<Json<OrderSummary>> {
    check(&r)?;
    let req = OrderSummaryRequest {
        items: r.items,
        shipping: ShippingDestination { region_code: r.region_code, carrier: r.carrier },
        customer_type: r.customer_type,
        user_id: r.user_id,
        coupon_code: r.coupon_code.filter(|c| !c.is_empty()),
    };
    s.pricing.calculate_order_summary(&req).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ApplyCouponBody {
    pub summary: OrderSummary,
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub user_id: Uuid,
}

async fn apply_coupon(State(s): State<AppState>, Json(r): Json<ApplyCouponBody>) -> ApiResult<Json<OrderSummary>> {
    check(&r)?;
    let req = CouponRequest { code: r.code, user_id: r.user_id };
    s.pricing.validate_and_apply_coupon(r.summary, &req).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize, Validate)]
pub struct ValidateCouponBody {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub user_id: Uuid,
    pub purchase_amount: Decimal,
    pub customer_type: String,
}

async fn validate_coupon(State(s): State<AppState>, Json(r): Json<ValidateCouponBody>) -> ApiResult<Json<CouponValidation>> {
    check(&r)?;
    s.pricing.validate_coupon(&r.code, r.user_id, r.purchase_amount, &r.customer_type).await.map(Json).map_err(reject)
}

#[derive(Debug, Deserialize)] pub struct RecordUsageBody { pub coupon_id: Uuid, pub user_id: Uuid, pub order_id: Uuid, pub discount_amount: Decimal }

async fn record_usage(State(s): State<AppState>, Json(r): Json<RecordUsageBody>) -> ApiResult<(StatusCode, Json<CouponUsage>)> {
    let recorded = s.pricing.record_coupon_usage(r.coupon_id, r.user_id, r.order_id, r.discount_amount).await.map_err(|e| match e {
        PricingError::Ineligible(reason) => (StatusCode::CONFLICT, reason.to_string()),
        other => reject(other),
    })?;
    if let Some(nats) = &s.nats { publish(nats, &recorded.event).await; }
    Ok((StatusCode::CREATED, Json(recorded.usage)))
}

async fn publish(nats: &async_nats::Client, event: &DomainEvent) {
    let payload = match serde_json::to_vec(event) {
        Ok(p) => p,
        Err(e) => { tracing::warn!(error = %e, "event serialization failed"); return; }
    };
    if let Err(e) = nats.publish(event.subject().to_string(), payload.into()).await {
        tracing::warn!(error = %e, subject = event.subject(), "event publish failed");
    }
}

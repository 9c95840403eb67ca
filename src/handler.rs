//! HTTP request handlers for the coupon API
//!
//! Handlers are thin: they pull the caller identity and payload out of the
//! request, call into [`CouponService`](crate::service::CouponService) with
//! the current time, and shape the JSON response. Errors are turned into
//! responses by [`Error`]'s `IntoResponse` implementation.

use axum::{
    extract::{FromRequest, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde_json::json;

use crate::database::AppState;
use crate::error::Error;
use crate::middleware::AuthUser;
use crate::model::{AnalyticsResponse, ApplyRequest, Coupon, CouponInput, ValidateRequest};
use crate::service::Validation;

/// `Json` body extractor whose rejections are reported as JSON `400`s
#[derive(FromRequest)]
#[from_request(via(Json), rejection(Error))]
pub struct JsonBody<T>(pub T);

/// Lists currently valid coupons
///
/// `GET /api/coupons`
///
/// - **200 OK** - Coupons ordered by priority, newest first among equals
pub async fn list_active_coupons(
    State(state): State<AppState>,
) -> Result<Json<Vec<Coupon>>, Error> {
    let coupons = state.coupons.list_active(Utc::now())?;
    Ok(Json(coupons))
}

/// Previews a coupon against an order
///
/// `POST /api/coupons/validate`
///
/// # Request Body
///
/// ```json
/// { "code": "SAVE10", "orderValue": 2000, "products": [], "paymentMethod": "card" }
/// ```
///
/// # Response
///
/// - **200 OK** - `{"valid": true, "coupon": {...}, "discountAmount": 200, "finalAmount": 1800}`
/// - **404 Not Found** - `{"valid": false, "message": "Invalid coupon code"}`
/// - **400 Bad Request** - `{"valid": false, "message": ...}` for any other rule
pub async fn validate_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ValidateRequest>,
) -> Result<Response, Error> {
    let outcome = state.coupons.validate(
        &payload.code,
        payload.order_value,
        &user.id,
        payload.payment_method.as_deref(),
        Utc::now(),
    )?;

    let response = match outcome {
        Validation::Valid(success) => Json(json!({
            "valid": true,
            "coupon": success.coupon,
            "discountAmount": success.discount_amount,
            "finalAmount": success.final_amount
        }))
        .into_response(),
        Validation::Invalid(reason) => (
            reason.status(),
            Json(json!({
                "valid": false,
                "message": reason.to_string()
            })),
        )
            .into_response(),
    };

    Ok(response)
}

/// Records a redemption when an order is placed
///
/// `POST /api/coupons/apply`
///
/// # Response
///
/// - **200 OK** - Redemption recorded
/// - **404 Not Found** - No active coupon with this code
/// - **400 Bad Request** - Global usage limit reached in the meantime
pub async fn apply_coupon(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    JsonBody(payload): JsonBody<ApplyRequest>,
) -> Result<Json<serde_json::Value>, Error> {
    state.coupons.apply(
        &payload.code,
        &user.id,
        payload.order_value,
        payload.discount_applied,
        Utc::now(),
    )?;

    Ok(Json(json!({ "message": "Coupon applied successfully" })))
}

/// Lists the coupons the caller can still redeem
///
/// `GET /api/coupons/user/available`
pub async fn list_available_coupons(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Coupon>>, Error> {
    let coupons = state
        .coupons
        .list_available_for_user(&user.id, Utc::now())?;
    Ok(Json(coupons))
}

/// Creates a coupon (admin)
///
/// `POST /api/coupons`
///
/// - **201 Created** - The stored document
/// - **400 Bad Request** - Payload failed its checks
/// - **409 Conflict** - Code already in use
pub async fn create_coupon(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CouponInput>,
) -> Result<impl IntoResponse, Error> {
    let coupon = state.coupons.create(payload, Utc::now())?;
    Ok((StatusCode::CREATED, Json(coupon)))
}

/// Replaces a coupon's editable fields (admin)
///
/// `PUT /api/coupons/{id}`
pub async fn update_coupon(
    Path(id): Path<String>,
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CouponInput>,
) -> Result<Json<Coupon>, Error> {
    let coupon = state.coupons.update(&id, payload, Utc::now())?;
    Ok(Json(coupon))
}

/// Redemption analytics of one coupon (admin)
///
/// `GET /api/coupons/analytics/{id}`
pub async fn coupon_analytics(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, Error> {
    let (coupon, analytics) = state.coupons.analytics(&id)?;
    Ok(Json(AnalyticsResponse { coupon, analytics }))
}

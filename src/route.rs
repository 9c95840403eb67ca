//! Route definitions for the coupon API
//!
//! This module configures all HTTP routes, attaches the identity and admin
//! middleware to the routes that need them, and injects the shared state.

use axum::middleware;
use axum::routing::{get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    apply_coupon, coupon_analytics, create_coupon, list_active_coupons, list_available_coupons,
    update_coupon, validate_coupon,
};
use crate::middleware::{require_admin, require_user};

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /api/coupons` - Currently valid coupons (public)
/// - `POST /api/coupons` - Create a coupon (admin)
/// - `POST /api/coupons/validate` - Preview a coupon against an order (user)
/// - `POST /api/coupons/apply` - Record a redemption (user)
/// - `GET /api/coupons/user/available` - Coupons the caller can still use (user)
/// - `PUT /api/coupons/{id}` - Replace a coupon's fields (admin)
/// - `GET /api/coupons/analytics/{id}` - Redemption analytics (admin)
///
/// # Example Usage
///
/// ```no_run
/// # use coupons::database::{init_db, AppState};
/// # use coupons::route::create_app;
/// # let db = init_db("coupons.db").unwrap();
/// let state = AppState::new(db, None);
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let user = middleware::from_fn(require_user);
    let admin = middleware::from_fn_with_state(state.clone(), require_admin);

    let api_routes = Router::new()
        .route(
            "/coupons",
            get(list_active_coupons).merge(
                post(create_coupon)
                    .route_layer(admin.clone())
                    .route_layer(user.clone()),
            ),
        )
        .route(
            "/coupons/validate",
            post(validate_coupon).route_layer(user.clone()),
        )
        .route("/coupons/apply", post(apply_coupon).route_layer(user.clone()))
        .route(
            "/coupons/user/available",
            get(list_available_coupons).route_layer(user.clone()),
        )
        .route(
            "/coupons/{id}",
            put(update_coupon)
                .route_layer(admin.clone())
                .route_layer(user.clone()),
        )
        .route(
            "/coupons/analytics/{id}",
            get(coupon_analytics).route_layer(admin).route_layer(user),
        );

    Router::new()
        // Mount API routes under /api
        .nest("/api", api_routes)
        .with_state(state)
}

use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post, put},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::state::SharedState;

pub mod auth;
mod catalog;
mod error;
mod observability;
mod orders;
mod payment;
mod shipping;
mod system;
mod types;
mod validation;

pub use error::ApiError;
pub use types::*;

use crate::services::{BookingService, IdentityService, LifecycleService};
use metrics_exporter_prometheus::PrometheusHandle;

#[derive(Clone)]
pub struct AppState {
    pub shared: Arc<SharedState>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Arc<Config> {
        &self.shared.config
    }

    #[must_use]
    pub fn store(&self) -> &crate::db::Store {
        &self.shared.store
    }

    #[must_use]
    pub fn razorpay(&self) -> &Arc<crate::clients::razorpay::RazorpayClient> {
        &self.shared.razorpay
    }

    #[must_use]
    pub fn booking_service(&self) -> &Arc<dyn BookingService> {
        &self.shared.booking_service
    }

    #[must_use]
    pub fn lifecycle_service(&self) -> &Arc<dyn LifecycleService> {
        &self.shared.lifecycle_service
    }

    #[must_use]
    pub fn identity_service(&self) -> &Arc<dyn IdentityService> {
        &self.shared.identity_service
    }
}

#[must_use]
pub fn create_app_state(
    shared: Arc<SharedState>,
    prometheus_handle: Option<PrometheusHandle>,
) -> Arc<AppState> {
    Arc::new(AppState {
        shared,
        start_time: std::time::Instant::now(),
        prometheus_handle,
    })
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    Ok(create_app_state(shared, prometheus_handle))
}

#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config().server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    // The webhook authenticates through its signature, the auth routes
    // exist to mint tokens, and health stays open for probes. Everything
    // else requires a bearer token.
    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/send-otp", post(auth::send_otp))
        .route("/auth/verify-otp", post(auth::verify_otp))
        .route("/auth/google-login", post(auth::google_login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/payment/webhook", post(payment::payment_webhook))
        .route("/health", get(system::health))
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .layer(middleware::from_fn(observability::security_headers_middleware))
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/categories", post(catalog::create_category))
        .route("/categories/{id}", get(catalog::get_category))
        .route("/categories/{id}", put(catalog::update_category))
        .route("/categories/{id}", delete(catalog::delete_category))
        .route(
            "/categories/{id}/subcategories",
            get(catalog::list_subcategories),
        )
        .route("/items", get(catalog::list_items))
        .route("/items", post(catalog::create_item))
        .route("/items/{id}", get(catalog::get_item))
        .route("/items/{id}", put(catalog::update_item))
        .route("/items/{id}", delete(catalog::delete_item))
        .route("/items/{id}/images", post(catalog::add_item_image))
        .route(
            "/items/{id}/images/{image_id}",
            delete(catalog::delete_item_image),
        )
        .route("/orders/quote", post(orders::quote_order))
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}/complete", post(orders::complete_order))
        .route("/payment/create", post(payment::create_payment))
        .route(
            "/orders/{id}/create-shipment",
            post(shipping::create_shipment),
        )
        // Both spellings predate this rewrite; storefront builds differ on
        // which one they call.
        .route("/orders/{id}/track", get(shipping::track_shipment))
        .route("/orders/{id}/track-shipment", get(shipping::track_shipment))
        .route("/orders/{id}/create-return", post(shipping::create_return))
        .route("/metrics", get(observability::get_metrics))
        .route_layer(middleware::from_fn_with_state(state, auth::auth_middleware))
}

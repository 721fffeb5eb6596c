use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::{ApiError, ApiResponse, AppState};
use crate::services::{ShipmentInfo, TrackingReport};

/// POST /orders/{id}/create-shipment
/// Books the forward shipment; also the retry path when the automatic
/// attempt after payment capture failed
pub async fn create_shipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ShipmentInfo>>, ApiError> {
    let order = super::orders::load_order_scoped(&state, &user, id).await?;
    let info = state.lifecycle_service().create_shipment(order.id).await?;

    Ok(Json(ApiResponse::success(info)))
}

/// POST /orders/{id}/create-return
pub async fn create_return(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<ShipmentInfo>>, ApiError> {
    let order = super::orders::load_order_scoped(&state, &user, id).await?;
    let info = state.lifecycle_service().request_return(order.id).await?;

    Ok(Json(ApiResponse::success(info)))
}

/// GET /orders/{id}/track-shipment
pub async fn track_shipment(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<TrackingReport>>, ApiError> {
    let order = super::orders::load_order_scoped(&state, &user, id).await?;
    let report = state.lifecycle_service().track(order.id).await?;

    Ok(Json(ApiResponse::success(report)))
}

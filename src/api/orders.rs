use axum::{
    Extension, Json,
    extract::{Path, State},
};
use std::sync::Arc;

use super::auth::CurrentUser;
use super::types::{CreateOrderRequest, MessageResponse, OrderDto};
use super::{ApiError, ApiResponse, AppState, validation};
use crate::entities::orders;
use crate::services::{DraftLine, OrderDraft, Quote};

/// Loads an order visible to the caller. Someone else's order reads as
/// absent, not as forbidden.
pub(super) async fn load_order_scoped(
    state: &AppState,
    user: &CurrentUser,
    order_id: i32,
) -> Result<orders::Model, ApiError> {
    let order_id = validation::validate_order_id(order_id)?;
    let order = state
        .store()
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::order_not_found(order_id))?;

    if order.user_id != user.0.id && !user.0.is_admin {
        return Err(ApiError::order_not_found(order_id));
    }
    Ok(order)
}

fn draft_from(payload: CreateOrderRequest) -> OrderDraft {
    OrderDraft {
        start_date: payload.start_date,
        end_date: payload.end_date,
        lines: payload
            .items
            .into_iter()
            .map(|line| DraftLine {
                item_id: line.item_id,
                size: line.size,
                quantity: line.quantity,
            })
            .collect(),
    }
}

/// POST /orders/quote
/// Price a draft without persisting anything
pub async fn quote_order(
    State(state): State<Arc<AppState>>,
    Extension(_user): Extension<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<Quote>>, ApiError> {
    let quote = state
        .booking_service()
        .validate_and_quote(&draft_from(payload))
        .await?;

    Ok(Json(ApiResponse::success(quote)))
}

/// POST /orders
/// Validate and persist a pending order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<Json<ApiResponse<OrderDto>>, ApiError> {
    let placed = state
        .booking_service()
        .create_order(user.0.id, &draft_from(payload))
        .await?;

    Ok(Json(ApiResponse::success(OrderDto::from_parts(
        placed.order,
        placed.lines,
    ))))
}

/// GET /orders
/// Own orders; administrators see every order
pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<ApiResponse<Vec<OrderDto>>>, ApiError> {
    let orders = if user.0.is_admin {
        state.store().list_all_orders().await?
    } else {
        state.store().list_orders_for_user(user.0.id).await?
    };

    let ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let mut lines = state.store().order_lines_batch(&ids).await?;

    Ok(Json(ApiResponse::success(
        orders
            .into_iter()
            .map(|order| {
                let order_lines = lines.remove(&order.id).unwrap_or_default();
                OrderDto::from_parts(order, order_lines)
            })
            .collect(),
    )))
}

/// GET /orders/{id}
pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<OrderDto>>, ApiError> {
    let order = load_order_scoped(&state, &user, id).await?;
    let lines = state.store().order_lines(order.id).await?;

    Ok(Json(ApiResponse::success(OrderDto::from_parts(order, lines))))
}

/// POST /orders/{id}/complete
/// Administrative close-out once the garment is back and checked
pub async fn complete_order(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    user.require_admin()?;

    let id = validation::validate_order_id(id)?;
    state.lifecycle_service().complete_order(id).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: format!("Order {id} completed"),
    })))
}

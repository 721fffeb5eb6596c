use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::ActiveEnum;
use serde::{Deserialize, Serialize};

use crate::domain::{ShipmentPhase, SizeCode, parse_size_list, rental_days};
use crate::entities::{categories, item_images, items, order_items, orders};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// Catalog
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CategoryDto {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub parent_id: Option<i32>,
    pub image_url: Option<String>,
    pub created_at: String,
}

impl CategoryDto {
    #[must_use]
    pub fn from_model(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            parent_id: model.parent_id,
            image_url: model.image_url,
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemImageDto {
    pub id: i32,
    pub image_url: String,
    pub position: i32,
}

impl ItemImageDto {
    #[must_use]
    pub fn from_model(model: item_images::Model) -> Self {
        Self {
            id: model.id,
            image_url: model.image_url,
            position: model.position,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ItemDto {
    pub id: i32,
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sizes: Vec<SizeCode>,
    pub daily_rate: Decimal,
    pub security_deposit: Decimal,
    pub available: bool,
    pub images: Vec<ItemImageDto>,
    pub created_at: String,
}

impl ItemDto {
    /// A corrupt stored size list renders as empty rather than failing
    /// the whole listing.
    #[must_use]
    pub fn from_model(model: items::Model, images: Vec<item_images::Model>) -> Self {
        Self {
            id: model.id,
            category_id: model.category_id,
            name: model.name,
            description: model.description,
            sizes: parse_size_list(&model.sizes).unwrap_or_default(),
            daily_rate: model.daily_rate,
            security_deposit: model.security_deposit,
            available: model.available,
            images: images.into_iter().map(ItemImageDto::from_model).collect(),
            created_at: model.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    /// Derived from the name when omitted.
    pub slug: Option<String>,
    pub parent_id: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCategoryRequest {
    pub name: String,
    pub slug: Option<String>,
    pub parent_id: Option<i32>,
    pub image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sizes: Vec<SizeCode>,
    pub daily_rate: Decimal,
    pub security_deposit: Decimal,
    #[serde(default = "default_true")]
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub category_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub sizes: Vec<SizeCode>,
    pub daily_rate: Decimal,
    pub security_deposit: Decimal,
    pub available: bool,
}

#[derive(Debug, Deserialize)]
pub struct AddItemImageRequest {
    pub image_url: String,
    /// Appended after the existing images when omitted.
    pub position: Option<i32>,
}

const fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ListItemsQuery {
    pub category: Option<i32>,
    #[serde(default)]
    pub available: bool,
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Serialize)]
pub struct OrderLineDto {
    pub id: i32,
    pub item_id: i32,
    pub size: String,
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct OrderDto {
    pub id: i32,
    pub user_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub rental_days: i64,
    pub status: String,
    pub shipment_phase: ShipmentPhase,
    pub total_price: Decimal,
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,
    pub payment_order_id: Option<String>,
    pub shipping_order_id: Option<String>,
    pub shipment_id: Option<String>,
    pub return_order_id: Option<String>,
    pub return_shipment_id: Option<String>,
    pub items: Vec<OrderLineDto>,
    pub created_at: String,
}

impl OrderDto {
    #[must_use]
    pub fn from_parts(order: orders::Model, lines: Vec<order_items::Model>) -> Self {
        Self {
            id: order.id,
            user_id: order.user_id,
            start_date: order.start_date,
            end_date: order.end_date,
            rental_days: rental_days(order.start_date, order.end_date),
            status: order.status.to_value(),
            shipment_phase: ShipmentPhase::derive(
                order.shipment_id.is_some(),
                order.return_shipment_id.is_some(),
            ),
            total_price: order.total_price,
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone,
            shipping_address: order.shipping_address,
            payment_order_id: order.payment_order_id,
            shipping_order_id: order.shipping_order_id,
            shipment_id: order.shipment_id,
            return_order_id: order.return_order_id,
            return_shipment_id: order.return_shipment_id,
            items: lines
                .into_iter()
                .map(|line| OrderLineDto {
                    id: line.id,
                    item_id: line.item_id,
                    size: line.size,
                    quantity: line.quantity,
                })
                .collect(),
            created_at: order.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub item_id: i32,
    pub size: SizeCode,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub items: Vec<OrderLineRequest>,
}

// ============================================================================
// Payment
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct PaymentCreateRequest {
    pub order_id: i32,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct PaymentCreateResponse {
    pub payment_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub rental_total: Decimal,
    pub deposit_total: Decimal,
    /// Public gateway key the storefront checkout widget needs.
    pub key_id: String,
}

// ============================================================================
// Identity
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessTokenResponse {
    pub access_token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// System
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub database: String,
}

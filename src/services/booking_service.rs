//! Domain service for quoting and placing rental orders.
//!
//! All pricing and availability rules live behind this trait: inclusive
//! day counting, per-item overlap checks against pending and active
//! orders, and the rental-only total (deposits are quoted separately and
//! only added when payment is initiated).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::SizeCode;
use crate::entities::{order_items, orders};

/// Errors specific to booking operations. Input problems carry the ids
/// needed for field-level messages; availability failures name the item
/// that collided.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Order must contain at least one line")]
    EmptyOrder,

    #[error("Quantity must be positive for item {item_id}")]
    InvalidQuantity { item_id: i32 },

    #[error("Item not found: {item_id}")]
    ItemNotFound { item_id: i32 },

    #[error("Item {item_id} is not offered in size {size}")]
    InvalidSize { item_id: i32, size: String },

    #[error("End date must not be before start date")]
    InvalidDateRange,

    #[error("Item {item_id} is already booked for the requested dates")]
    ItemUnavailable { item_id: i32 },

    #[error("Order not found")]
    OrderNotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for BookingError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for BookingError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// One requested line of a draft order.
#[derive(Debug, Clone)]
pub struct DraftLine {
    pub item_id: i32,
    pub size: SizeCode,
    pub quantity: i32,
}

/// Customer's booking request before any persistence.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub lines: Vec<DraftLine>,
}

/// Priced line of a validated draft.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub item_id: i32,
    pub name: String,
    pub size: SizeCode,
    pub quantity: i32,
    pub daily_rate: Decimal,
    pub line_total: Decimal,
}

/// Immutable pricing summary for a validated draft. `total` covers rental
/// charges only; `deposit_total` is what the payment step adds on top.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub rental_days: i64,
    pub total: Decimal,
    pub deposit_total: Decimal,
    pub lines: Vec<QuoteLine>,
}

/// A persisted order together with its lines and the quote it was priced
/// from.
#[derive(Debug)]
pub struct PlacedOrder {
    pub order: orders::Model,
    pub lines: Vec<order_items::Model>,
    pub quote: Quote,
}

/// Domain service trait for the booking engine.
#[async_trait::async_trait]
pub trait BookingService: Send + Sync {
    /// Validates a draft and prices it without writing anything.
    ///
    /// Checks run in a fixed order so callers see the most fundamental
    /// problem first: line presence and quantities, then item existence
    /// and size membership, then the date range, then availability.
    async fn validate_and_quote(&self, draft: &OrderDraft) -> Result<Quote, BookingError>;

    /// Revalidates and persists the draft as a pending order. The
    /// availability check and the inserts share one serializable
    /// transaction, so two drafts racing for the same garment cannot both
    /// commit.
    async fn create_order(&self, user_id: i32, draft: &OrderDraft)
    -> Result<PlacedOrder, BookingError>;

    /// Re-derives the order total from its current lines, current item
    /// rates and the stored date range, persists it and returns it. Never
    /// trusts the stored total.
    async fn recompute_total(&self, order_id: i32) -> Result<Decimal, BookingError>;
}

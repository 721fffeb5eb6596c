//! Domain service for the post-booking order lifecycle.
//!
//! Covers payment initiation, the capture webhook transition, forward
//! and return shipment creation, carrier tracking and administrative
//! completion. Transitions are idempotent: replaying a capture event or
//! re-requesting a shipment converges on the same state instead of
//! failing or duplicating side effects.

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::domain::TrackingStatus;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Order not found")]
    OrderNotFound,

    #[error("Order is not awaiting payment")]
    NotPending,

    #[error("Order is not active")]
    NotActive,

    #[error("Order has no shipment yet")]
    ShipmentNotReady,

    #[error("Order has no contact details on file")]
    MissingContact,

    #[error("Payment gateway error: {0}")]
    Gateway(String),

    #[error("Shipping provider error: {0}")]
    Shipping(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for LifecycleError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for LifecycleError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Contact details captured when payment is initiated.
#[derive(Debug, Clone)]
pub struct PaymentContact {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Gateway handle the client needs to open the checkout flow. The charged
/// amount is the recomputed rental total plus the security deposits.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub payment_order_id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub rental_total: Decimal,
    pub deposit_total: Decimal,
}

/// Outcome of applying a payment-capture event.
#[derive(Debug, Clone, Serialize)]
pub struct ActivationReport {
    pub order_id: i32,
    /// False when the order was already active, the redelivered-webhook
    /// case.
    pub newly_activated: bool,
    /// False when shipment creation failed or was skipped; the shipment
    /// can be created later via the explicit endpoint.
    pub shipment_created: bool,
}

/// Identifiers of a shipment registered with the carrier.
#[derive(Debug, Clone, Serialize)]
pub struct ShipmentInfo {
    pub shipping_order_id: String,
    pub shipment_id: String,
}

/// Carrier tracking state mapped to the display vocabulary.
#[derive(Debug, Clone, Serialize)]
pub struct TrackingReport {
    pub status: TrackingStatus,
    /// Days until the estimated delivery date, when the carrier reported
    /// one in a parseable form. Never negative.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etd: Option<String>,
}

#[async_trait::async_trait]
pub trait LifecycleService: Send + Sync {
    /// Registers a gateway payment order for a pending rental order and
    /// stores the contact details the shipment will later use. The rental
    /// total is recomputed from current rates before charging; the
    /// security deposit is added on top of it at the gateway only.
    async fn initiate_payment(
        &self,
        order_id: i32,
        contact: PaymentContact,
    ) -> Result<PaymentIntent, LifecycleError>;

    /// Applies a confirmed capture event to the order owning the given
    /// gateway order id. Activation is a compare-and-set from pending, so
    /// a replayed event is a no-op. Forward shipment creation is then
    /// attempted; its failure is reported in the result, never as an
    /// error, and never reverts the activation.
    async fn apply_payment_captured(
        &self,
        payment_order_id: &str,
    ) -> Result<ActivationReport, LifecycleError>;

    /// Registers the forward shipment with the carrier. Returns the
    /// already-stored identifiers when one exists.
    async fn create_shipment(&self, order_id: i32) -> Result<ShipmentInfo, LifecycleError>;

    /// Registers the return pickup with the carrier. Requires the forward
    /// shipment to exist; returns the stored identifiers when called
    /// again.
    async fn request_return(&self, order_id: i32) -> Result<ShipmentInfo, LifecycleError>;

    /// Fetches the carrier's current view of the forward shipment.
    async fn track(&self, order_id: i32) -> Result<TrackingReport, LifecycleError>;

    /// Administrative transition from active to completed.
    async fn complete_order(&self, order_id: i32) -> Result<(), LifecycleError>;
}

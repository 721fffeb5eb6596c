use sea_orm::entity::prelude::*;

/// Processed gateway webhook deliveries. The unique event id makes
/// redelivered events a cheap duplicate-key lookup instead of a replayed
/// state transition.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "webhook_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Gateway-assigned delivery id (`x-razorpay-event-id` header).
    #[sea_orm(unique)]
    pub event_id: String,

    /// Event kind, e.g. "payment.captured".
    pub event: String,

    pub received_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Rental order lifecycle. `Pending` until the payment capture webhook
/// lands, `Active` for the rental window, `Completed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,

    /// First rental day, inclusive.
    pub start_date: Date,

    /// Last rental day, inclusive. Same day as `start_date` is a one-day
    /// rental.
    pub end_date: Date,

    pub status: OrderStatus,

    /// Rental charges only. The deposit is computed per quote and added to
    /// the gateway amount, never stored here.
    pub total_price: Decimal,

    // Contact block, captured when the payment order is created.
    pub customer_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub shipping_address: Option<String>,

    /// Gateway-side order id, set when payment is initiated.
    #[sea_orm(unique)]
    pub payment_order_id: Option<String>,

    // Forward shipment, set on payment capture (or via the retry endpoint).
    pub shipping_order_id: Option<String>,
    pub shipment_id: Option<String>,

    // Return shipment, set when the customer requests pickup.
    pub return_order_id: Option<String>,
    pub return_shipment_id: Option<String>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    User,
    #[sea_orm(has_many = "super::order_items::Entity")]
    Lines,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

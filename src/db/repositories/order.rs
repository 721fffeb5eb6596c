use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    IsolationLevel, JoinType, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::info;

use crate::entities::orders::OrderStatus;
use crate::entities::{order_items, orders, prelude::*};

/// Repository for rental orders and their lines.
pub struct OrderRepository {
    conn: DatabaseConnection,
}

/// One requested line of a draft order.
#[derive(Debug, Clone)]
pub struct NewOrderLine {
    pub item_id: i32,
    /// Size code as text, validated against the item's size set upstream.
    pub size: String,
    pub quantity: i32,
}

/// Contact block captured when payment is initiated.
#[derive(Debug, Clone)]
pub struct ContactInfo {
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub shipping_address: String,
}

/// Result of the transactional create: either the persisted order or the
/// first item whose window collided with a concurrent booking.
#[derive(Debug)]
pub enum CreateOutcome {
    Created {
        order: orders::Model,
        lines: Vec<order_items::Model>,
    },
    Conflict {
        item_id: i32,
    },
}

impl OrderRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    /// Counts order lines for `item_id` whose parent order is pending or
    /// active and whose date window touches the proposed one. Bounds are
    /// inclusive on both ends; size is deliberately ignored because one
    /// physical garment backs all size rows of an item listing.
    async fn count_conflicts<C: ConnectionTrait>(
        conn: &C,
        item_id: i32,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<u64> {
        let count = OrderItems::find()
            .join(JoinType::InnerJoin, order_items::Relation::Order.def())
            .filter(order_items::Column::ItemId.eq(item_id))
            .filter(orders::Column::Status.is_in([OrderStatus::Pending, OrderStatus::Active]))
            .filter(orders::Column::StartDate.lte(end))
            .filter(orders::Column::EndDate.gte(start))
            .count(conn)
            .await
            .context("Failed to count conflicting bookings")?;
        Ok(count)
    }

    /// Read-only conflict probe used while quoting.
    pub async fn has_conflict(&self, item_id: i32, start: NaiveDate, end: NaiveDate) -> Result<bool> {
        Ok(Self::count_conflicts(&self.conn, item_id, start, end).await? > 0)
    }

    /// Creates an order with all its lines in one serializable transaction.
    ///
    /// The conflict check runs again inside the transaction so that two
    /// drafts racing for the same garment cannot both commit; the loser
    /// observes the winner's rows (or a serialization failure) and surfaces
    /// the first colliding item instead of inserting.
    pub async fn create_with_lines(
        &self,
        user_id: i32,
        start: NaiveDate,
        end: NaiveDate,
        total_price: Decimal,
        lines: &[NewOrderLine],
    ) -> Result<CreateOutcome> {
        let txn = self
            .conn
            .begin_with_config(Some(IsolationLevel::Serializable), None)
            .await
            .context("Failed to open booking transaction")?;

        for line in lines {
            if Self::count_conflicts(&txn, line.item_id, start, end).await? > 0 {
                txn.rollback().await.ok();
                return Ok(CreateOutcome::Conflict {
                    item_id: line.item_id,
                });
            }
        }

        let order = orders::ActiveModel {
            user_id: Set(user_id),
            start_date: Set(start),
            end_date: Set(end),
            status: Set(OrderStatus::Pending),
            total_price: Set(total_price),
            created_at: Set(chrono::Utc::now()),
            ..Default::default()
        }
        .insert(&txn)
        .await
        .context("Failed to insert order")?;

        let mut created_lines = Vec::with_capacity(lines.len());
        for line in lines {
            let created = order_items::ActiveModel {
                order_id: Set(order.id),
                item_id: Set(line.item_id),
                size: Set(line.size.clone()),
                quantity: Set(line.quantity),
                ..Default::default()
            }
            .insert(&txn)
            .await
            .context("Failed to insert order line")?;
            created_lines.push(created);
        }

        txn.commit().await.context("Failed to commit booking")?;

        info!(
            "Created order {} for user {} ({} lines, {} to {})",
            order.id,
            user_id,
            created_lines.len(),
            start,
            end
        );

        Ok(CreateOutcome::Created {
            order,
            lines: created_lines,
        })
    }

    pub async fn get(&self, id: i32) -> Result<Option<orders::Model>> {
        let row = Orders::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query order")?;
        Ok(row)
    }

    pub async fn find_by_payment_order_id(&self, payment_order_id: &str) -> Result<Option<orders::Model>> {
        let row = Orders::find()
            .filter(orders::Column::PaymentOrderId.eq(payment_order_id))
            .one(&self.conn)
            .await
            .context("Failed to query order by payment id")?;
        Ok(row)
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<orders::Model>> {
        let rows = Orders::find()
            .filter(orders::Column::UserId.eq(user_id))
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list orders for user")?;
        Ok(rows)
    }

    pub async fn list_all(&self) -> Result<Vec<orders::Model>> {
        let rows = Orders::find()
            .order_by_desc(orders::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("Failed to list orders")?;
        Ok(rows)
    }

    pub async fn lines_for(&self, order_id: i32) -> Result<Vec<order_items::Model>> {
        let rows = OrderItems::find()
            .filter(order_items::Column::OrderId.eq(order_id))
            .order_by_asc(order_items::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to list order lines")?;
        Ok(rows)
    }

    pub async fn lines_for_orders(
        &self,
        order_ids: &[i32],
    ) -> Result<HashMap<i32, Vec<order_items::Model>>> {
        if order_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = OrderItems::find()
            .filter(order_items::Column::OrderId.is_in(order_ids.iter().copied()))
            .order_by_asc(order_items::Column::Id)
            .all(&self.conn)
            .await
            .context("Failed to batch-list order lines")?;

        let mut map: HashMap<i32, Vec<order_items::Model>> = HashMap::new();
        for row in rows {
            map.entry(row.order_id).or_default().push(row);
        }
        Ok(map)
    }

    pub async fn update_total(&self, id: i32, total_price: Decimal) -> Result<()> {
        Orders::update_many()
            .col_expr(orders::Column::TotalPrice, Expr::value(total_price))
            .filter(orders::Column::Id.eq(id))
            .exec(&self.conn)
            .await
            .context("Failed to update order total")?;
        Ok(())
    }

    /// Stores the contact block and gateway order id captured at payment
    /// initiation, together with the freshly recomputed total.
    pub async fn set_payment_initiated(
        &self,
        id: i32,
        payment_order_id: &str,
        contact: &ContactInfo,
        total_price: Decimal,
    ) -> Result<()> {
        let Some(existing) = self.get(id).await? else {
            anyhow::bail!("Order not found: {id}");
        };

        let mut active: orders::ActiveModel = existing.into();
        active.payment_order_id = Set(Some(payment_order_id.to_string()));
        active.customer_name = Set(Some(contact.customer_name.clone()));
        active.customer_email = Set(Some(contact.customer_email.clone()));
        active.customer_phone = Set(Some(contact.customer_phone.clone()));
        active.shipping_address = Set(Some(contact.shipping_address.clone()));
        active.total_price = Set(total_price);
        active.update(&self.conn).await?;

        Ok(())
    }

    /// Compare-and-set pending -> active. Returns false when the order was
    /// not pending, which is exactly the redelivered-webhook case.
    pub async fn mark_active(&self, id: i32) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Active))
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::Status.eq(OrderStatus::Pending))
            .exec(&self.conn)
            .await
            .context("Failed to activate order")?;
        Ok(result.rows_affected > 0)
    }

    /// Compare-and-set active -> completed.
    pub async fn mark_completed(&self, id: i32) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(orders::Column::Status, Expr::value(OrderStatus::Completed))
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::Status.eq(OrderStatus::Active))
            .exec(&self.conn)
            .await
            .context("Failed to complete order")?;
        Ok(result.rows_affected > 0)
    }

    /// Records the forward shipment ids, but only if none are set yet.
    /// Returns false when another delivery of the same webhook got there
    /// first, so at most one shipment is ever attached.
    pub async fn set_forward_shipment(
        &self,
        id: i32,
        shipping_order_id: &str,
        shipment_id: &str,
    ) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(
                orders::Column::ShippingOrderId,
                Expr::value(shipping_order_id),
            )
            .col_expr(orders::Column::ShipmentId, Expr::value(shipment_id))
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::ShipmentId.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to record forward shipment")?;
        Ok(result.rows_affected > 0)
    }

    /// Records the return shipment ids, guarded the same way as the
    /// forward pair.
    pub async fn set_return_shipment(
        &self,
        id: i32,
        return_order_id: &str,
        return_shipment_id: &str,
    ) -> Result<bool> {
        let result = Orders::update_many()
            .col_expr(orders::Column::ReturnOrderId, Expr::value(return_order_id))
            .col_expr(
                orders::Column::ReturnShipmentId,
                Expr::value(return_shipment_id),
            )
            .filter(orders::Column::Id.eq(id))
            .filter(orders::Column::ReturnShipmentId.is_null())
            .exec(&self.conn)
            .await
            .context("Failed to record return shipment")?;
        Ok(result.rows_affected > 0)
    }
}

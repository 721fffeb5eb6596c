use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        // The overlap check scans order lines by item and filters orders by
        // status; both paths need an index once the catalog grows.
        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_order_items_item ON order_items(item_id)",
        )
        .await?;

        conn.execute_unprepared("CREATE INDEX IF NOT EXISTS idx_orders_status ON orders(status)")
            .await?;

        conn.execute_unprepared(
            "CREATE INDEX IF NOT EXISTS idx_otp_requests_email ON otp_requests(email)",
        )
        .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let conn = manager.get_connection();

        conn.execute_unprepared("DROP INDEX IF EXISTS idx_otp_requests_email")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_orders_status")
            .await?;
        conn.execute_unprepared("DROP INDEX IF EXISTS idx_order_items_item")
            .await?;

        Ok(())
    }
}

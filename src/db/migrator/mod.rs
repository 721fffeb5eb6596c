use sea_orm_migration::prelude::*;

mod m20250701_initial;
mod m20250809_add_return_shipments;
mod m20260105_add_booking_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250701_initial::Migration),
            Box::new(m20250809_add_return_shipments::Migration),
            Box::new(m20260105_add_booking_indexes::Migration),
        ]
    }
}

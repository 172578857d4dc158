pub use sea_orm_migration::prelude::*;

mod m20260901_000001_create_wallets;
mod m20260901_000002_create_discount_codes;
mod m20260902_000001_create_payment_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260901_000001_create_wallets::Migration),
            Box::new(m20260901_000002_create_discount_codes::Migration),
            Box::new(m20260902_000001_create_payment_tables::Migration),
        ]
    }
}

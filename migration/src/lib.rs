//! Database migrations for the Meta gateway service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_06_01_000001_create_connections;
mod m2025_06_01_000002_create_ad_accounts;
mod m2025_06_01_000003_create_pages;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_06_01_000001_create_connections::Migration),
            Box::new(m2025_06_01_000002_create_ad_accounts::Migration),
            Box::new(m2025_06_01_000003_create_pages::Migration),
        ]
    }
}

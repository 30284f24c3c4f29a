//! Database migrations

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_library_tables::Migration),
            Box::new(m20250302_000001_create_pending_operations::Migration),
        ]
    }
}

mod m20250301_000001_create_library_tables;
mod m20250302_000001_create_pending_operations;

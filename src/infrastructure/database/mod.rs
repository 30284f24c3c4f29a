//! Local cache database using SeaORM
//!
//! Owns the `pending_operations` table plus the cached entity tables
//! (`books`, `contributors`, `series`). SQLite-backed on device.

use sea_orm::{ConnectOptions, Database as SeaDatabase, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod entities;
pub mod migration;

/// Database wrapper for the Fable client cache.
pub struct Database {
    conn: DatabaseConnection,
}

impl Database {
    /// Open (or create) the cache database at the specified path.
    pub async fn open(path: &Path) -> Result<Self, DbErr> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| DbErr::Custom(format!("Failed to create directory: {}", e)))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", path.display());

        let mut opt = ConnectOptions::new(db_url);
        opt.max_connections(10)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(8))
            .idle_timeout(Duration::from_secs(8))
            .sqlx_logging(false); // We use tracing instead

        let conn = SeaDatabase::connect(opt).await?;

        info!("Opened cache database at {:?}", path);

        Ok(Self { conn })
    }

    /// In-memory database; a single connection, since each SQLite
    /// `:memory:` connection is its own database.
    pub async fn open_in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:".to_string());
        opt.max_connections(1).sqlx_logging(false);

        let conn = SeaDatabase::connect(opt).await?;

        Ok(Self { conn })
    }

    /// Run migrations.
    pub async fn migrate(&self) -> Result<(), DbErr> {
        migration::Migrator::up(&self.conn, None).await?;
        info!("Cache database migrations completed");
        Ok(())
    }

    /// Get the database connection.
    pub fn conn(&self) -> &DatabaseConnection {
        &self.conn
    }
}

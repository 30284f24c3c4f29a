//! Sea-ORM entity definitions
//!
//! These map the cached domain models and the pending-operation queue to
//! database tables.

pub mod book;
pub mod contributor;
pub mod pending_operation;
pub mod series;

// Re-export all entities
pub use book::Entity as Book;
pub use contributor::Entity as Contributor;
pub use pending_operation::Entity as PendingOperation;
pub use series::Entity as Series;

// Re-export active models for easy access
pub use book::ActiveModel as BookActive;
pub use contributor::ActiveModel as ContributorActive;
pub use pending_operation::ActiveModel as PendingOperationActive;
pub use series::ActiveModel as SeriesActive;

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a cached row carries local edits the server has not seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncState {
    #[sea_orm(string_value = "synced")]
    Synced,
    #[sea_orm(string_value = "not_synced")]
    NotSynced,
}

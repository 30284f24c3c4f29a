//! Synchronization: conflict detection and push orchestration

pub mod conflict;
pub mod push;

pub use conflict::{local_edit_is_stale, ConflictDetector, PushConflict};
pub use push::{PushSyncOrchestrator, SyncReport};

use crate::operations::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

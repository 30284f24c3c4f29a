//! Edit repositories: the mutation entry points
//!
//! Each write is two explicit, separately testable steps: a local
//! optimistic mutation (the row goes NotSynced with a fresh
//! `last_modified`), then an enqueue through the operation queue. The UI
//! sees the local effect immediately; the push pipeline catches up later.

use crate::operations::queue::EnqueueError;
use crate::operations::StoreError;
use thiserror::Error;
use uuid::Uuid;

mod book_edit;
mod contributor_edit;
mod listening;
mod preferences;
mod series_edit;

pub use book_edit::BookEditRepository;
pub use contributor_edit::ContributorEditRepository;
pub use listening::ListeningRepository;
pub use preferences::PreferencesRepository;
pub use series_edit::SeriesEditRepository;

#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The entity to edit is not in the local cache; nothing is queued.
    #[error("Entity not found locally: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Enqueue(#[from] EnqueueError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Failed to serialize operation payload: {0}")]
    Payload(#[from] serde_json::Error),
}

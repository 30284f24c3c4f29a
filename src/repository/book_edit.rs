//! Book edit repository

use crate::infrastructure::database::entities::{
    book,
    pending_operation::{EntityType, OperationType},
    Book, SyncState,
};
use crate::operations::payload::{
    BookUpdatePayload, ContributorRole, SeriesPlacement, SetBookContributorsPayload,
    SetBookSeriesPayload,
};
use crate::operations::queue::{EnqueueOutcome, OperationQueue};
use crate::operations::store::NewOperation;
use crate::shared::Clock;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryError;

pub struct BookEditRepository {
    db: DatabaseConnection,
    queue: Arc<OperationQueue>,
    clock: Arc<dyn Clock>,
}

impl BookEditRepository {
    pub fn new(db: DatabaseConnection, queue: Arc<OperationQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { db, queue, clock }
    }

    /// Optimistic local write only; the caller (or [`Self::update_book`])
    /// enqueues the push separately.
    pub async fn apply_local_update(
        &self,
        book_id: Uuid,
        patch: &BookUpdatePayload,
    ) -> Result<book::Model, RepositoryError> {
        let current = Book::find_by_id(book_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(book_id))?;

        let mut active = current.into_active_model();
        if let Some(title) = &patch.title {
            active.title = Set(title.clone());
        }
        if let Some(subtitle) = &patch.subtitle {
            active.subtitle = Set(Some(subtitle.clone()));
        }
        if let Some(description) = &patch.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(publisher) = &patch.publisher {
            active.publisher = Set(Some(publisher.clone()));
        }
        if let Some(published_year) = patch.published_year {
            active.published_year = Set(Some(published_year));
        }
        if let Some(language) = &patch.language {
            active.language = Set(Some(language.clone()));
        }
        if let Some(isbn) = &patch.isbn {
            active.isbn = Set(Some(isbn.clone()));
        }
        if let Some(explicit) = patch.explicit {
            active.explicit = Set(explicit);
        }
        if let Some(abridged) = patch.abridged {
            active.abridged = Set(abridged);
        }
        active.sync_state = Set(SyncState::NotSynced);
        active.last_modified = Set(self.clock.now());

        Ok(active.update(&self.db).await?)
    }

    /// Queue the push for an already-applied local update.
    pub async fn enqueue_update(
        &self,
        book_id: Uuid,
        patch: &BookUpdatePayload,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::BookUpdate,
                entity_type: Some(EntityType::Book),
                entity_id: Some(book_id),
                payload: serde_json::to_value(patch)?,
                batch_key: None,
            })
            .await?)
    }

    /// The full edit path: local optimistic write, then enqueue.
    pub async fn update_book(
        &self,
        book_id: Uuid,
        patch: BookUpdatePayload,
    ) -> Result<book::Model, RepositoryError> {
        let updated = self.apply_local_update(book_id, &patch).await?;
        self.enqueue_update(book_id, &patch).await?;
        Ok(updated)
    }

    /// Replace the book's complete contributor list. Last write wins on
    /// the whole list; a second call supersedes the first entirely.
    pub async fn set_contributors(
        &self,
        book_id: Uuid,
        contributors: Vec<ContributorRole>,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        self.touch_unsynced(book_id).await?;
        let payload = SetBookContributorsPayload {
            book_id,
            contributors,
        };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::SetBookContributors,
                entity_type: Some(EntityType::Book),
                entity_id: Some(book_id),
                payload: serde_json::to_value(&payload)?,
                batch_key: None,
            })
            .await?)
    }

    /// Replace the book's complete series list.
    pub async fn set_series(
        &self,
        book_id: Uuid,
        series: Vec<SeriesPlacement>,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        self.touch_unsynced(book_id).await?;
        let payload = SetBookSeriesPayload { book_id, series };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::SetBookSeries,
                entity_type: Some(EntityType::Book),
                entity_id: Some(book_id),
                payload: serde_json::to_value(&payload)?,
                batch_key: None,
            })
            .await?)
    }

    async fn touch_unsynced(&self, book_id: Uuid) -> Result<(), RepositoryError> {
        let current = Book::find_by_id(book_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(book_id))?;

        let mut active = current.into_active_model();
        active.sync_state = Set(SyncState::NotSynced);
        active.last_modified = Set(self.clock.now());
        active.update(&self.db).await?;
        Ok(())
    }
}

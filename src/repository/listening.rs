//! Listening repository: playback positions and listening events
//!
//! Positions coalesce per book (only the latest matters); events append
//! one row each, keyed by a session batch key so a whole session flushes
//! in one server call.

use crate::infrastructure::database::entities::{
    pending_operation::{EntityType, OperationType},
    Book,
};
use crate::operations::payload::{ListeningEventPayload, PlaybackPositionPayload};
use crate::operations::queue::{EnqueueOutcome, OperationQueue};
use crate::operations::store::NewOperation;
use crate::shared::Clock;
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryError;

pub struct ListeningRepository {
    db: DatabaseConnection,
    queue: Arc<OperationQueue>,
    clock: Arc<dyn Clock>,
}

impl ListeningRepository {
    pub fn new(db: DatabaseConnection, queue: Arc<OperationQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { db, queue, clock }
    }

    /// Queue the current playback position for a book, superseding any
    /// queued position for the same book.
    pub async fn report_position(
        &self,
        book_id: Uuid,
        position_seconds: f64,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        self.require_book(book_id).await?;

        let payload = PlaybackPositionPayload {
            book_id,
            position_seconds,
            recorded_at: self.clock.now(),
        };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::PlaybackPosition,
                entity_type: Some(EntityType::Book),
                entity_id: Some(book_id),
                payload: serde_json::to_value(&payload)?,
                batch_key: None,
            })
            .await?)
    }

    /// Record one listening session event. Each call is a distinct queue
    /// row; the `session_key` groups a session's events into one batch.
    pub async fn record_event(
        &self,
        book_id: Uuid,
        session_key: &str,
        started_at: DateTime<Utc>,
        duration_seconds: f64,
        finished: bool,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        self.require_book(book_id).await?;

        let payload = ListeningEventPayload {
            // Client-generated: the server dedups on this under retry.
            event_id: Uuid::new_v4(),
            book_id,
            started_at,
            duration_seconds,
            finished,
        };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::ListeningEvent,
                entity_type: Some(EntityType::Book),
                entity_id: Some(book_id),
                payload: serde_json::to_value(&payload)?,
                batch_key: Some(session_key.to_string()),
            })
            .await?)
    }

    async fn require_book(&self, book_id: Uuid) -> Result<(), RepositoryError> {
        Book::find_by_id(book_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(book_id))?;
        Ok(())
    }
}

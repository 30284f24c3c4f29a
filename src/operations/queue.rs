//! Enqueue path: coalescing decisions
//!
//! The store inserts unconditionally; this is where the find-before-insert
//! coalescing contract lives. There is no cross-process locking around the
//! read-then-write pair; mutations for one entity are serialized by the
//! repository layer, which is the single writer in practice.

use crate::infrastructure::database::entities::pending_operation::{self, CoalescePolicy};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use super::error::{HandlerFailure, StoreError};
use super::handler::HandlerRegistry;
use super::store::{NewOperation, PendingOperationStore};

#[derive(Error, Debug)]
pub enum EnqueueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Coalesce rejected the payloads; indicates a bug in the caller.
    #[error(transparent)]
    Handler(#[from] HandlerFailure),

    #[error("Coalescable operation {0:?} enqueued without an entity id")]
    MissingEntityId(pending_operation::OperationType),

    #[error("No handler registered for {0:?}")]
    UnknownType(pending_operation::OperationType),
}

/// What happened to an enqueue request.
#[derive(Debug, Clone)]
pub enum EnqueueOutcome {
    /// A new queue row was created.
    Inserted(pending_operation::Model),
    /// The request was folded into an already-queued operation.
    Coalesced(pending_operation::Model),
}

impl EnqueueOutcome {
    pub fn operation(&self) -> &pending_operation::Model {
        match self {
            Self::Inserted(op) | Self::Coalesced(op) => op,
        }
    }
}

pub struct OperationQueue {
    store: Arc<PendingOperationStore>,
    registry: Arc<HandlerRegistry>,
}

impl OperationQueue {
    pub fn new(store: Arc<PendingOperationStore>, registry: Arc<HandlerRegistry>) -> Self {
        Self { store, registry }
    }

    pub fn store(&self) -> &Arc<PendingOperationStore> {
        &self.store
    }

    /// Queue a mutation for push, coalescing per the operation type's policy.
    pub async fn enqueue(&self, new: NewOperation) -> Result<EnqueueOutcome, EnqueueError> {
        let operation_type = new.operation_type;

        let existing = match operation_type.coalesce_policy() {
            CoalescePolicy::Never => None,
            CoalescePolicy::MergeByEntity | CoalescePolicy::ReplaceEntire => {
                let entity_id = new
                    .entity_id
                    .ok_or(EnqueueError::MissingEntityId(operation_type))?;
                self.store
                    .find_pending_by_type_and_entity(operation_type, entity_id)
                    .await?
            }
            CoalescePolicy::MergeGlobal => self.store.find_pending_preferences().await?,
        };

        match existing {
            Some(queued) => {
                let handler = self
                    .registry
                    .get(operation_type)
                    .ok_or(EnqueueError::UnknownType(operation_type))?;
                let merged = handler.coalesce(queued.payload.clone(), new.payload)?;
                debug!(
                    id = %queued.id,
                    operation_type = ?operation_type,
                    "Coalesced request into queued operation"
                );
                let updated = self.store.update_payload(queued.id, merged).await?;
                Ok(EnqueueOutcome::Coalesced(updated))
            }
            None => Ok(EnqueueOutcome::Inserted(self.store.insert(new).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::entities::pending_operation::{
        EntityType, OperationType,
    };
    use crate::operations::payload::{BookUpdatePayload, UserPreferencesPayload};
    use crate::testing;
    use serde_json::json;
    use uuid::Uuid;

    fn book_patch(book_id: Uuid, payload: BookUpdatePayload) -> NewOperation {
        NewOperation {
            operation_type: OperationType::BookUpdate,
            entity_type: Some(EntityType::Book),
            entity_id: Some(book_id),
            payload: serde_json::to_value(payload).unwrap(),
            batch_key: None,
        }
    }

    #[tokio::test]
    async fn two_updates_to_one_book_leave_exactly_one_merged_operation() {
        let harness = testing::TestHarness::new().await;
        let queue = &harness.queue;
        let book_id = Uuid::new_v4();

        let first = queue
            .enqueue(book_patch(
                book_id,
                BookUpdatePayload {
                    title: Some("Working Title".into()),
                    description: Some("blurb".into()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        assert!(matches!(first, EnqueueOutcome::Inserted(_)));

        let second = queue
            .enqueue(book_patch(
                book_id,
                BookUpdatePayload {
                    title: Some("Final Title".into()),
                    ..Default::default()
                },
            ))
            .await
            .unwrap();
        let EnqueueOutcome::Coalesced(merged) = second else {
            panic!("second request should coalesce");
        };

        assert_eq!(first.operation().id, merged.id);
        assert_eq!(queue.store().count_pending().await.unwrap(), 1);

        let payload: BookUpdatePayload = serde_json::from_value(merged.payload).unwrap();
        assert_eq!(payload.title.as_deref(), Some("Final Title"));
        assert_eq!(payload.description.as_deref(), Some("blurb"));
    }

    #[tokio::test]
    async fn updates_to_different_books_do_not_coalesce() {
        let harness = testing::TestHarness::new().await;

        for _ in 0..2 {
            harness
                .queue
                .enqueue(book_patch(
                    Uuid::new_v4(),
                    BookUpdatePayload {
                        title: Some("t".into()),
                        ..Default::default()
                    },
                ))
                .await
                .unwrap();
        }

        assert_eq!(harness.queue.store().count_pending().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn replace_entire_types_overwrite_the_queued_payload() {
        let harness = testing::TestHarness::new().await;
        let book_id = Uuid::new_v4();
        let first_contributor = Uuid::new_v4();
        let second_contributor = Uuid::new_v4();

        let request = |contributor: Uuid| NewOperation {
            operation_type: OperationType::SetBookContributors,
            entity_type: Some(EntityType::Book),
            entity_id: Some(book_id),
            payload: json!({
                "book_id": book_id,
                "contributors": [{ "contributor_id": contributor, "role": "author" }],
            }),
            batch_key: None,
        };

        harness.queue.enqueue(request(first_contributor)).await.unwrap();
        let outcome = harness
            .queue
            .enqueue(request(second_contributor))
            .await
            .unwrap();

        let queued = outcome.operation();
        let listed: Vec<Uuid> = queued.payload["contributors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["contributor_id"].as_str().unwrap().parse().unwrap())
            .collect();

        // The earlier list is gone entirely, not merged.
        assert_eq!(listed, vec![second_contributor]);
        assert_eq!(harness.queue.store().count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn preferences_coalesce_globally() {
        let harness = testing::TestHarness::new().await;

        let request = |payload: UserPreferencesPayload| NewOperation {
            operation_type: OperationType::UserPreferences,
            entity_type: None,
            entity_id: None,
            payload: serde_json::to_value(payload).unwrap(),
            batch_key: None,
        };

        harness
            .queue
            .enqueue(request(UserPreferencesPayload {
                playback_speed: Some(1.25),
                ..Default::default()
            }))
            .await
            .unwrap();
        harness
            .queue
            .enqueue(request(UserPreferencesPayload {
                theme: Some("sepia".into()),
                ..Default::default()
            }))
            .await
            .unwrap();

        assert_eq!(harness.queue.store().count_pending().await.unwrap(), 1);

        let queued = harness
            .queue
            .store()
            .find_pending_preferences()
            .await
            .unwrap()
            .unwrap();
        let payload: UserPreferencesPayload = serde_json::from_value(queued.payload).unwrap();
        assert_eq!(payload.playback_speed, Some(1.25));
        assert_eq!(payload.theme.as_deref(), Some("sepia"));
    }

    #[tokio::test]
    async fn listening_events_always_append() {
        let harness = testing::TestHarness::new().await;
        let book_id = Uuid::new_v4();

        for _ in 0..3 {
            harness
                .queue
                .enqueue(NewOperation {
                    operation_type: OperationType::ListeningEvent,
                    entity_type: Some(EntityType::Book),
                    entity_id: Some(book_id),
                    payload: json!({
                        "event_id": Uuid::new_v4(),
                        "book_id": book_id,
                        "started_at": "2026-03-01T10:00:00Z",
                        "duration_seconds": 60.0,
                        "finished": false,
                    }),
                    batch_key: Some("session-1".into()),
                })
                .await
                .unwrap();
        }

        assert_eq!(harness.queue.store().count_pending().await.unwrap(), 3);
    }
}

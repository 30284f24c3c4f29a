//! Pending operation store
//!
//! Durable, queryable home for every queued mutation; the single choke
//! point through which all outgoing writes flow. All selection queries
//! order by `created_at` ascending, FIFO.
//!
//! The store is the only writer of operation status. It performs no
//! coalescing itself; enqueue-time decisions live in
//! [`super::queue::OperationQueue`].

use crate::infrastructure::database::entities::pending_operation::{
    self, Column, Entity, EntityType, OperationStatus, OperationType,
};
use crate::infrastructure::events::{EventBus, QueueEvent};
use crate::shared::Clock;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use serde_json::Value as Json;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::error::StoreError;

/// Everything the caller decides about a new operation; the store stamps
/// id, status, and timestamps itself.
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub operation_type: OperationType,
    pub entity_type: Option<EntityType>,
    pub entity_id: Option<Uuid>,
    pub payload: Json,
    pub batch_key: Option<String>,
}

pub struct PendingOperationStore {
    db: DatabaseConnection,
    events: Arc<EventBus>,
    clock: Arc<dyn Clock>,
}

impl PendingOperationStore {
    pub fn new(db: DatabaseConnection, events: Arc<EventBus>, clock: Arc<dyn Clock>) -> Self {
        Self { db, events, clock }
    }

    /// Unconditional insert. Coalescing lookups are the caller's job and
    /// must happen before this.
    pub async fn insert(&self, new: NewOperation) -> Result<pending_operation::Model, StoreError> {
        let now = self.clock.now();
        let model = pending_operation::ActiveModel {
            id: Set(Uuid::new_v4()),
            operation_type: Set(new.operation_type),
            entity_type: Set(new.entity_type),
            entity_id: Set(new.entity_id),
            payload: Set(new.payload),
            batch_key: Set(new.batch_key),
            status: Set(OperationStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            attempt_count: Set(0),
            last_error: Set(None),
        };

        let inserted = model.insert(&self.db).await?;
        debug!(
            id = %inserted.id,
            operation_type = ?inserted.operation_type,
            "Enqueued pending operation"
        );
        self.events.emit(QueueEvent::OperationEnqueued {
            id: inserted.id,
            operation_type: inserted.operation_type,
        });

        Ok(inserted)
    }

    /// The coalescing lookup: the single pending operation for a
    /// (type, entity) key, if any.
    pub async fn find_pending_by_type_and_entity(
        &self,
        operation_type: OperationType,
        entity_id: Uuid,
    ) -> Result<Option<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .filter(Column::OperationType.eq(operation_type))
            .filter(Column::EntityId.eq(entity_id))
            .one(&self.db)
            .await?)
    }

    /// The global-singleton lookup for the preferences operation.
    pub async fn find_pending_preferences(
        &self,
    ) -> Result<Option<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .filter(Column::OperationType.eq(OperationType::UserPreferences))
            .one(&self.db)
            .await?)
    }

    /// Overwrite the payload of a still-pending operation (coalescing
    /// outcome). Keeps `created_at` so the row holds its FIFO slot.
    pub async fn update_payload(
        &self,
        id: Uuid,
        payload: Json,
    ) -> Result<pending_operation::Model, StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Payload, Expr::value(payload))
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OperationStatus::Pending))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::InvalidTransition {
                id,
                detail: "payload update requires a pending operation".into(),
            });
        }

        let updated = self.get(id).await?;
        self.events.emit(QueueEvent::OperationCoalesced {
            id,
            operation_type: updated.operation_type,
        });
        Ok(updated)
    }

    pub async fn get(&self, id: Uuid) -> Result<pending_operation::Model, StoreError> {
        Entity::find_by_id(id)
            .one(&self.db)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    pub async fn get_oldest_pending(
        &self,
    ) -> Result<Option<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .order_by_asc(Column::CreatedAt)
            .one(&self.db)
            .await?)
    }

    pub async fn get_pending(
        &self,
        limit: u64,
    ) -> Result<Vec<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    pub async fn get_pending_by_batch_key(
        &self,
        batch_key: &str,
        limit: u64,
    ) -> Result<Vec<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .filter(Column::BatchKey.eq(batch_key))
            .order_by_asc(Column::CreatedAt)
            .limit(limit)
            .all(&self.db)
            .await?)
    }

    /// Any pending or failed operation still referencing the entity. The
    /// orchestrator uses this to decide when a cached row is fully synced.
    pub async fn any_remaining_for_entity(
        &self,
        entity_type: EntityType,
        entity_id: Uuid,
    ) -> Result<bool, StoreError> {
        let count = Entity::find()
            .filter(Column::EntityType.eq(entity_type))
            .filter(Column::EntityId.eq(entity_id))
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    /// Claim a batch: Pending -> InProgress, in one statement so a partial
    /// batch can't be claimed twice.
    pub async fn mark_in_progress(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        Entity::update_many()
            .col_expr(Column::Status, Expr::value(OperationStatus::InProgress))
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Id.is_in(ids.iter().copied()))
            .filter(Column::Status.eq(OperationStatus::Pending))
            .exec(&self.db)
            .await?;

        self.events
            .emit(QueueEvent::OperationsStarted { ids: ids.to_vec() });
        Ok(())
    }

    /// Record a failed attempt: status Failed, error stored, attempt count
    /// incremented by exactly one.
    pub async fn mark_failed(
        &self,
        id: Uuid,
        error: &str,
    ) -> Result<pending_operation::Model, StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(OperationStatus::Failed))
            .col_expr(Column::LastError, Expr::value(error))
            .col_expr(
                Column::AttemptCount,
                Expr::col(Column::AttemptCount).add(1),
            )
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::NotFound(id));
        }

        let failed = self.get(id).await?;
        self.events.emit(QueueEvent::OperationFailed {
            id,
            error: error.to_string(),
            attempt_count: failed.attempt_count,
        });
        Ok(failed)
    }

    /// User-initiated retry: Failed -> Pending with a clean slate
    /// (attempt count zeroed, error cleared).
    pub async fn reset_for_retry(&self, id: Uuid) -> Result<(), StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(OperationStatus::Pending))
            .col_expr(Column::AttemptCount, Expr::value(0))
            .col_expr(Column::LastError, Expr::value(Option::<String>::None))
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OperationStatus::Failed))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::InvalidTransition {
                id,
                detail: "retry requires a failed operation".into(),
            });
        }

        self.events.emit(QueueEvent::OperationRetried { id });
        Ok(())
    }

    /// Automatic requeue after a transient failure: Failed -> Pending but
    /// the attempt count and last error stay, for user-visible "N failed
    /// attempts" messaging.
    pub async fn requeue(&self, id: Uuid) -> Result<(), StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(OperationStatus::Pending))
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.eq(OperationStatus::Failed))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            return Err(StoreError::InvalidTransition {
                id,
                detail: "requeue requires a failed operation".into(),
            });
        }
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(())
    }

    pub async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }
        Entity::delete_many()
            .filter(Column::Id.is_in(ids.iter().copied()))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    /// Reserved for logout and test reset.
    pub async fn delete_all(&self) -> Result<(), StoreError> {
        Entity::delete_many().exec(&self.db).await?;
        Ok(())
    }

    /// Crash recovery, called once at startup before any sync pass: every
    /// row stuck InProgress from a previous process goes back to Pending,
    /// otherwise it would be invisible to both the retry queue and the
    /// failed-operations view forever.
    pub async fn reset_stuck_operations(&self) -> Result<u64, StoreError> {
        let result = Entity::update_many()
            .col_expr(Column::Status, Expr::value(OperationStatus::Pending))
            .col_expr(Column::UpdatedAt, Expr::value(self.clock.now()))
            .filter(Column::Status.eq(OperationStatus::InProgress))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            info!(
                count = result.rows_affected,
                "Reset stuck in-progress operations to pending"
            );
            self.events.emit(QueueEvent::StuckOperationsReset {
                count: result.rows_affected,
            });
        }
        Ok(result.rows_affected)
    }

    // --- Observability queries for sync-status UI ---

    pub async fn count_pending(&self) -> Result<u64, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Pending))
            .count(&self.db)
            .await?)
    }

    pub async fn count_failed(&self) -> Result<u64, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Failed))
            .count(&self.db)
            .await?)
    }

    pub async fn get_failed(&self) -> Result<Vec<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::Failed))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    pub async fn get_in_progress(&self) -> Result<Vec<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .filter(Column::Status.eq(OperationStatus::InProgress))
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Everything, regardless of status, for the sync-status screen.
    pub async fn get_all(&self) -> Result<Vec<pending_operation::Model>, StoreError> {
        Ok(Entity::find()
            .order_by_asc(Column::CreatedAt)
            .all(&self.db)
            .await?)
    }
}

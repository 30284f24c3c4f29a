//! Push sync orchestrator
//!
//! Drains the pending-operation store through the handler registry: claim,
//! execute (batched where the type allows), then delete on success or
//! record the failure. One call to [`PushSyncOrchestrator::run_once`] is
//! one sync pass; the platform shell decides when passes run. Session
//! cancellation is also the shell's concern: an operation left InProgress
//! by a killed pass is picked up by the startup crash-recovery reset.

use crate::config::{PushConflictPolicy, SyncConfig};
use crate::infrastructure::database::entities::{
    self,
    pending_operation::{self, EntityType},
    SyncState,
};
use crate::infrastructure::events::{EventBus, QueueEvent};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::HandlerRegistry;
use crate::operations::store::PendingOperationStore;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::conflict::ConflictDetector;
use super::SyncError;

/// Outcome of one sync pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub completed: u64,
    pub failed: u64,
    /// Transient failures put back in the queue for the next pass.
    pub requeued: u64,
    /// Advisory push conflicts encountered (blocked or not, per policy).
    pub conflicts: u64,
    /// Operations left pending because the conflict policy is Block.
    pub blocked: u64,
}

pub struct PushSyncOrchestrator {
    store: Arc<PendingOperationStore>,
    registry: Arc<HandlerRegistry>,
    conflicts: Arc<ConflictDetector>,
    events: Arc<EventBus>,
    db: DatabaseConnection,
    config: SyncConfig,
}

impl PushSyncOrchestrator {
    pub fn new(
        store: Arc<PendingOperationStore>,
        registry: Arc<HandlerRegistry>,
        conflicts: Arc<ConflictDetector>,
        events: Arc<EventBus>,
        db: DatabaseConnection,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            registry,
            conflicts,
            events,
            db,
            config,
        }
    }

    /// One push pass over a FIFO snapshot of the pending queue.
    ///
    /// The snapshot is taken once up front so operations requeued after a
    /// transient failure wait for the next pass instead of spinning here.
    pub async fn run_once(&self) -> Result<SyncReport, SyncError> {
        let snapshot = self.store.get_pending(self.config.drain_limit).await?;
        let mut report = SyncReport::default();
        let mut handled: HashSet<Uuid> = HashSet::new();

        for operation in &snapshot {
            if handled.contains(&operation.id) {
                continue;
            }

            let Some(handler) = self.registry.get(operation.operation_type) else {
                // Closed enum; a miss here is a wiring bug. Surface it as a
                // failed row rather than dropping the operation.
                handled.insert(operation.id);
                self.store
                    .mark_failed(operation.id, "no handler registered")
                    .await?;
                report.failed += 1;
                continue;
            };
            let handler = handler.clone();

            if let Some(conflict) = self.conflicts.check_push_conflict(operation).await? {
                report.conflicts += 1;
                warn!(
                    operation_id = %conflict.operation_id,
                    reason = %conflict.reason,
                    "Queued push conflicts with a newer server version"
                );
                self.events.emit(QueueEvent::PushConflictDetected {
                    operation_id: conflict.operation_id,
                    reason: conflict.reason,
                });

                if self.config.push_conflict_policy == PushConflictPolicy::Block {
                    handled.insert(operation.id);
                    report.blocked += 1;
                    continue;
                }
            }

            if handler.supports_batching() && operation.batch_key.is_some() {
                let batch: Vec<_> = snapshot
                    .iter()
                    .filter(|op| {
                        op.operation_type == operation.operation_type
                            && op.batch_key == operation.batch_key
                            && !handled.contains(&op.id)
                    })
                    .take(self.config.batch_size as usize)
                    .cloned()
                    .collect();
                let ids: Vec<_> = batch.iter().map(|op| op.id).collect();
                handled.extend(ids.iter().copied());

                self.store.mark_in_progress(&ids).await?;
                debug!(
                    batch_key = operation.batch_key.as_deref().unwrap_or(""),
                    count = batch.len(),
                    "Executing batched operations"
                );

                match handler.execute_batch(&batch).await {
                    Ok(()) => {
                        self.store.delete_by_ids(&ids).await?;
                        for op in &batch {
                            self.events.emit(QueueEvent::OperationCompleted { id: op.id });
                            self.settle_entity(op).await?;
                        }
                        report.completed += ids.len() as u64;
                    }
                    Err(failure) => {
                        for id in &ids {
                            self.record_failure(*id, &failure, &mut report).await?;
                        }
                    }
                }
            } else {
                handled.insert(operation.id);
                self.store.mark_in_progress(&[operation.id]).await?;

                match handler.execute(operation).await {
                    Ok(()) => {
                        self.store.delete(operation.id).await?;
                        self.events
                            .emit(QueueEvent::OperationCompleted { id: operation.id });
                        self.settle_entity(operation).await?;
                        report.completed += 1;
                    }
                    Err(failure) => {
                        self.record_failure(operation.id, &failure, &mut report)
                            .await?;
                    }
                }
            }
        }

        self.events.emit(QueueEvent::SyncPassCompleted {
            completed: report.completed,
            failed: report.failed,
        });
        Ok(report)
    }

    /// User-initiated retry of a failed operation.
    pub async fn retry_operation(&self, id: Uuid) -> Result<(), SyncError> {
        self.store.reset_for_retry(id).await?;
        Ok(())
    }

    /// User-initiated dismissal of a failed operation; the queued local
    /// change is dropped deliberately, never silently.
    pub async fn dismiss_operation(&self, id: Uuid) -> Result<(), SyncError> {
        let operation = self.store.get(id).await?;
        if operation.status != pending_operation::OperationStatus::Failed {
            return Err(SyncError::Store(
                crate::operations::StoreError::InvalidTransition {
                    id,
                    detail: "dismiss requires a failed operation".into(),
                },
            ));
        }
        self.store.delete(id).await?;
        self.events.emit(QueueEvent::OperationDismissed { id });
        Ok(())
    }

    async fn record_failure(
        &self,
        id: Uuid,
        failure: &HandlerFailure,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let failed = self.store.mark_failed(id, &failure.to_string()).await?;
        report.failed += 1;

        if failure.is_retryable() && failed.attempt_count < self.config.max_auto_attempts as i32 {
            self.store.requeue(id).await?;
            report.requeued += 1;
        }
        Ok(())
    }

    /// After a successful push, flip the cached row back to Synced once no
    /// queued operation references it anymore.
    async fn settle_entity(&self, operation: &pending_operation::Model) -> Result<(), SyncError> {
        let (Some(entity_type), Some(entity_id)) = (operation.entity_type, operation.entity_id)
        else {
            return Ok(());
        };

        if self
            .store
            .any_remaining_for_entity(entity_type, entity_id)
            .await?
        {
            return Ok(());
        }

        let updated = match entity_type {
            EntityType::Book => {
                entities::Book::update_many()
                    .col_expr(
                        entities::book::Column::SyncState,
                        Expr::value(SyncState::Synced),
                    )
                    .filter(entities::book::Column::Id.eq(entity_id))
                    .exec(&self.db)
                    .await?
                    .rows_affected
            }
            EntityType::Contributor => {
                entities::Contributor::update_many()
                    .col_expr(
                        entities::contributor::Column::SyncState,
                        Expr::value(SyncState::Synced),
                    )
                    .filter(entities::contributor::Column::Id.eq(entity_id))
                    .exec(&self.db)
                    .await?
                    .rows_affected
            }
            EntityType::Series => {
                entities::Series::update_many()
                    .col_expr(
                        entities::series::Column::SyncState,
                        Expr::value(SyncState::Synced),
                    )
                    .filter(entities::series::Column::Id.eq(entity_id))
                    .exec(&self.db)
                    .await?
                    .rows_affected
            }
            EntityType::User | EntityType::Shelf => 0,
        };

        if updated > 0 {
            self.events.emit(QueueEvent::EntitySynced {
                entity_type,
                entity_id,
            });
        }
        Ok(())
    }
}

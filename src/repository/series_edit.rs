//! Series edit repository

use crate::infrastructure::database::entities::{
    pending_operation::{EntityType, OperationType},
    series, Series, SyncState,
};
use crate::operations::payload::SeriesUpdatePayload;
use crate::operations::queue::{EnqueueOutcome, OperationQueue};
use crate::operations::store::NewOperation;
use crate::shared::Clock;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryError;

pub struct SeriesEditRepository {
    db: DatabaseConnection,
    queue: Arc<OperationQueue>,
    clock: Arc<dyn Clock>,
}

impl SeriesEditRepository {
    pub fn new(db: DatabaseConnection, queue: Arc<OperationQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { db, queue, clock }
    }

    pub async fn apply_local_update(
        &self,
        series_id: Uuid,
        patch: &SeriesUpdatePayload,
    ) -> Result<series::Model, RepositoryError> {
        let current = Series::find_by_id(series_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(series_id))?;

        let mut active = current.into_active_model();
        if let Some(name) = &patch.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &patch.description {
            active.description = Set(Some(description.clone()));
        }
        active.sync_state = Set(SyncState::NotSynced);
        active.last_modified = Set(self.clock.now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn enqueue_update(
        &self,
        series_id: Uuid,
        patch: &SeriesUpdatePayload,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::SeriesUpdate,
                entity_type: Some(EntityType::Series),
                entity_id: Some(series_id),
                payload: serde_json::to_value(patch)?,
                batch_key: None,
            })
            .await?)
    }

    pub async fn update_series(
        &self,
        series_id: Uuid,
        patch: SeriesUpdatePayload,
    ) -> Result<series::Model, RepositoryError> {
        let updated = self.apply_local_update(series_id, &patch).await?;
        self.enqueue_update(series_id, &patch).await?;
        Ok(updated)
    }
}

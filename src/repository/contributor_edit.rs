//! Contributor edit repository
//!
//! Fronts metadata patches (coalescable) as well as merge/unmerge, which
//! are never coalesced: a merge followed by an unmerge must stay two
//! operations in queue order.

use crate::infrastructure::database::entities::{
    contributor,
    pending_operation::{EntityType, OperationType},
    Contributor, SyncState,
};
use crate::operations::payload::{
    ContributorUpdatePayload, MergeContributorPayload, UnmergeContributorPayload,
};
use crate::operations::queue::{EnqueueOutcome, OperationQueue};
use crate::operations::store::NewOperation;
use crate::shared::Clock;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, IntoActiveModel, Set};
use std::sync::Arc;
use uuid::Uuid;

use super::RepositoryError;

pub struct ContributorEditRepository {
    db: DatabaseConnection,
    queue: Arc<OperationQueue>,
    clock: Arc<dyn Clock>,
}

impl ContributorEditRepository {
    pub fn new(db: DatabaseConnection, queue: Arc<OperationQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { db, queue, clock }
    }

    pub async fn apply_local_update(
        &self,
        contributor_id: Uuid,
        patch: &ContributorUpdatePayload,
    ) -> Result<contributor::Model, RepositoryError> {
        let current = Contributor::find_by_id(contributor_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(contributor_id))?;

        let mut active = current.into_active_model();
        if let Some(name) = &patch.name {
            active.name = Set(name.clone());
        }
        if let Some(description) = &patch.description {
            active.description = Set(Some(description.clone()));
        }
        if let Some(website) = &patch.website {
            active.website = Set(Some(website.clone()));
        }
        active.sync_state = Set(SyncState::NotSynced);
        active.last_modified = Set(self.clock.now());

        Ok(active.update(&self.db).await?)
    }

    pub async fn enqueue_update(
        &self,
        contributor_id: Uuid,
        patch: &ContributorUpdatePayload,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::ContributorUpdate,
                entity_type: Some(EntityType::Contributor),
                entity_id: Some(contributor_id),
                payload: serde_json::to_value(patch)?,
                batch_key: None,
            })
            .await?)
    }

    pub async fn update_contributor(
        &self,
        contributor_id: Uuid,
        patch: ContributorUpdatePayload,
    ) -> Result<contributor::Model, RepositoryError> {
        let updated = self.apply_local_update(contributor_id, &patch).await?;
        self.enqueue_update(contributor_id, &patch).await?;
        Ok(updated)
    }

    /// Fold `source` into `target`. The local cache keeps both rows until
    /// the next pull confirms the merge; the target is marked unsynced.
    pub async fn merge(
        &self,
        source_id: Uuid,
        target_id: Uuid,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        let target = Contributor::find_by_id(target_id)
            .one(&self.db)
            .await?
            .ok_or(RepositoryError::NotFound(target_id))?;

        let mut active = target.into_active_model();
        active.sync_state = Set(SyncState::NotSynced);
        active.last_modified = Set(self.clock.now());
        active.update(&self.db).await?;

        let payload = MergeContributorPayload {
            source_id,
            target_id,
        };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::MergeContributor,
                entity_type: Some(EntityType::Contributor),
                entity_id: Some(target_id),
                payload: serde_json::to_value(&payload)?,
                batch_key: None,
            })
            .await?)
    }

    /// Undo a previous merge.
    pub async fn unmerge(
        &self,
        contributor_id: Uuid,
        merged_into: Uuid,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        let payload = UnmergeContributorPayload {
            contributor_id,
            merged_into,
        };
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::UnmergeContributor,
                entity_type: Some(EntityType::Contributor),
                entity_id: Some(merged_into),
                payload: serde_json::to_value(&payload)?,
                batch_key: None,
            })
            .await?)
    }
}

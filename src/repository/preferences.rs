//! User preferences repository
//!
//! Preferences are global: no entity id, and at most one pending
//! operation system-wide, merged field-by-field.

use crate::infrastructure::database::entities::pending_operation::OperationType;
use crate::operations::payload::UserPreferencesPayload;
use crate::operations::queue::{EnqueueOutcome, OperationQueue};
use crate::operations::store::NewOperation;
use std::sync::Arc;

use super::RepositoryError;

pub struct PreferencesRepository {
    queue: Arc<OperationQueue>,
}

impl PreferencesRepository {
    pub fn new(queue: Arc<OperationQueue>) -> Self {
        Self { queue }
    }

    pub async fn update_preferences(
        &self,
        patch: UserPreferencesPayload,
    ) -> Result<EnqueueOutcome, RepositoryError> {
        Ok(self
            .queue
            .enqueue(NewOperation {
                operation_type: OperationType::UserPreferences,
                entity_type: None,
                entity_id: None,
                payload: serde_json::to_value(&patch)?,
                batch_key: None,
            })
            .await?)
    }
}

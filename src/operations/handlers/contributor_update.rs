//! Contributor metadata update handler

use crate::api::ContributorApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::ContributorUpdatePayload;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use std::sync::Arc;

use super::{parse_payload, require_contributor, required_entity_id};

pub struct ContributorUpdateHandler {
    api: Arc<dyn ContributorApi>,
    db: DatabaseConnection,
}

impl ContributorUpdateHandler {
    pub fn new(api: Arc<dyn ContributorApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for ContributorUpdateHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::ContributorUpdate
    }

    fn coalesce(&self, existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let existing: ContributorUpdatePayload = parse_payload(&existing)?;
        let incoming: ContributorUpdatePayload = parse_payload(&incoming)?;
        Ok(serde_json::to_value(existing.merged_with(incoming))?)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let contributor_id = required_entity_id(operation)?;
        let patch: ContributorUpdatePayload = parse_payload(&operation.payload)?;

        require_contributor(&self.db, contributor_id).await?;

        self.api.update_contributor(contributor_id, &patch).await?;
        Ok(())
    }
}

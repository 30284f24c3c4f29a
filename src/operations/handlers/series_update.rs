//! Series metadata update handler

use crate::api::SeriesApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::SeriesUpdatePayload;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use std::sync::Arc;

use super::{parse_payload, require_series, required_entity_id};

pub struct SeriesUpdateHandler {
    api: Arc<dyn SeriesApi>,
    db: DatabaseConnection,
}

impl SeriesUpdateHandler {
    pub fn new(api: Arc<dyn SeriesApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for SeriesUpdateHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::SeriesUpdate
    }

    fn coalesce(&self, existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let existing: SeriesUpdatePayload = parse_payload(&existing)?;
        let incoming: SeriesUpdatePayload = parse_payload(&incoming)?;
        Ok(serde_json::to_value(existing.merged_with(incoming))?)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let series_id = required_entity_id(operation)?;
        let patch: SeriesUpdatePayload = parse_payload(&operation.payload)?;

        require_series(&self.db, series_id).await?;

        self.api.update_series(series_id, &patch).await?;
        Ok(())
    }
}

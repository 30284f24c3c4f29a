//! User preferences handler
//!
//! Global: no entity id, at most one pending operation system-wide. The
//! server applies last-write-wins, so no conflict tracking either.

use crate::api::UserApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::UserPreferencesPayload;
use async_trait::async_trait;
use serde_json::Value as Json;
use std::sync::Arc;

use super::parse_payload;

pub struct UserPreferencesHandler {
    api: Arc<dyn UserApi>,
}

impl UserPreferencesHandler {
    pub fn new(api: Arc<dyn UserApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OperationHandler for UserPreferencesHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::UserPreferences
    }

    fn coalesce(&self, existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let existing: UserPreferencesPayload = parse_payload(&existing)?;
        let incoming: UserPreferencesPayload = parse_payload(&incoming)?;
        Ok(serde_json::to_value(existing.merged_with(incoming))?)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let patch: UserPreferencesPayload = parse_payload(&operation.payload)?;
        self.api.update_preferences(&patch).await?;
        Ok(())
    }
}

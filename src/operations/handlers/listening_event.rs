//! Listening event handler
//!
//! Append-only and batchable: events sharing a session batch key go to the
//! server in one call, oldest first. Retried batches cannot double-count
//! because the server dedups on each event's `event_id`.

use crate::api::UserApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::ListeningEventPayload;
use async_trait::async_trait;
use std::sync::Arc;

use super::parse_payload;

pub struct ListeningEventHandler {
    api: Arc<dyn UserApi>,
}

impl ListeningEventHandler {
    pub fn new(api: Arc<dyn UserApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OperationHandler for ListeningEventHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::ListeningEvent
    }

    fn supports_batching(&self) -> bool {
        true
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let event: ListeningEventPayload = parse_payload(&operation.payload)?;
        self.api.submit_listening_events(&[event]).await?;
        Ok(())
    }

    async fn execute_batch(
        &self,
        operations: &[pending_operation::Model],
    ) -> Result<(), HandlerFailure> {
        let events = operations
            .iter()
            .map(|op| parse_payload::<ListeningEventPayload>(&op.payload))
            .collect::<Result<Vec<_>, _>>()?;

        self.api.submit_listening_events(&events).await?;
        Ok(())
    }
}

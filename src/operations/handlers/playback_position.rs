//! Playback position handler
//!
//! Positions coalesce by book: only the most recent report is worth
//! pushing, so the incoming payload supersedes the queued one wholesale.

use crate::api::UserApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::PlaybackPositionPayload;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use std::sync::Arc;

use super::{parse_payload, require_book, required_entity_id};

pub struct PlaybackPositionHandler {
    api: Arc<dyn UserApi>,
    db: DatabaseConnection,
}

impl PlaybackPositionHandler {
    pub fn new(api: Arc<dyn UserApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for PlaybackPositionHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::PlaybackPosition
    }

    fn coalesce(&self, _existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        // Validate before replacing; the position is complete state.
        let _: PlaybackPositionPayload = parse_payload(&incoming)?;
        Ok(incoming)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let book_id = required_entity_id(operation)?;
        let position: PlaybackPositionPayload = parse_payload(&operation.payload)?;

        require_book(&self.db, book_id).await?;

        self.api.report_playback_position(&position).await?;
        Ok(())
    }
}

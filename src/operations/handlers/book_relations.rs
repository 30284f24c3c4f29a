//! Handlers for a book's contributor and series lists
//!
//! Both are replace-entire: the payload is the complete desired list, and a
//! second request overwrites the queued one wholesale. Last write wins on
//! the whole list, never a field-by-field merge.

use crate::api::BookApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::{SetBookContributorsPayload, SetBookSeriesPayload};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use std::sync::Arc;

use super::{parse_payload, require_book, required_entity_id};

pub struct SetBookContributorsHandler {
    api: Arc<dyn BookApi>,
    db: DatabaseConnection,
}

impl SetBookContributorsHandler {
    pub fn new(api: Arc<dyn BookApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for SetBookContributorsHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::SetBookContributors
    }

    fn coalesce(&self, _existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let _: SetBookContributorsPayload = parse_payload(&incoming)?;
        Ok(incoming)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let book_id = required_entity_id(operation)?;
        let payload: SetBookContributorsPayload = parse_payload(&operation.payload)?;

        require_book(&self.db, book_id).await?;

        self.api
            .set_book_contributors(book_id, &payload.contributors)
            .await?;
        Ok(())
    }
}

pub struct SetBookSeriesHandler {
    api: Arc<dyn BookApi>,
    db: DatabaseConnection,
}

impl SetBookSeriesHandler {
    pub fn new(api: Arc<dyn BookApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for SetBookSeriesHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::SetBookSeries
    }

    fn coalesce(&self, _existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let _: SetBookSeriesPayload = parse_payload(&incoming)?;
        Ok(incoming)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let book_id = required_entity_id(operation)?;
        let payload: SetBookSeriesPayload = parse_payload(&operation.payload)?;

        require_book(&self.db, book_id).await?;

        self.api.set_book_series(book_id, &payload.series).await?;
        Ok(())
    }
}

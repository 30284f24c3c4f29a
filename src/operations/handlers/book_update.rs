//! Book metadata update handler

use crate::api::BookApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::BookUpdatePayload;
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use serde_json::Value as Json;
use std::sync::Arc;

use super::{parse_payload, require_book, required_entity_id};

pub struct BookUpdateHandler {
    api: Arc<dyn BookApi>,
    db: DatabaseConnection,
}

impl BookUpdateHandler {
    pub fn new(api: Arc<dyn BookApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for BookUpdateHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::BookUpdate
    }

    fn coalesce(&self, existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let existing: BookUpdatePayload = parse_payload(&existing)?;
        let incoming: BookUpdatePayload = parse_payload(&incoming)?;
        Ok(serde_json::to_value(existing.merged_with(incoming))?)
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let book_id = required_entity_id(operation)?;
        let patch: BookUpdatePayload = parse_payload(&operation.payload)?;

        require_book(&self.db, book_id).await?;

        self.api.update_book(book_id, &patch).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn handler_for_coalesce() -> BookUpdateHandler {
        // Coalesce is pure; the api/db are never touched.
        struct Dead;
        #[async_trait]
        impl BookApi for Dead {
            async fn update_book(
                &self,
                _: uuid::Uuid,
                _: &BookUpdatePayload,
            ) -> crate::api::ApiResult {
                unreachable!()
            }
            async fn set_book_contributors(
                &self,
                _: uuid::Uuid,
                _: &[crate::operations::payload::ContributorRole],
            ) -> crate::api::ApiResult {
                unreachable!()
            }
            async fn set_book_series(
                &self,
                _: uuid::Uuid,
                _: &[crate::operations::payload::SeriesPlacement],
            ) -> crate::api::ApiResult {
                unreachable!()
            }
        }
        BookUpdateHandler::new(Arc::new(Dead), DatabaseConnection::Disconnected)
    }

    #[test]
    fn coalesce_merges_patches_with_newer_fields_winning() {
        let handler = handler_for_coalesce();

        let merged = handler
            .coalesce(
                json!({ "title": "First", "subtitle": "Kept" }),
                json!({ "title": "Second", "language": "de" }),
            )
            .unwrap();

        let merged: BookUpdatePayload = serde_json::from_value(merged).unwrap();
        assert_eq!(merged.title.as_deref(), Some("Second"));
        assert_eq!(merged.subtitle.as_deref(), Some("Kept"));
        assert_eq!(merged.language.as_deref(), Some("de"));
    }

    #[test]
    fn coalesce_rejects_malformed_payloads() {
        let handler = handler_for_coalesce();
        let result = handler.coalesce(json!({ "published_year": "not a year" }), json!({}));
        assert!(matches!(result, Err(HandlerFailure::Payload(_))));
    }
}

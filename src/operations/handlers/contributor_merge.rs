//! Contributor merge/unmerge handlers
//!
//! Never coalesced: a merge followed by an unmerge must reach the server in
//! that order, so each request is its own queue row.

use crate::api::ContributorApi;
use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use crate::operations::error::HandlerFailure;
use crate::operations::handler::OperationHandler;
use crate::operations::payload::{MergeContributorPayload, UnmergeContributorPayload};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use super::{parse_payload, require_contributor};

pub struct MergeContributorHandler {
    api: Arc<dyn ContributorApi>,
    db: DatabaseConnection,
}

impl MergeContributorHandler {
    pub fn new(api: Arc<dyn ContributorApi>, db: DatabaseConnection) -> Self {
        Self { api, db }
    }
}

#[async_trait]
impl OperationHandler for MergeContributorHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::MergeContributor
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let payload: MergeContributorPayload = parse_payload(&operation.payload)?;

        // The merge target must still exist; the source may already have
        // been folded away locally by a pull.
        require_contributor(&self.db, payload.target_id).await?;

        self.api
            .merge_contributor(payload.source_id, payload.target_id)
            .await?;
        Ok(())
    }
}

pub struct UnmergeContributorHandler {
    api: Arc<dyn ContributorApi>,
}

impl UnmergeContributorHandler {
    pub fn new(api: Arc<dyn ContributorApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl OperationHandler for UnmergeContributorHandler {
    fn operation_type(&self) -> OperationType {
        OperationType::UnmergeContributor
    }

    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure> {
        let payload: UnmergeContributorPayload = parse_payload(&operation.payload)?;

        // No local existence check: the contributor being split back out is
        // not expected in the cache until the next pull.
        self.api
            .unmerge_contributor(payload.contributor_id, payload.merged_into)
            .await?;
        Ok(())
    }
}

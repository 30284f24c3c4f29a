//! Concrete operation handlers, one per operation type
//!
//! Handlers only read the local cache and call their API port; queue state
//! transitions stay with the store.

use crate::api::ApiClients;
use crate::infrastructure::database::entities::{self, pending_operation};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::de::DeserializeOwned;
use serde_json::Value as Json;
use std::sync::Arc;
use uuid::Uuid;

use super::error::HandlerFailure;
use super::handler::HandlerRegistry;

mod book_relations;
mod book_update;
mod contributor_merge;
mod contributor_update;
mod listening_event;
mod playback_position;
mod series_update;
mod user_preferences;

pub use book_relations::{SetBookContributorsHandler, SetBookSeriesHandler};
pub use book_update::BookUpdateHandler;
pub use contributor_merge::{MergeContributorHandler, UnmergeContributorHandler};
pub use contributor_update::ContributorUpdateHandler;
pub use listening_event::ListeningEventHandler;
pub use playback_position::PlaybackPositionHandler;
pub use series_update::SeriesUpdateHandler;
pub use user_preferences::UserPreferencesHandler;

/// Build the full registry: every operation type gets its handler here,
/// wired against the API ports and the local cache connection.
pub fn build_registry(api: ApiClients, db: DatabaseConnection) -> HandlerRegistry {
    HandlerRegistry::new(vec![
        Arc::new(BookUpdateHandler::new(api.books.clone(), db.clone())),
        Arc::new(ContributorUpdateHandler::new(
            api.contributors.clone(),
            db.clone(),
        )),
        Arc::new(SeriesUpdateHandler::new(api.series.clone(), db.clone())),
        Arc::new(PlaybackPositionHandler::new(api.user.clone(), db.clone())),
        Arc::new(SetBookContributorsHandler::new(
            api.books.clone(),
            db.clone(),
        )),
        Arc::new(SetBookSeriesHandler::new(api.books.clone(), db.clone())),
        Arc::new(MergeContributorHandler::new(
            api.contributors.clone(),
            db.clone(),
        )),
        Arc::new(UnmergeContributorHandler::new(api.contributors.clone())),
        Arc::new(ListeningEventHandler::new(api.user.clone())),
        Arc::new(UserPreferencesHandler::new(api.user.clone())),
    ])
}

/// Deserialize a payload blob. A failure here is a programmer error
/// (the queue only stores what the payload types serialized).
pub(crate) fn parse_payload<T: DeserializeOwned>(payload: &Json) -> Result<T, HandlerFailure> {
    Ok(serde_json::from_value(payload.clone())?)
}

pub(crate) fn required_entity_id(
    operation: &pending_operation::Model,
) -> Result<Uuid, HandlerFailure> {
    operation.entity_id.ok_or_else(|| {
        HandlerFailure::Unsupported(format!(
            "{:?} operation queued without an entity id",
            operation.operation_type
        ))
    })
}

/// The edge-case policy for entities deleted out from under the queue:
/// a terminal, user-visible failure rather than a silent drop or a panic.
pub(crate) async fn require_book(
    db: &DatabaseConnection,
    book_id: Uuid,
) -> Result<(), HandlerFailure> {
    match entities::Book::find_by_id(book_id).one(db).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HandlerFailure::EntityMissing { entity_id: book_id }),
        Err(e) => Err(HandlerFailure::Transient(e.to_string())),
    }
}

pub(crate) async fn require_contributor(
    db: &DatabaseConnection,
    contributor_id: Uuid,
) -> Result<(), HandlerFailure> {
    match entities::Contributor::find_by_id(contributor_id).one(db).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HandlerFailure::EntityMissing {
            entity_id: contributor_id,
        }),
        Err(e) => Err(HandlerFailure::Transient(e.to_string())),
    }
}

pub(crate) async fn require_series(
    db: &DatabaseConnection,
    series_id: Uuid,
) -> Result<(), HandlerFailure> {
    match entities::Series::find_by_id(series_id).one(db).await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(HandlerFailure::EntityMissing {
            entity_id: series_id,
        }),
        Err(e) => Err(HandlerFailure::Transient(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiFailure, ApiResult};
    use crate::operations::payload::*;
    use crate::operations::OperationType;
    use async_trait::async_trait;
    use strum::IntoEnumIterator;

    struct NoopApi;

    #[async_trait]
    impl crate::api::BookApi for NoopApi {
        async fn update_book(&self, _: Uuid, _: &BookUpdatePayload) -> ApiResult {
            Ok(())
        }
        async fn set_book_contributors(&self, _: Uuid, _: &[ContributorRole]) -> ApiResult {
            Ok(())
        }
        async fn set_book_series(&self, _: Uuid, _: &[SeriesPlacement]) -> ApiResult {
            Ok(())
        }
    }

    #[async_trait]
    impl crate::api::ContributorApi for NoopApi {
        async fn update_contributor(&self, _: Uuid, _: &ContributorUpdatePayload) -> ApiResult {
            Ok(())
        }
        async fn merge_contributor(&self, _: Uuid, _: Uuid) -> ApiResult {
            Ok(())
        }
        async fn unmerge_contributor(&self, _: Uuid, _: Uuid) -> ApiResult {
            Ok(())
        }
    }

    #[async_trait]
    impl crate::api::SeriesApi for NoopApi {
        async fn update_series(&self, _: Uuid, _: &SeriesUpdatePayload) -> ApiResult {
            Ok(())
        }
    }

    #[async_trait]
    impl crate::api::UserApi for NoopApi {
        async fn report_playback_position(&self, _: &PlaybackPositionPayload) -> ApiResult {
            Ok(())
        }
        async fn submit_listening_events(&self, _: &[ListeningEventPayload]) -> ApiResult {
            Ok(())
        }
        async fn update_preferences(&self, _: &UserPreferencesPayload) -> ApiResult {
            Ok(())
        }
    }

    fn noop_clients() -> ApiClients {
        let api = Arc::new(NoopApi);
        ApiClients {
            books: api.clone(),
            contributors: api.clone(),
            series: api.clone(),
            user: api,
        }
    }

    #[tokio::test]
    async fn every_operation_type_has_a_registered_handler() {
        let db = crate::infrastructure::database::Database::open_in_memory()
            .await
            .unwrap();
        let registry = build_registry(noop_clients(), db.conn().clone());

        for operation_type in OperationType::iter() {
            assert!(
                registry.get(operation_type).is_some(),
                "no handler registered for {:?}",
                operation_type
            );
        }
    }

    #[test]
    fn api_failures_classify_retryability() {
        let transient: HandlerFailure = ApiFailure::Network("connection refused".into()).into();
        assert!(transient.is_retryable());

        let terminal: HandlerFailure = ApiFailure::Rejected {
            status: 422,
            message: "title must not be empty".into(),
        }
        .into();
        assert!(!terminal.is_retryable());
    }
}

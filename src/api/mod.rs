//! Server API boundary
//!
//! The crate never wires HTTP itself; the platform shell supplies
//! implementations of these ports. One network call per handler execute.
//! Failures come back typed so handlers can classify retryability.

use crate::operations::payload::{
    BookUpdatePayload, ContributorRole, ContributorUpdatePayload, ListeningEventPayload,
    PlaybackPositionPayload, SeriesPlacement, SeriesUpdatePayload, UserPreferencesPayload,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Structured failure from a server call.
#[derive(Error, Debug, Clone)]
pub enum ApiFailure {
    /// Transport-level problem: timeout, connection refused, offline.
    #[error("Network error: {0}")]
    Network(String),

    /// The server answered and said no.
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

pub type ApiResult = Result<(), ApiFailure>;

#[async_trait]
pub trait BookApi: Send + Sync {
    async fn update_book(&self, book_id: Uuid, patch: &BookUpdatePayload) -> ApiResult;
    async fn set_book_contributors(
        &self,
        book_id: Uuid,
        contributors: &[ContributorRole],
    ) -> ApiResult;
    async fn set_book_series(&self, book_id: Uuid, series: &[SeriesPlacement]) -> ApiResult;
}

#[async_trait]
pub trait ContributorApi: Send + Sync {
    async fn update_contributor(
        &self,
        contributor_id: Uuid,
        patch: &ContributorUpdatePayload,
    ) -> ApiResult;
    async fn merge_contributor(&self, source_id: Uuid, target_id: Uuid) -> ApiResult;
    async fn unmerge_contributor(&self, contributor_id: Uuid, merged_into: Uuid) -> ApiResult;
}

#[async_trait]
pub trait SeriesApi: Send + Sync {
    async fn update_series(&self, series_id: Uuid, patch: &SeriesUpdatePayload) -> ApiResult;
}

#[async_trait]
pub trait UserApi: Send + Sync {
    async fn report_playback_position(&self, position: &PlaybackPositionPayload) -> ApiResult;
    async fn submit_listening_events(&self, events: &[ListeningEventPayload]) -> ApiResult;
    async fn update_preferences(&self, patch: &UserPreferencesPayload) -> ApiResult;
}

/// The bundle of ports the handlers are wired with.
#[derive(Clone)]
pub struct ApiClients {
    pub books: Arc<dyn BookApi>,
    pub contributors: Arc<dyn ContributorApi>,
    pub series: Arc<dyn SeriesApi>,
    pub user: Arc<dyn UserApi>,
}

/// Server-side view of a book, as delivered by pull sync. Only the fields
/// the conflict rule and the cache writer need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteBook {
    pub id: Uuid,
    pub title: String,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub isbn: Option<String>,
    pub explicit: bool,
    pub abridged: bool,
    pub duration_seconds: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteContributor {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub website: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSeries {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub updated_at: DateTime<Utc>,
}

//! Test support: a scriptable server API and a fully wired in-memory core
//!
//! Used by the crate's unit tests and the integration tests under
//! `tests/`; platform shells can reuse it for their own sync tests.

use crate::api::{ApiClients, ApiFailure, ApiResult};
use crate::config::SyncConfig;
use crate::infrastructure::database::Database;
use crate::operations::payload::{
    BookUpdatePayload, ContributorRole, ContributorUpdatePayload, ListeningEventPayload,
    PlaybackPositionPayload, SeriesPlacement, SeriesUpdatePayload, UserPreferencesPayload,
};
use crate::operations::queue::OperationQueue;
use crate::operations::store::PendingOperationStore;
use crate::shared::FixedClock;
use crate::SyncCore;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// One recorded server call, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    UpdateBook(Uuid),
    SetBookContributors(Uuid, usize),
    SetBookSeries(Uuid, usize),
    UpdateContributor(Uuid),
    MergeContributor(Uuid, Uuid),
    UnmergeContributor(Uuid, Uuid),
    UpdateSeries(Uuid),
    ReportPlaybackPosition(Uuid),
    SubmitListeningEvents(usize),
    UpdatePreferences,
}

/// In-memory server double: records every call and can be scripted to
/// fail upcoming calls in order.
#[derive(Default)]
pub struct MockApi {
    calls: Mutex<Vec<ApiCall>>,
    scripted_failures: Mutex<VecDeque<ApiFailure>>,
}

impl MockApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn clients(self: &Arc<Self>) -> ApiClients {
        ApiClients {
            books: self.clone(),
            contributors: self.clone(),
            series: self.clone(),
            user: self.clone(),
        }
    }

    /// Script the next call to fail with `failure`; queued failures are
    /// consumed in order, then calls succeed again.
    pub fn fail_next(&self, failure: ApiFailure) {
        self.scripted_failures.lock().unwrap().push_back(failure);
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    fn record(&self, call: ApiCall) -> ApiResult {
        self.calls.lock().unwrap().push(call);
        match self.scripted_failures.lock().unwrap().pop_front() {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl crate::api::BookApi for MockApi {
    async fn update_book(&self, book_id: Uuid, _patch: &BookUpdatePayload) -> ApiResult {
        self.record(ApiCall::UpdateBook(book_id))
    }

    async fn set_book_contributors(
        &self,
        book_id: Uuid,
        contributors: &[ContributorRole],
    ) -> ApiResult {
        self.record(ApiCall::SetBookContributors(book_id, contributors.len()))
    }

    async fn set_book_series(&self, book_id: Uuid, series: &[SeriesPlacement]) -> ApiResult {
        self.record(ApiCall::SetBookSeries(book_id, series.len()))
    }
}

#[async_trait]
impl crate::api::ContributorApi for MockApi {
    async fn update_contributor(
        &self,
        contributor_id: Uuid,
        _patch: &ContributorUpdatePayload,
    ) -> ApiResult {
        self.record(ApiCall::UpdateContributor(contributor_id))
    }

    async fn merge_contributor(&self, source_id: Uuid, target_id: Uuid) -> ApiResult {
        self.record(ApiCall::MergeContributor(source_id, target_id))
    }

    async fn unmerge_contributor(&self, contributor_id: Uuid, merged_into: Uuid) -> ApiResult {
        self.record(ApiCall::UnmergeContributor(contributor_id, merged_into))
    }
}

#[async_trait]
impl crate::api::SeriesApi for MockApi {
    async fn update_series(&self, series_id: Uuid, _patch: &SeriesUpdatePayload) -> ApiResult {
        self.record(ApiCall::UpdateSeries(series_id))
    }
}

#[async_trait]
impl crate::api::UserApi for MockApi {
    async fn report_playback_position(&self, position: &PlaybackPositionPayload) -> ApiResult {
        self.record(ApiCall::ReportPlaybackPosition(position.book_id))
    }

    async fn submit_listening_events(&self, events: &[ListeningEventPayload]) -> ApiResult {
        self.record(ApiCall::SubmitListeningEvents(events.len()))
    }

    async fn update_preferences(&self, _patch: &UserPreferencesPayload) -> ApiResult {
        self.record(ApiCall::UpdatePreferences)
    }
}

/// A fully wired core over an in-memory database, a pinned clock, and a
/// [`MockApi`], migrated and crash-recovered like a real startup.
pub struct TestHarness {
    pub core: SyncCore,
    pub api: Arc<MockApi>,
    pub clock: Arc<FixedClock>,
    pub store: Arc<PendingOperationStore>,
    pub queue: Arc<OperationQueue>,
}

impl TestHarness {
    pub async fn new() -> Self {
        Self::with_config(SyncConfig::default()).await
    }

    pub async fn with_config(config: SyncConfig) -> Self {
        let db = Database::open_in_memory()
            .await
            .expect("in-memory database");
        let api = MockApi::new();
        let clock = Arc::new(FixedClock::at_epoch());

        let core = SyncCore::new(db, api.clients(), config, clock.clone());
        core.init().await.expect("core init");

        let store = core.store().clone();
        let queue = core.queue().clone();
        Self {
            core,
            api,
            clock,
            store,
            queue,
        }
    }
}

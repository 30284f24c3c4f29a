//! Fable client core
//!
//! Shared, platform-independent logic for the Fable audiobook app: a local
//! SQLite cache, an offline-first pending-operation queue with per-type
//! coalescing and batching, timestamp-based conflict detection against
//! server state, and the push-sync orchestration that drains the queue.
//!
//! The crate has no process entry point; platform shells embed a
//! [`SyncCore`], supply the server API ports, and decide when sync passes
//! run.

pub mod api;
pub mod config;
pub mod infrastructure;
pub mod operations;
pub mod repository;
pub mod shared;
pub mod sync;
pub mod testing;

pub use config::{PushConflictPolicy, SyncConfig};
pub use infrastructure::events::{EventBus, QueueEvent};
pub use sync::{PushConflict, SyncError, SyncReport};

use crate::api::ApiClients;
use crate::infrastructure::database::Database;
use crate::operations::handler::HandlerRegistry;
use crate::operations::handlers::build_registry;
use crate::operations::queue::OperationQueue;
use crate::operations::store::PendingOperationStore;
use crate::operations::StoreError;
use crate::repository::{
    BookEditRepository, ContributorEditRepository, ListeningRepository, PreferencesRepository,
    SeriesEditRepository,
};
use crate::shared::{Clock, SystemClock};
use crate::sync::conflict::ConflictDetector;
use crate::sync::push::PushSyncOrchestrator;
use sea_orm::DatabaseConnection;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// The wired-up client core: database, queue, handlers, conflict
/// detection, push orchestration, and the edit repositories.
pub struct SyncCore {
    db: Database,
    events: Arc<EventBus>,
    store: Arc<PendingOperationStore>,
    registry: Arc<HandlerRegistry>,
    queue: Arc<OperationQueue>,
    conflicts: Arc<ConflictDetector>,
    push: PushSyncOrchestrator,
    books: BookEditRepository,
    contributors: ContributorEditRepository,
    series: SeriesEditRepository,
    listening: ListeningRepository,
    preferences: PreferencesRepository,
}

impl SyncCore {
    /// Wire the core over an open database. No I/O; call [`Self::init`]
    /// before first use.
    pub fn new(
        db: Database,
        api: ApiClients,
        config: SyncConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let conn = db.conn().clone();
        let events = Arc::new(EventBus::default());
        let store = Arc::new(PendingOperationStore::new(
            conn.clone(),
            events.clone(),
            clock.clone(),
        ));
        let registry = Arc::new(build_registry(api, conn.clone()));
        let queue = Arc::new(OperationQueue::new(store.clone(), registry.clone()));
        let conflicts = Arc::new(ConflictDetector::new(conn.clone()));
        let push = PushSyncOrchestrator::new(
            store.clone(),
            registry.clone(),
            conflicts.clone(),
            events.clone(),
            conn.clone(),
            config,
        );

        let books = BookEditRepository::new(conn.clone(), queue.clone(), clock.clone());
        let contributors =
            ContributorEditRepository::new(conn.clone(), queue.clone(), clock.clone());
        let series = SeriesEditRepository::new(conn.clone(), queue.clone(), clock.clone());
        let listening = ListeningRepository::new(conn.clone(), queue.clone(), clock.clone());
        let preferences = PreferencesRepository::new(queue.clone());

        Self {
            db,
            events,
            store,
            registry,
            queue,
            conflicts,
            push,
            books,
            contributors,
            series,
            listening,
            preferences,
        }
    }

    /// Open the cache database at `path` and wire the core with the
    /// system clock.
    pub async fn open(
        path: &Path,
        api: ApiClients,
        config: SyncConfig,
    ) -> Result<Self, sea_orm::DbErr> {
        let db = Database::open(path).await?;
        Ok(Self::new(db, api, config, Arc::new(SystemClock)))
    }

    /// Run migrations and the crash-recovery reset. Must complete before
    /// any sync pass or enqueue.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.db.migrate().await?;
        let reset = self.store.reset_stuck_operations().await?;
        info!(stuck_reset = reset, "Sync core initialized");
        Ok(())
    }

    pub fn db(&self) -> &DatabaseConnection {
        self.db.conn()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn store(&self) -> &Arc<PendingOperationStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<OperationQueue> {
        &self.queue
    }

    pub fn conflicts(&self) -> &Arc<ConflictDetector> {
        &self.conflicts
    }

    pub fn push(&self) -> &PushSyncOrchestrator {
        &self.push
    }

    pub fn books(&self) -> &BookEditRepository {
        &self.books
    }

    pub fn contributors(&self) -> &ContributorEditRepository {
        &self.contributors
    }

    pub fn series(&self) -> &SeriesEditRepository {
        &self.series
    }

    pub fn listening(&self) -> &ListeningRepository {
        &self.listening
    }

    pub fn preferences(&self) -> &PreferencesRepository {
        &self.preferences
    }
}

/// Install a global tracing subscriber honoring `RUST_LOG`. For shells
/// that do not bring their own.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

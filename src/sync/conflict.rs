//! Conflict detection
//!
//! Local edits and pull-sync writes touch the same cached rows with no
//! locking between them; the timestamp rule here is the sole consistency
//! mechanism. Timestamps instead of version vectors keep the client simple
//! and accept a sub-millisecond race window, a fair trade for a
//! single-user-per-device app that favors availability over strictness.

use crate::api::{RemoteBook, RemoteContributor, RemoteSeries};
use crate::infrastructure::database::entities::{self, pending_operation, SyncState};
use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use uuid::Uuid;

use super::SyncError;

/// Advisory conflict on a queued push: the server changed the entity after
/// the local edit was queued. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConflict {
    pub operation_id: Uuid,
    pub reason: String,
}

/// The core rule. Strict `>`: equal timestamps favor the local edit.
pub fn local_edit_is_stale(
    server_updated_at: DateTime<Utc>,
    local_last_modified: DateTime<Utc>,
) -> bool {
    server_updated_at > local_last_modified
}

/// Sync metadata shared by every conflict-tracked entity row.
#[derive(Debug, Clone, Copy)]
struct LocalMeta {
    sync_state: SyncState,
    last_modified: DateTime<Utc>,
    server_updated_at: DateTime<Utc>,
}

fn conflicts(meta: Option<LocalMeta>, server_updated_at: DateTime<Utc>) -> bool {
    match meta {
        // Nothing pending locally, or nothing cached at all: no conflict
        // is possible.
        None => false,
        Some(meta) => {
            meta.sync_state == SyncState::NotSynced
                && local_edit_is_stale(server_updated_at, meta.last_modified)
        }
    }
}

pub struct ConflictDetector {
    db: DatabaseConnection,
}

impl ConflictDetector {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Whether a pull-sync write should leave the local row alone: true
    /// when the row carries an unsynced edit the server version does not
    /// supersede.
    pub async fn should_preserve_local_changes(
        &self,
        server: &RemoteBook,
    ) -> Result<bool, SyncError> {
        let Some(meta) = self.book_meta(server.id).await? else {
            return Ok(false);
        };
        Ok(meta.sync_state == SyncState::NotSynced
            && !local_edit_is_stale(server.updated_at, meta.last_modified))
    }

    /// Batch form for a pull pass: every book where the server version
    /// supersedes an unsynced local edit, with the server timestamp, for
    /// reporting.
    pub async fn detect_book_conflicts(
        &self,
        server_books: &[RemoteBook],
    ) -> Result<Vec<(Uuid, DateTime<Utc>)>, SyncError> {
        let mut found = Vec::new();
        for server in server_books {
            if conflicts(self.book_meta(server.id).await?, server.updated_at) {
                found.push((server.id, server.updated_at));
            }
        }
        Ok(found)
    }

    pub async fn detect_contributor_conflicts(
        &self,
        server_contributors: &[RemoteContributor],
    ) -> Result<Vec<(Uuid, DateTime<Utc>)>, SyncError> {
        let mut found = Vec::new();
        for server in server_contributors {
            if conflicts(self.contributor_meta(server.id).await?, server.updated_at) {
                found.push((server.id, server.updated_at));
            }
        }
        Ok(found)
    }

    pub async fn detect_series_conflicts(
        &self,
        server_series: &[RemoteSeries],
    ) -> Result<Vec<(Uuid, DateTime<Utc>)>, SyncError> {
        let mut found = Vec::new();
        for server in server_series {
            if conflicts(self.series_meta(server.id).await?, server.updated_at) {
                found.push((server.id, server.updated_at));
            }
        }
        Ok(found)
    }

    /// Push-side framing: was the entity updated on the server *after*
    /// this operation was queued? If so the queued payload was computed
    /// against stale assumptions. Advisory only; the orchestrator decides
    /// policy. Entity types without server-version tracking (user-scoped
    /// operations, which are last-write-wins at the server) never conflict.
    pub async fn check_push_conflict(
        &self,
        operation: &pending_operation::Model,
    ) -> Result<Option<PushConflict>, SyncError> {
        let (Some(entity_type), Some(entity_id)) = (operation.entity_type, operation.entity_id)
        else {
            return Ok(None);
        };

        let meta = match entity_type {
            pending_operation::EntityType::Book => self.book_meta(entity_id).await?,
            pending_operation::EntityType::Contributor => {
                self.contributor_meta(entity_id).await?
            }
            pending_operation::EntityType::Series => self.series_meta(entity_id).await?,
            pending_operation::EntityType::User | pending_operation::EntityType::Shelf => None,
        };

        let Some(meta) = meta else { return Ok(None) };

        if meta.server_updated_at > operation.created_at {
            Ok(Some(PushConflict {
                operation_id: operation.id,
                reason: format!(
                    "server updated {:?} {} at {}, after this change was queued at {}",
                    entity_type, entity_id, meta.server_updated_at, operation.created_at
                ),
            }))
        } else {
            Ok(None)
        }
    }

    async fn book_meta(&self, id: Uuid) -> Result<Option<LocalMeta>, SyncError> {
        Ok(entities::Book::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|b| LocalMeta {
                sync_state: b.sync_state,
                last_modified: b.last_modified,
                server_updated_at: b.server_updated_at,
            }))
    }

    async fn contributor_meta(&self, id: Uuid) -> Result<Option<LocalMeta>, SyncError> {
        Ok(entities::Contributor::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|c| LocalMeta {
                sync_state: c.sync_state,
                last_modified: c.last_modified,
                server_updated_at: c.server_updated_at,
            }))
    }

    async fn series_meta(&self, id: Uuid) -> Result<Option<LocalMeta>, SyncError> {
        Ok(entities::Series::find_by_id(id)
            .one(&self.db)
            .await?
            .map(|s| LocalMeta {
                sync_state: s.sync_state,
                last_modified: s.last_modified,
                server_updated_at: s.server_updated_at,
            }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[test]
    fn server_newer_than_local_edit_is_stale() {
        assert!(local_edit_is_stale(ts(150), ts(100)));
    }

    #[test]
    fn equal_timestamps_favor_local() {
        assert!(!local_edit_is_stale(ts(100), ts(100)));
    }

    #[test]
    fn older_server_version_never_supersedes() {
        assert!(!local_edit_is_stale(ts(50), ts(100)));
    }

    #[test]
    fn synced_rows_never_conflict_regardless_of_timestamps() {
        let meta = LocalMeta {
            sync_state: SyncState::Synced,
            last_modified: ts(100),
            server_updated_at: ts(100),
        };
        assert!(!conflicts(Some(meta), ts(150)));
    }

    #[test]
    fn unsynced_row_conflicts_only_when_server_is_newer() {
        let meta = LocalMeta {
            sync_state: SyncState::NotSynced,
            last_modified: ts(100),
            server_updated_at: ts(100),
        };
        assert!(conflicts(Some(meta), ts(150)));
        assert!(!conflicts(Some(meta), ts(100)));
        assert!(!conflicts(Some(meta), ts(50)));
    }

    #[test]
    fn missing_local_row_means_no_conflict() {
        assert!(!conflicts(None, ts(150)));
    }
}

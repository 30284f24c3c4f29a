//! Shared fixtures for integration tests

use chrono::{DateTime, Utc};
use fable_core::infrastructure::database::entities::{book, contributor, SyncState};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use uuid::Uuid;

pub async fn seed_book(db: &DatabaseConnection, now: DateTime<Utc>) -> Uuid {
    let id = Uuid::new_v4();
    book::ActiveModel {
        id: Set(id),
        title: Set("The Long Way Home".into()),
        subtitle: Set(None),
        description: Set(None),
        publisher: Set(None),
        published_year: Set(Some(2019)),
        language: Set(Some("en".into())),
        isbn: Set(None),
        explicit: Set(false),
        abridged: Set(false),
        duration_seconds: Set(34_200.0),
        sync_state: Set(SyncState::Synced),
        last_modified: Set(now),
        server_updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed book");
    id
}

pub async fn seed_contributor(db: &DatabaseConnection, now: DateTime<Utc>) -> Uuid {
    let id = Uuid::new_v4();
    contributor::ActiveModel {
        id: Set(id),
        name: Set("Alex Morrow".into()),
        description: Set(None),
        website: Set(None),
        sync_state: Set(SyncState::Synced),
        last_modified: Set(now),
        server_updated_at: Set(now),
    }
    .insert(db)
    .await
    .expect("seed contributor");
    id
}

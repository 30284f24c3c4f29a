//! Cached book entity
//!
//! `last_modified` is stamped by the repository on every optimistic local
//! edit; `server_updated_at` is the last server-reported modification time,
//! written during pull sync. The conflict rule compares the two.

use super::SyncState;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "books")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
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

    #[sea_orm(indexed)]
    pub sync_state: SyncState,
    pub last_modified: DateTimeUtc,
    pub server_updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

//! Pending operation entity: the durable push queue
//!
//! One row per not-yet-synced local mutation. The queue survives process
//! restarts, which is what makes the crash-recovery reset possible.

use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "pending_operations")]
pub struct Model {
    /// Stable across retries.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(indexed)]
    pub operation_type: OperationType,

    #[sea_orm(indexed, nullable)]
    pub entity_type: Option<EntityType>,

    /// Absent for global operations such as user preferences.
    #[sea_orm(indexed, nullable)]
    pub entity_id: Option<Uuid>,

    /// Operation-specific data; shape depends on `operation_type`.
    #[sea_orm(column_type = "Json")]
    pub payload: Json,

    /// Operations sharing a key may be grouped into one server call.
    #[sea_orm(indexed, nullable)]
    pub batch_key: Option<String>,

    #[sea_orm(indexed)]
    pub status: OperationStatus,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,

    pub attempt_count: i32,
    pub last_error: Option<String>,
}

/// How enqueue treats a new request when one is already queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoalescePolicy {
    /// Field-level merge into the single pending operation for the entity.
    MergeByEntity,
    /// The new payload overwrites the queued one wholesale, never field-by-field.
    ReplaceEntire,
    /// Always a new row; relative order must survive through execution.
    Never,
    /// At most one pending operation system-wide, merged field-by-field.
    MergeGlobal,
}

/// Closed set of operations the client can push.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OperationType {
    #[sea_orm(string_value = "book_update")]
    BookUpdate,
    #[sea_orm(string_value = "contributor_update")]
    ContributorUpdate,
    #[sea_orm(string_value = "series_update")]
    SeriesUpdate,
    #[sea_orm(string_value = "playback_position")]
    PlaybackPosition,
    #[sea_orm(string_value = "set_book_contributors")]
    SetBookContributors,
    #[sea_orm(string_value = "set_book_series")]
    SetBookSeries,
    #[sea_orm(string_value = "merge_contributor")]
    MergeContributor,
    #[sea_orm(string_value = "unmerge_contributor")]
    UnmergeContributor,
    #[sea_orm(string_value = "listening_event")]
    ListeningEvent,
    #[sea_orm(string_value = "user_preferences")]
    UserPreferences,
}

impl OperationType {
    pub fn coalesce_policy(self) -> CoalescePolicy {
        match self {
            Self::BookUpdate
            | Self::ContributorUpdate
            | Self::SeriesUpdate
            | Self::PlaybackPosition => CoalescePolicy::MergeByEntity,
            Self::SetBookContributors | Self::SetBookSeries => CoalescePolicy::ReplaceEntire,
            Self::MergeContributor | Self::UnmergeContributor | Self::ListeningEvent => {
                CoalescePolicy::Never
            }
            Self::UserPreferences => CoalescePolicy::MergeGlobal,
        }
    }

    /// Entity-keyed coalescing lookup applies (merge or replace-entire).
    pub fn coalesces_by_entity(self) -> bool {
        matches!(
            self.coalesce_policy(),
            CoalescePolicy::MergeByEntity | CoalescePolicy::ReplaceEntire
        )
    }
}

/// Which cached table an operation targets, when it targets one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum EntityType {
    #[sea_orm(string_value = "book")]
    Book,
    #[sea_orm(string_value = "contributor")]
    Contributor,
    #[sea_orm(string_value = "series")]
    Series,
    #[sea_orm(string_value = "user")]
    User,
    #[sea_orm(string_value = "shelf")]
    Shelf,
}

/// `Pending -> InProgress -> {deleted | Failed}`; `Failed -> Pending` on
/// retry, `Failed -> deleted` on dismiss. Nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum OperationStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "failed")]
    Failed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {
    fn new() -> Self {
        Self {
            id: Set(Uuid::new_v4()),
            status: Set(OperationStatus::Pending),
            attempt_count: Set(0),
            ..ActiveModelTrait::default()
        }
    }
}

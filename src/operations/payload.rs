//! Operation payloads
//!
//! Each payload carries the complete target state for its operation (not a
//! delta), which is what keeps retries idempotent on the server side. The
//! exception is [`ListeningEventPayload`], which is append-only and relies
//! on server-side dedup by `event_id`.
//!
//! Patch payloads use `Option` fields with PATCH semantics: `None` means
//! "no change", never "clear".

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Field-level patch for a book's editable metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookUpdatePayload {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub description: Option<String>,
    pub publisher: Option<String>,
    pub published_year: Option<i32>,
    pub language: Option<String>,
    pub isbn: Option<String>,
    pub explicit: Option<bool>,
    pub abridged: Option<bool>,
}

impl BookUpdatePayload {
    /// Merge a newer patch over this one. The newer request's set fields
    /// win; its unset fields leave the queued value in place.
    pub fn merged_with(self, newer: Self) -> Self {
        Self {
            title: newer.title.or(self.title),
            subtitle: newer.subtitle.or(self.subtitle),
            description: newer.description.or(self.description),
            publisher: newer.publisher.or(self.publisher),
            published_year: newer.published_year.or(self.published_year),
            language: newer.language.or(self.language),
            isbn: newer.isbn.or(self.isbn),
            explicit: newer.explicit.or(self.explicit),
            abridged: newer.abridged.or(self.abridged),
        }
    }
}

/// Field-level patch for a contributor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorUpdatePayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
}

impl ContributorUpdatePayload {
    pub fn merged_with(self, newer: Self) -> Self {
        Self {
            name: newer.name.or(self.name),
            description: newer.description.or(self.description),
            website: newer.website.or(self.website),
        }
    }
}

/// Field-level patch for a series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesUpdatePayload {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl SeriesUpdatePayload {
    pub fn merged_with(self, newer: Self) -> Self {
        Self {
            name: newer.name.or(self.name),
            description: newer.description.or(self.description),
        }
    }
}

/// Latest playback position for a book. Coalescing keeps only the newest
/// report; the position is complete state, so merge is wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackPositionPayload {
    pub book_id: Uuid,
    pub position_seconds: f64,
    pub recorded_at: DateTime<Utc>,
}

/// A contributor attached to a book, with its role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContributorRole {
    pub contributor_id: Uuid,
    /// e.g. "author", "narrator", "translator"
    pub role: String,
}

/// The complete desired contributor list for a book. Replace-entire: a
/// second request supersedes the queued list wholesale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetBookContributorsPayload {
    pub book_id: Uuid,
    pub contributors: Vec<ContributorRole>,
}

/// A book's placement within one series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPlacement {
    pub series_id: Uuid,
    pub sequence: Option<f32>,
}

/// The complete desired series list for a book. Replace-entire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetBookSeriesPayload {
    pub book_id: Uuid,
    pub series: Vec<SeriesPlacement>,
}

/// Fold `source` into `target`, re-attributing works. Never coalesced;
/// order relative to unmerge matters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeContributorPayload {
    pub source_id: Uuid,
    pub target_id: Uuid,
}

/// Undo a previous merge: split `contributor_id` back out of `merged_into`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmergeContributorPayload {
    pub contributor_id: Uuid,
    pub merged_into: Uuid,
}

/// One listening session event. Appended, never coalesced; the server
/// dedups by `event_id` so a retried batch cannot double-count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListeningEventPayload {
    pub event_id: Uuid,
    pub book_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    pub finished: bool,
}

/// Patch for account-wide preferences. At most one pending system-wide.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPreferencesPayload {
    pub playback_speed: Option<f64>,
    pub skip_forward_seconds: Option<u32>,
    pub skip_back_seconds: Option<u32>,
    pub theme: Option<String>,
}

impl UserPreferencesPayload {
    pub fn merged_with(self, newer: Self) -> Self {
        Self {
            playback_speed: newer.playback_speed.or(self.playback_speed),
            skip_forward_seconds: newer.skip_forward_seconds.or(self.skip_forward_seconds),
            skip_back_seconds: newer.skip_back_seconds.or(self.skip_back_seconds),
            theme: newer.theme.or(self.theme),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn book_patch_merge_prefers_newer_set_fields() {
        let first = BookUpdatePayload {
            title: Some("Draft Title".into()),
            description: Some("First pass".into()),
            ..Default::default()
        };
        let second = BookUpdatePayload {
            title: Some("Final Title".into()),
            language: Some("en".into()),
            ..Default::default()
        };

        let merged = first.merged_with(second);
        assert_eq!(merged.title.as_deref(), Some("Final Title"));
        assert_eq!(merged.description.as_deref(), Some("First pass"));
        assert_eq!(merged.language.as_deref(), Some("en"));
        assert_eq!(merged.subtitle, None);
    }

    #[test]
    fn preferences_merge_is_field_wise() {
        let first = UserPreferencesPayload {
            playback_speed: Some(1.25),
            theme: Some("dark".into()),
            ..Default::default()
        };
        let second = UserPreferencesPayload {
            playback_speed: Some(1.5),
            skip_back_seconds: Some(15),
            ..Default::default()
        };

        let merged = first.merged_with(second);
        assert_eq!(merged.playback_speed, Some(1.5));
        assert_eq!(merged.theme.as_deref(), Some("dark"));
        assert_eq!(merged.skip_back_seconds, Some(15));
    }
}

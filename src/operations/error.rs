//! Error types for the queue and the handler framework

use thiserror::Error;
use uuid::Uuid;

/// Storage-level failures from the pending-operation store.
///
/// These are local I/O problems; the store never retries internally,
/// callers decide.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Operation id not present in the queue
    #[error("Operation not found: {0}")]
    NotFound(Uuid),

    /// A status transition the lifecycle does not permit
    #[error("Invalid status transition for operation {id}: {detail}")]
    InvalidTransition { id: Uuid, detail: String },

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Typed failure from a handler's execute (or coalesce) step.
#[derive(Error, Debug)]
pub enum HandlerFailure {
    /// Timeout, connection refused, offline. Eligible for automatic retry
    /// on the next sync pass.
    #[error("Network error: {0}")]
    Transient(String),

    /// The server rejected the request (4xx). Retrying unmodified input
    /// would fail identically, so this waits for explicit user retry.
    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The entity a queued operation references no longer exists locally.
    /// Terminal: surfaced to the user as a failed operation, never dropped.
    #[error("Entity {entity_id} referenced by queued operation no longer exists locally")]
    EntityMissing { entity_id: Uuid },

    /// Malformed payload blob. Indicates a bug, not a runtime condition.
    #[error("Malformed operation payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// Payload/operation-type combination a handler cannot service.
    #[error("Operation not supported by this handler: {0}")]
    Unsupported(String),
}

impl HandlerFailure {
    /// Whether the next sync pass may retry this automatically.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<crate::api::ApiFailure> for HandlerFailure {
    fn from(failure: crate::api::ApiFailure) -> Self {
        match failure {
            crate::api::ApiFailure::Network(message) => Self::Transient(message),
            crate::api::ApiFailure::Rejected { status, message } => {
                Self::Rejected { status, message }
            }
        }
    }
}

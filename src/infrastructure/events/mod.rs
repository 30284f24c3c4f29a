//! Event bus for sync-status observability
//!
//! The store and the orchestrator emit an event after every queue mutation;
//! UI layers subscribe and re-query the counts/lists they care about. The
//! bus carries no payload state beyond identifiers, so observers always read
//! current storage state rather than a stale snapshot.

use crate::infrastructure::database::entities::pending_operation::{EntityType, OperationType};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Queue and sync lifecycle events.
#[derive(Debug, Clone)]
pub enum QueueEvent {
    /// A new operation row was inserted.
    OperationEnqueued {
        id: Uuid,
        operation_type: OperationType,
    },

    /// A new request was merged into an already-queued operation.
    OperationCoalesced {
        id: Uuid,
        operation_type: OperationType,
    },

    /// Operations were claimed by the orchestrator.
    OperationsStarted { ids: Vec<Uuid> },

    /// An operation executed successfully and was removed from the queue.
    OperationCompleted { id: Uuid },

    /// An operation failed; it stays visible until retried or dismissed.
    OperationFailed {
        id: Uuid,
        error: String,
        attempt_count: i32,
    },

    /// A failed operation was reset for a fresh user-initiated attempt.
    OperationRetried { id: Uuid },

    /// A failed operation was dismissed by the user.
    OperationDismissed { id: Uuid },

    /// Startup crash recovery returned in-progress rows to pending.
    StuckOperationsReset { count: u64 },

    /// Advisory: the server changed an entity after this push was queued.
    PushConflictDetected { operation_id: Uuid, reason: String },

    /// All queued work for an entity finished; its cached row is synced again.
    EntitySynced {
        entity_type: EntityType,
        entity_id: Uuid,
    },

    /// A push pass finished.
    SyncPassCompleted { completed: u64, failed: u64 },
}

/// Broadcast bus for [`QueueEvent`]s.
pub struct EventBus {
    sender: broadcast::Sender<QueueEvent>,
}

impl EventBus {
    /// Create a new event bus with specified capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event.
    pub fn emit(&self, event: QueueEvent) {
        // Ignore send errors (no receivers)
        let _ = self.sender.send(event);
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> broadcast::Receiver<QueueEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}

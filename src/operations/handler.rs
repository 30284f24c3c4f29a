//! Operation handler contract and registry
//!
//! Type-specific behavior is factored out of the generic queue so the store
//! stays entity-agnostic: one handler per [`OperationType`], registered once
//! at core startup and looked up by the queue and the push orchestrator.

use crate::infrastructure::database::entities::pending_operation::{self, OperationType};
use async_trait::async_trait;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;

use super::error::HandlerFailure;

/// Per-type behavior: how to merge a new request into a queued operation,
/// and how to push an operation (or a batch) to the server.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    /// The single operation type this handler services.
    fn operation_type(&self) -> OperationType;

    /// Merge an incoming request into an existing queued payload.
    ///
    /// PATCH semantics for mergeable types: an unset field in the incoming
    /// request means "no change", never "clear". Replace-entire types return
    /// the incoming payload wholesale. Never-coalesced types reject.
    fn coalesce(&self, existing: Json, incoming: Json) -> Result<Json, HandlerFailure> {
        let _ = existing;
        let _ = incoming;
        Err(HandlerFailure::Unsupported(format!(
            "{:?} operations are never coalesced",
            self.operation_type()
        )))
    }

    /// Push one operation to the server. Must be idempotent-safe under
    /// retry: payloads carry complete target state (or dedup ids).
    async fn execute(&self, operation: &pending_operation::Model) -> Result<(), HandlerFailure>;

    /// Whether same-batch-key operations may share one server call.
    fn supports_batching(&self) -> bool {
        false
    }

    /// Push a batch in one round trip. Caller guarantees the slice is
    /// ordered by `created_at` ascending and shares one batch key.
    async fn execute_batch(
        &self,
        operations: &[pending_operation::Model],
    ) -> Result<(), HandlerFailure> {
        let _ = operations;
        Err(HandlerFailure::Unsupported(format!(
            "{:?} operations are not batchable",
            self.operation_type()
        )))
    }
}

/// Registry mapping each operation type to its handler.
pub struct HandlerRegistry {
    handlers: HashMap<OperationType, Arc<dyn OperationHandler>>,
}

impl HandlerRegistry {
    pub fn new(handlers: Vec<Arc<dyn OperationHandler>>) -> Self {
        let handlers = handlers
            .into_iter()
            .map(|h| (h.operation_type(), h))
            .collect();
        Self { handlers }
    }

    pub fn get(&self, operation_type: OperationType) -> Option<&Arc<dyn OperationHandler>> {
        self.handlers.get(&operation_type)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

//! Pending-operation queue: the offline-first push pipeline
//!
//! Every outgoing mutation flows through here. A repository performs its
//! optimistic local write, then enqueues a [`pending_operation::Model`]
//! through the [`OperationQueue`], which coalesces with anything already
//! queued for the same (type, entity) key. The push orchestrator later
//! drains the store through the per-type [`OperationHandler`]s.

pub mod error;
pub mod handler;
pub mod handlers;
pub mod payload;
pub mod queue;
pub mod store;

pub use crate::infrastructure::database::entities::pending_operation::{
    self, CoalescePolicy, EntityType, OperationStatus, OperationType,
};
pub use error::{HandlerFailure, StoreError};
pub use handler::{HandlerRegistry, OperationHandler};
pub use queue::{EnqueueOutcome, OperationQueue};
pub use store::PendingOperationStore;

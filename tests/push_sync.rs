//! Push pipeline integration tests: repository write -> queue -> orchestrator

mod common;

use chrono::Duration;
use fable_core::api::ApiFailure;
use fable_core::infrastructure::database::entities::{book, pending_operation, SyncState};
use fable_core::operations::payload::BookUpdatePayload;
use fable_core::operations::OperationStatus;
use fable_core::shared::Clock;
use fable_core::testing::{ApiCall, TestHarness};
use fable_core::{PushConflictPolicy, QueueEvent, SyncConfig};
use pretty_assertions::assert_eq;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};

#[tokio::test]
async fn book_edit_flows_from_local_write_to_synced_row() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    let updated = harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("The Longer Way Home".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Optimistic local effect
    assert_eq!(updated.title, "The Longer Way Home");
    assert_eq!(updated.sync_state, SyncState::NotSynced);

    // Exactly one queued push for the book
    let pending = harness.store.get_pending(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].entity_id, Some(book_id));

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(harness.api.calls(), vec![ApiCall::UpdateBook(book_id)]);

    // Queue drained, row synced again
    assert_eq!(harness.store.count_pending().await.unwrap(), 0);
    let row = book::Entity::find_by_id(book_id)
        .one(harness.core.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.sync_state, SyncState::Synced);
}

#[tokio::test]
async fn transient_failure_is_requeued_and_succeeds_on_the_next_pass() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Retry Me".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    harness
        .api
        .fail_next(ApiFailure::Network("connection timed out".into()));

    let first = harness.core.push().run_once().await.unwrap();
    assert_eq!(first.failed, 1);
    assert_eq!(first.requeued, 1);

    let op = &harness.store.get_pending(10).await.unwrap()[0];
    assert_eq!(op.status, OperationStatus::Pending);
    assert_eq!(op.attempt_count, 1);
    assert_eq!(op.last_error.as_deref(), Some("Network error: connection timed out"));

    let second = harness.core.push().run_once().await.unwrap();
    assert_eq!(second.completed, 1);
    assert_eq!(harness.store.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn server_rejection_is_terminal_until_user_retry() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    harness.api.fail_next(ApiFailure::Rejected {
        status: 422,
        message: "title must not be empty".into(),
    });

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 0);

    let failed = harness.store.get_failed().await.unwrap();
    assert_eq!(failed.len(), 1);
    assert!(failed[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("title must not be empty"));

    // Nothing pending: the next pass does not touch it
    harness.api.clear_calls();
    let idle = harness.core.push().run_once().await.unwrap();
    assert_eq!(idle.completed + idle.failed, 0);
    assert!(harness.api.calls().is_empty());

    // Explicit user retry gives it a clean slate
    harness
        .core
        .push()
        .retry_operation(failed[0].id)
        .await
        .unwrap();
    let retried = harness.core.push().run_once().await.unwrap();
    assert_eq!(retried.completed, 1);
}

#[tokio::test]
async fn dismissing_a_failed_operation_removes_it() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Unwanted".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    harness.api.fail_next(ApiFailure::Rejected {
        status: 400,
        message: "no".into(),
    });
    harness.core.push().run_once().await.unwrap();

    let failed = harness.store.get_failed().await.unwrap();
    harness
        .core
        .push()
        .dismiss_operation(failed[0].id)
        .await
        .unwrap();

    assert!(harness.store.get_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn locally_deleted_entity_surfaces_as_failed_operation() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Ghost".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The book disappears locally before the push runs
    book::Entity::delete_by_id(book_id)
        .exec(harness.core.db())
        .await
        .unwrap();

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(report.requeued, 0);

    let failed = harness.store.get_failed().await.unwrap();
    assert!(failed[0]
        .last_error
        .as_deref()
        .unwrap()
        .contains("no longer exists locally"));
    // Never a server call for it
    assert!(harness.api.calls().is_empty());
}

#[tokio::test]
async fn listening_session_flushes_as_one_batched_call() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    for i in 0..5 {
        harness
            .core
            .listening()
            .record_event(book_id, "session-42", harness.clock.now(), 60.0, i == 4)
            .await
            .unwrap();
        harness.clock.advance(Duration::seconds(1));
    }
    for _ in 0..2 {
        harness
            .core
            .listening()
            .record_event(book_id, "session-7", harness.clock.now(), 30.0, false)
            .await
            .unwrap();
        harness.clock.advance(Duration::seconds(1));
    }

    assert_eq!(harness.store.count_pending().await.unwrap(), 7);

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.completed, 7);
    assert_eq!(
        harness.api.calls(),
        vec![
            ApiCall::SubmitListeningEvents(5),
            ApiCall::SubmitListeningEvents(2),
        ]
    );
    assert_eq!(harness.store.count_pending().await.unwrap(), 0);
}

#[tokio::test]
async fn merge_then_unmerge_reach_the_server_in_queue_order() {
    let harness = TestHarness::new().await;
    let target = common::seed_contributor(harness.core.db(), harness.clock.now()).await;
    let source = common::seed_contributor(harness.core.db(), harness.clock.now()).await;

    harness.core.contributors().merge(source, target).await.unwrap();
    harness.clock.advance(Duration::seconds(1));
    harness
        .core
        .contributors()
        .unmerge(source, target)
        .await
        .unwrap();

    // Two distinct rows, never coalesced
    assert_eq!(harness.store.count_pending().await.unwrap(), 2);

    harness.core.push().run_once().await.unwrap();
    assert_eq!(
        harness.api.calls(),
        vec![
            ApiCall::MergeContributor(source, target),
            ApiCall::UnmergeContributor(source, target),
        ]
    );
}

#[tokio::test]
async fn push_conflict_warns_and_proceeds_by_default() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Stale Assumption".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The server version moves forward after the edit was queued
    harness.clock.advance(Duration::seconds(100));
    let row = book::Entity::find_by_id(book_id)
        .one(harness.core.db())
        .await
        .unwrap()
        .unwrap();
    let mut active = row.into_active_model();
    active.server_updated_at = Set(harness.clock.now());
    active.update(harness.core.db()).await.unwrap();

    let mut events = harness.core.events().subscribe();
    let report = harness.core.push().run_once().await.unwrap();

    assert_eq!(report.conflicts, 1);
    assert_eq!(report.blocked, 0);
    assert_eq!(report.completed, 1);
    assert_eq!(harness.api.calls(), vec![ApiCall::UpdateBook(book_id)]);

    let mut saw_conflict = false;
    while let Ok(event) = events.try_recv() {
        if let QueueEvent::PushConflictDetected { operation_id: _, reason } = event {
            assert!(reason.contains("after this change was queued"));
            saw_conflict = true;
        }
    }
    assert!(saw_conflict);
}

#[tokio::test]
async fn push_conflict_block_policy_holds_the_operation() {
    let config = SyncConfig {
        push_conflict_policy: PushConflictPolicy::Block,
        ..Default::default()
    };
    let harness = TestHarness::with_config(config).await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Held Back".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    harness.clock.advance(Duration::seconds(100));
    let row = book::Entity::find_by_id(book_id)
        .one(harness.core.db())
        .await
        .unwrap()
        .unwrap();
    let mut active = row.into_active_model();
    active.server_updated_at = Set(harness.clock.now());
    active.update(harness.core.db()).await.unwrap();

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.blocked, 1);
    assert_eq!(report.completed, 0);
    assert!(harness.api.calls().is_empty());
    assert_eq!(harness.store.count_pending().await.unwrap(), 1);
}

#[tokio::test]
async fn startup_reset_recovers_operations_stuck_in_progress() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Interrupted".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // Simulate a crash mid-sync: the row is claimed but never finished
    let op = harness.store.get_oldest_pending().await.unwrap().unwrap();
    harness.store.mark_in_progress(&[op.id]).await.unwrap();

    harness.core.init().await.unwrap();

    let recovered = harness.store.get(op.id).await.unwrap();
    assert_eq!(recovered.status, OperationStatus::Pending);
    assert_eq!(recovered.attempt_count, 0);

    // And the recovered operation pushes normally
    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.completed, 1);
}

#[tokio::test]
async fn entity_stays_unsynced_until_its_last_operation_completes() {
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    // Oldest first: the listening event, then the metadata update
    harness
        .core
        .listening()
        .record_event(book_id, "session-1", harness.clock.now(), 10.0, false)
        .await
        .unwrap();
    harness.clock.advance(Duration::seconds(1));
    harness
        .core
        .books()
        .update_book(
            book_id,
            BookUpdatePayload {
                title: Some("Two Edits".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    // The listening batch (first call of the pass) fails transiently; the
    // book update succeeds.
    harness
        .api
        .fail_next(ApiFailure::Network("flaky".into()));

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.completed, 1);
    assert_eq!(report.requeued, 1);

    // A queued operation still references the book, so the successful
    // update must not flip the row back to synced.
    let row = book::Entity::find_by_id(book_id)
        .one(harness.core.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.sync_state, SyncState::NotSynced);

    // Next pass drains the rest and settles the row
    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.completed, 1);
    let row = book::Entity::find_by_id(book_id)
        .one(harness.core.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.sync_state, SyncState::Synced);
}

#[tokio::test]
async fn unknown_payload_shapes_do_not_reach_the_server() {
    // Guard against queue rows written by a future version: a payload the
    // handler cannot parse fails terminally instead of panicking.
    let harness = TestHarness::new().await;
    let book_id = common::seed_book(harness.core.db(), harness.clock.now()).await;

    harness
        .store
        .insert(fable_core::operations::store::NewOperation {
            operation_type: fable_core::operations::OperationType::BookUpdate,
            entity_type: Some(pending_operation::EntityType::Book),
            entity_id: Some(book_id),
            payload: serde_json::json!({ "published_year": "two thousand" }),
            batch_key: None,
        })
        .await
        .unwrap();

    let report = harness.core.push().run_once().await.unwrap();
    assert_eq!(report.failed, 1);
    assert!(harness.api.calls().is_empty());
}

mod common;

use std::time::Duration;

use common::{MockPlane, RemoteResource, collect, detail, memory};
use ferry_endpoint::{MemoryStore, TaskStatus};
use ferry_telemetry::UNKNOWN_TOTAL;
use ferry_transfer::{Strategy, Transfer, TransferError, TransferOptions};

fn transfer(plane: &std::sync::Arc<MockPlane>) -> Transfer {
    Transfer::new(RemoteResource::new(plane, "/data/in/"), RemoteResource::new(plane, "/data/out/"))
}

#[tokio::test(start_paused = true)]
async fn test_success_sets_total() {
    let plane = MockPlane::scripted(vec![
        detail(100, TaskStatus::Active),
        detail(300, TaskStatus::Active),
        detail(500, TaskStatus::Succeeded),
    ]);

    let (events, error) = collect(transfer(&plane).start(1024)).await;
    assert!(error.is_none());
    assert_eq!(plane.submits(), 1);
    assert_eq!(plane.polls(), 3);
    assert_eq!(plane.cancels(), 0);

    let seen: Vec<u64> = events.iter().map(|e| e.transferred).collect();
    assert_eq!(seen.last(), Some(&500));
    assert_eq!(events[0].total, UNKNOWN_TOTAL);
    assert_eq!(events.last().unwrap().total, 500);
}

#[tokio::test(start_paused = true)]
async fn test_report_carries_task_id() {
    let plane = MockPlane::scripted(vec![detail(42, TaskStatus::Succeeded)]);
    let report = transfer(&plane).run().await.unwrap();

    assert_eq!(report.strategy, Strategy::Delegated);
    assert_eq!(report.task_id.unwrap().0, "task-1");
    assert!(report.files.is_empty());
    assert_eq!(report.info.transferred, 42);
    assert_eq!(report.info.total, 42);
}

#[tokio::test(start_paused = true)]
async fn test_failure_stops_polling() {
    let plane = MockPlane::scripted(vec![
        detail(10, TaskStatus::Active),
        detail(20, TaskStatus::Inactive),
        detail(20, TaskStatus::Failed),
        detail(20, TaskStatus::Succeeded),
    ]);

    let err = transfer(&plane).run().await.unwrap_err();
    assert!(matches!(err, TransferError::RemoteTransferFailure { ref task_id } if task_id.0 == "task-1"));
    assert_eq!(plane.polls(), 3);
    assert_eq!(plane.cancels(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_poll_budget_exhausted() {
    let plane = MockPlane::scripted(vec![detail(1, TaskStatus::Active)]);
    let options = TransferOptions::default().max_polls(3);

    let err = transfer(&plane).options(options).run().await.unwrap_err();
    assert!(matches!(err, TransferError::Timeout { polls: 3, .. }));
    assert_eq!(plane.polls(), 3);
    assert_eq!(plane.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_deadline_stops_polling() {
    let plane = MockPlane::scripted(vec![detail(1, TaskStatus::Active)]);
    let options = TransferOptions::default()
        .poll_interval(Duration::from_secs(2))
        .deadline(Duration::from_secs(5));

    let err = transfer(&plane).options(options).run().await.unwrap_err();
    // Polls at 0s, 2s and 4s; the 6s tick is past the deadline.
    assert!(matches!(err, TransferError::Timeout { polls: 3, .. }));
    assert_eq!(plane.polls(), 3);
    assert_eq!(plane.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_unanswered_polls_time_out_and_cancel() {
    let plane = MockPlane::scripted(vec![]);
    let options = TransferOptions::default().max_polls(3);

    let err = transfer(&plane).options(options).run().await.unwrap_err();
    assert!(matches!(err, TransferError::Timeout { polls: 3, .. }));
    assert_eq!(plane.polls(), 3);
    assert_eq!(plane.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failed_poll_is_retried() {
    let plane = MockPlane::scripted(vec![detail(64, TaskStatus::Active), detail(128, TaskStatus::Succeeded)]);
    plane.fail_next_polls(2);

    let report = transfer(&plane).run().await.unwrap();
    assert_eq!(report.info.transferred, 128);
    assert_eq!(plane.polls(), 4);
    assert_eq!(plane.cancels(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_abandons_remote_task() {
    let plane = MockPlane::scripted(vec![detail(1, TaskStatus::Active)]);
    let run = transfer(&plane).start(1024);
    let handle = run.handle();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(3)).await;
        handle.cancel();
    });
    let err = run.finish().await.unwrap_err();
    assert!(matches!(err, TransferError::Cancelled));
    assert_eq!(plane.polls(), 2);
    assert_eq!(plane.cancels(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_remote_regression_stays_monotonic() {
    let plane = MockPlane::scripted(vec![
        detail(100, TaskStatus::Active),
        detail(50, TaskStatus::Active),
        detail(200, TaskStatus::Succeeded),
    ]);

    let (events, error) = collect(transfer(&plane).start(1024)).await;
    assert!(error.is_none());
    assert!(events.windows(2).all(|w| w[0].transferred <= w[1].transferred));
    assert_eq!(events.last().unwrap().transferred, 200);
}

#[tokio::test(start_paused = true)]
async fn test_mixed_capabilities_rejected() {
    let plane = MockPlane::scripted(vec![detail(0, TaskStatus::Succeeded)]);
    let store = MemoryStore::new();
    store.insert("local.bin", vec![0u8; 8]);

    let err = Transfer::new(memory(&store, "local.bin"), RemoteResource::new(&plane, "/x"))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Incompatible { .. }));

    let err = Transfer::new(RemoteResource::new(&plane, "/x"), memory(&store, "copy.bin"))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Incompatible { .. }));

    assert_eq!(plane.submits(), 0);
    assert_eq!(plane.polls(), 0);
    assert!(!store.contains("copy.bin"));
}

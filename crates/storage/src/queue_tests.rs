use super::*;
use tempfile::tempdir;

#[test]
fn enqueue_then_ack_retires_the_entry() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.wal"), DEFAULT_MAX_RETRIES).unwrap();

    let now = Utc::now();
    let id = queue.enqueue("complete-process", serde_json::json!({}), now).unwrap();
    assert_eq!(queue.count_pending(), 1);

    queue.ack(id).unwrap();
    assert_eq!(queue.count_pending(), 0);
    assert!(queue.get(id).is_none());
}

#[test]
fn repeated_failures_move_entry_to_failed_without_deleting_it() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.wal"), 3).unwrap();

    let now = Utc::now();
    let id = queue.enqueue("complete-process", serde_json::json!({}), now).unwrap();

    for _ in 0..3 {
        queue.record_failure(id, "backend unreachable", now).unwrap();
    }

    assert_eq!(queue.count_failed(), 1);
    assert_eq!(queue.count_pending(), 0);
    let entry = queue.get(id).unwrap();
    assert_eq!(entry.attempts, 3);
    assert_eq!(entry.status, QueueEntryStatus::Failed);
    assert_eq!(entry.last_error.as_deref(), Some("backend unreachable"));
}

#[test]
fn due_returns_only_entries_whose_backoff_has_elapsed() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.wal"), DEFAULT_MAX_RETRIES).unwrap();

    let now = Utc::now();
    let id = queue.enqueue("complete-process", serde_json::json!({}), now).unwrap();
    queue.record_failure(id, "timeout", now).unwrap();

    assert!(queue.due(now).is_empty(), "entry should be backed off past `now`");
    let far_future = now + chrono::Duration::hours(1);
    assert_eq!(queue.due(far_future).len(), 1);
}

#[test]
fn reopening_after_a_crash_rebuilds_state_from_the_wal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.wal");
    let now = Utc::now();

    let id = {
        let mut queue = OfflineQueue::open(&path, DEFAULT_MAX_RETRIES).unwrap();
        let id = queue.enqueue("convert-to-serial", serde_json::json!({"x": 1}), now).unwrap();
        queue.record_failure(id, "network down", now).unwrap();
        id
    };

    let queue = OfflineQueue::open(&path, DEFAULT_MAX_RETRIES).unwrap();
    let entry = queue.get(id).unwrap();
    assert_eq!(entry.attempts, 1);
    assert_eq!(entry.status, QueueEntryStatus::Pending);
}

#[test]
fn unknown_entry_operations_return_an_error() {
    let dir = tempdir().unwrap();
    let mut queue = OfflineQueue::open(&dir.path().join("queue.wal"), DEFAULT_MAX_RETRIES).unwrap();
    let bogus = station_core::QueueEntryId::new();
    assert!(queue.ack(bogus).is_err());
    assert!(matches!(
        queue.record_failure(bogus, "nope", Utc::now()),
        Err(StorageError::UnknownEntry(_))
    ));
}

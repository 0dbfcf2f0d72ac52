use super::*;
use crate::queue_entry::{QueueEntry, QueueEvent};
use chrono::Utc;
use tempfile::tempdir;

#[test]
fn append_then_reopen_replays_entries_in_order() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.wal");

    let (mut wal, entries) = Wal::open(&path).unwrap();
    assert!(entries.is_empty());

    let entry_a = QueueEntry::new("complete-process", serde_json::json!({"a": 1}), Utc::now());
    let entry_b = QueueEntry::new("complete-process", serde_json::json!({"b": 2}), Utc::now());
    wal.append(&QueueEvent::Enqueued { entry: entry_a.clone() }).unwrap();
    wal.append(&QueueEvent::Enqueued { entry: entry_b.clone() }).unwrap();
    drop(wal);

    let (_wal, replayed) = Wal::open(&path).unwrap();
    assert_eq!(replayed.len(), 2);
    assert_eq!(replayed[0].seq, 1);
    assert_eq!(replayed[1].seq, 2);
    match &replayed[0].event {
        QueueEvent::Enqueued { entry } => assert_eq!(entry.id, entry_a.id),
        other => panic!("unexpected event: {other:?}"),
    }
}

#[test]
fn corrupt_trailing_line_is_skipped_not_fatal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.wal");

    let (mut wal, _) = Wal::open(&path).unwrap();
    let entry = QueueEntry::new("complete-process", serde_json::json!({}), Utc::now());
    wal.append(&QueueEvent::Enqueued { entry }).unwrap();
    drop(wal);

    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
    writeln!(file, "not valid json").unwrap();

    let (_wal, replayed) = Wal::open(&path).unwrap();
    assert_eq!(replayed.len(), 1);
}

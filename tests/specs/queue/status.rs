use assert_cmd::Command;
use chrono::Utc;
use station_storage::{OfflineQueue, DEFAULT_MAX_RETRIES};

#[test]
fn reports_pending_and_failed_counts_separately() {
    let data_root = tempfile::tempdir().unwrap();
    let batch_dir = data_root.path().join("b1");
    std::fs::create_dir_all(&batch_dir).unwrap();
    let queue_path = batch_dir.join("b1-queue.jsonl");

    {
        let mut queue = OfflineQueue::open(&queue_path, DEFAULT_MAX_RETRIES).unwrap();
        let pending_id = queue.enqueue("start_process", serde_json::json!({}), Utc::now()).unwrap();
        let failing_id = queue.enqueue("complete_process", serde_json::json!({}), Utc::now()).unwrap();
        for _ in 0..DEFAULT_MAX_RETRIES {
            queue.record_failure(failing_id, "backend unreachable", Utc::now()).unwrap();
        }
        let _ = pending_id;
    }

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["queue", "status", "--data-root"])
        .arg(data_root.path())
        .args(["--batch", "b1"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pending: 1"));
    assert!(stdout.contains("failed: 1"));
}

#[test]
fn a_batch_that_never_queued_anything_reports_zero_rather_than_failing() {
    let data_root = tempfile::tempdir().unwrap();

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["queue", "status", "--data-root"])
        .arg(data_root.path())
        .args(["--batch", "never-started"])
        .output()
        .unwrap();
    assert!(output.status.success(), "the queue file is created on first touch, not an error condition");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pending: 0"));
    assert!(stdout.contains("failed: 0"));
}

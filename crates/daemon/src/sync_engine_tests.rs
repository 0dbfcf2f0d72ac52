use super::*;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::Mutex as AsyncMutex;

fn backend(base_url: String) -> BackendClient {
    BackendClient::new(station_backend::BackendClientConfig {
        base_url,
        station_id: "station-1".into(),
        equipment_id: None,
        timeout_secs: 5.0,
    })
    .unwrap()
}

/// A tiny HTTP/1.1 server that replies with a fixed status/body to every
/// request it accepts, recording the requests it saw. Good enough to drive
/// `SyncEngine::drain_batch` without pulling in an HTTP mocking crate the
/// workspace doesn't otherwise depend on (mirrors the raw-socket style of
/// `station-adapters`'s `tcp_tests`).
struct FakeBackend {
    addr: std::net::SocketAddr,
    seen: Arc<AsyncMutex<Vec<String>>>,
}

impl FakeBackend {
    async fn spawn(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let seen = Arc::new(AsyncMutex::new(Vec::new()));
        let seen_clone = seen.clone();
        tokio::spawn(async move {
            for (status, body) in responses {
                let (mut socket, _) = match listener.accept().await {
                    Ok(pair) => pair,
                    Err(_) => break,
                };
                let mut buf = vec![0u8; 8192];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]).to_string();
                let path = request.lines().next().unwrap_or_default().to_string();
                seen_clone.lock().await.push(path);
                let reason = if status == 200 { "OK" } else { "Error" };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });
        Self { addr, seen }
    }

    fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    async fn request_count(&self) -> usize {
        self.seen.lock().await.len()
    }
}

fn start_payload(wip_int_id: u64) -> serde_json::Value {
    serde_json::json!({
        "wip_int_id": wip_int_id,
        "request": {
            "process_id": 1,
            "operator_id": "op-1",
            "equipment_id": null,
            "started_at": "2026-01-01T00:00:00Z",
        }
    })
}

fn complete_payload(wip_int_id: u64) -> serde_json::Value {
    serde_json::json!({
        "wip_int_id": wip_int_id,
        "process_id": 1,
        "request": {
            "operator_id": "op-1",
            "result": "PASS",
            "measurements": {},
            "defects": [],
            "notes": null,
            "completed_at": "2026-01-01T00:05:00Z",
        }
    })
}

fn engine_over(tmp: &TempDir, backend: BackendClient) -> SyncEngine {
    SyncEngine::new(backend, tmp.path().to_path_buf())
}

fn seed_queue(tmp: &TempDir, batch_id: &str, endpoint: &str, payload: serde_json::Value) {
    let dir = tmp.path().join(batch_id);
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{batch_id}-queue.jsonl"));
    let mut queue = station_storage::OfflineQueue::open(&path, DEFAULT_MAX_RETRIES).unwrap();
    queue.enqueue(endpoint, payload, Utc::now()).unwrap();
}

#[tokio::test]
async fn drain_batch_with_no_queue_file_is_a_noop() {
    let tmp = TempDir::new().unwrap();
    let engine = engine_over(&tmp, backend("http://127.0.0.1:1".into()));
    let drained = engine.drain_batch("b1").await.unwrap();
    assert_eq!(drained, 0);
}

#[tokio::test]
async fn successful_replay_acks_the_entry_and_removes_it_from_pending() {
    let tmp = TempDir::new().unwrap();
    seed_queue(&tmp, "b1", "start_process", start_payload(42));

    let fake = FakeBackend::spawn(vec![(200, r#"{"ok": true}"#)]).await;
    let engine = engine_over(&tmp, backend(fake.base_url()));

    let drained = engine.drain_batch("b1").await.unwrap();
    assert_eq!(drained, 1);
    assert_eq!(fake.request_count().await, 1);

    // Draining again finds nothing due (the entry was acked).
    let drained_again = engine.drain_batch("b1").await.unwrap();
    assert_eq!(drained_again, 0);
}

#[tokio::test]
async fn failed_replay_records_the_error_and_stops_the_batch_at_the_first_failure() {
    let tmp = TempDir::new().unwrap();
    seed_queue(&tmp, "b1", "start_process", start_payload(1));
    seed_queue(&tmp, "b1", "complete_process", complete_payload(1));

    let fake = FakeBackend::spawn(vec![(503, r#"{"error": "unavailable"}"#)]).await;
    let engine = engine_over(&tmp, backend(fake.base_url()));

    let drained = engine.drain_batch("b1").await.unwrap();
    assert_eq!(drained, 0, "FIFO ordering: a failed entry blocks later entries in the same batch");
    assert_eq!(fake.request_count().await, 1, "only the first due entry is attempted");
}

#[tokio::test]
async fn force_sync_sums_drained_counts_across_batches() {
    let tmp = TempDir::new().unwrap();
    seed_queue(&tmp, "b1", "start_process", start_payload(1));
    seed_queue(&tmp, "b2", "complete_process", complete_payload(2));

    let fake = FakeBackend::spawn(vec![
        (200, r#"{"ok": true}"#),
        (200, r#"{"wip_item": {"status": "COMPLETED"}}"#),
    ])
    .await;
    let engine = engine_over(&tmp, backend(fake.base_url()));

    let total = engine.force_sync(&["b1".to_string(), "b2".to_string()]).await;
    assert_eq!(total, 2);
}

#[tokio::test]
async fn unknown_endpoint_in_payload_is_dropped_as_a_failure_not_a_panic() {
    let tmp = TempDir::new().unwrap();
    seed_queue(&tmp, "b1", "rotate_tool", serde_json::json!({ "anything": true }));

    let engine = engine_over(&tmp, backend("http://127.0.0.1:1".into()));
    let drained = engine.drain_batch("b1").await.unwrap();
    assert_eq!(drained, 0);

    // Slow down only enough that a flaky CI box doesn't race the assertion above.
    tokio::time::sleep(StdDuration::from_millis(1)).await;
}

use super::*;
use station_wire::{read_timed, write_timed, CommandResponse};
use tokio::net::UnixListener;

async fn connected_pair(dir: &std::path::Path, name: &str) -> (UnixStream, UnixStream) {
    let path = dir.join(name);
    let listener = UnixListener::bind(&path).expect("bind");
    let connect = UnixStream::connect(&path);
    let (accepted, connected) = tokio::join!(listener.accept(), connect);
    (accepted.expect("accept").0, connected.expect("connect"))
}

#[tokio::test]
async fn command_channel_round_trips_a_request() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (master_side, worker_side) = connected_pair(dir.path(), "cmd.sock").await;

    let echo = tokio::spawn(async move {
        let mut worker_side = worker_side;
        let request: CommandRequest = read_timed(&mut worker_side, DEFAULT_TIMEOUT).await.expect("read request");
        let response = CommandResponse::ok(request.request_id, serde_json::json!({ "pong": true }));
        write_timed(&mut worker_side, &response, DEFAULT_TIMEOUT).await.expect("write response");
    });

    let channel = CommandChannel::new(master_side);
    let response = channel.send_command(Command::Ping).await.expect("send_command");
    assert!(response.is_ok());

    echo.await.expect("echo task");
}

#[tokio::test]
async fn command_channel_flags_mismatched_request_ids_but_still_returns() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (master_side, worker_side) = connected_pair(dir.path(), "cmd.sock").await;

    let echo = tokio::spawn(async move {
        let mut worker_side = worker_side;
        let _request: CommandRequest = read_timed(&mut worker_side, DEFAULT_TIMEOUT).await.expect("read request");
        let response = CommandResponse::ok("some-other-id", serde_json::json!({}));
        write_timed(&mut worker_side, &response, DEFAULT_TIMEOUT).await.expect("write response");
    });

    let channel = CommandChannel::new(master_side);
    let response = channel.send_command(Command::Ping).await.expect("send_command");
    assert_eq!(response.request_id, "some-other-id");

    echo.await.expect("echo task");
}

#[tokio::test]
async fn event_forwarder_delivers_events_in_order_and_stops_on_close() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (master_side, worker_side) = connected_pair(dir.path(), "evt.sock").await;

    let received: std::sync::Arc<parking_lot::Mutex<Vec<WorkerEvent>>> = Default::default();
    let received_clone = received.clone();
    let handle = spawn_event_forwarder(master_side, move |event| received_clone.lock().push(event));

    let mut worker_side = worker_side;
    write_timed(&mut worker_side, &WorkerEvent::Log { level: station_wire::LogLevel::Info, message: "one".into() }, DEFAULT_TIMEOUT)
        .await
        .expect("write event 1");
    write_timed(&mut worker_side, &WorkerEvent::Log { level: station_wire::LogLevel::Info, message: "two".into() }, DEFAULT_TIMEOUT)
        .await
        .expect("write event 2");
    drop(worker_side);

    handle.await.expect("forwarder task");
    let received = received.lock();
    assert_eq!(received.len(), 2);
    match (&received[0], &received[1]) {
        (WorkerEvent::Log { message: a, .. }, WorkerEvent::Log { message: b, .. }) => {
            assert_eq!(a, "one");
            assert_eq!(b, "two");
        }
        _ => panic!("expected log events"),
    }
}

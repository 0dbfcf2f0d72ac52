use super::*;
use std::io::Cursor;

#[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
struct Ping {
    n: u32,
}

#[tokio::test]
async fn round_trips_through_length_prefix() {
    let mut buf = Vec::new();
    let bytes = encode(&Ping { n: 7 }).unwrap();
    write_message(&mut buf, &bytes).await.unwrap();

    let mut cursor = Cursor::new(buf);
    let read = read_message(&mut cursor).await.unwrap();
    let msg: Ping = decode(&read).unwrap();
    assert_eq!(msg, Ping { n: 7 });
}

#[tokio::test]
async fn read_message_on_empty_stream_is_connection_closed() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_length_prefix_is_rejected_before_allocating() {
    let mut buf = Vec::new();
    buf.extend_from_slice(&((MAX_MESSAGE_SIZE as u32) + 1).to_be_bytes());
    let mut cursor = Cursor::new(buf);
    let err = read_message(&mut cursor).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { .. }));
}

#[tokio::test]
async fn read_timed_on_closed_connection_errors_rather_than_hangs() {
    let mut cursor = Cursor::new(Vec::<u8>::new());
    let result: Result<Ping, _> =
        read_timed(&mut cursor, std::time::Duration::from_millis(50)).await;
    assert!(result.is_err());
}

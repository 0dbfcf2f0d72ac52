use super::*;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::test]
async fn attach_then_call_round_trips_over_the_line_protocol() {
    let (client, mut server) = tokio::io::duplex(1024);
    let driver = SerialDriver::new("scale", SerialDriverConfig { port: "/dev/ttyUSB0".into(), baud_rate: 115_200 });
    driver.attach(client).await;
    driver.connect().await.unwrap();

    let responder = tokio::spawn(async move {
        let mut reader = BufReader::new(&mut server);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let request: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(request["method"], "read_weight");
        server.write_all(b"{\"grams\": 12.5}\n").await.unwrap();
    });

    let result = driver.call("read_weight", serde_json::json!({})).await.unwrap();
    assert_eq!(result["grams"], 12.5);
    responder.await.unwrap();
}

#[tokio::test]
async fn config_accessors_expose_port_and_baud_rate() {
    let driver = SerialDriver::new("scale", SerialDriverConfig { port: "/dev/ttyUSB1".into(), baud_rate: 9600 });
    assert_eq!(driver.port(), "/dev/ttyUSB1");
    assert_eq!(driver.baud_rate(), 9600);
}

#[tokio::test]
async fn connect_without_attach_fails() {
    let driver = SerialDriver::new("scale", SerialDriverConfig { port: "/dev/ttyUSB0".into(), baud_rate: 9600 });
    let err = driver.connect().await.unwrap_err();
    assert!(matches!(err, station_core::DriverError::Connection { .. }));
}

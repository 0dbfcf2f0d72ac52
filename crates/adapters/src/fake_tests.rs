use super::*;

#[tokio::test]
async fn records_calls_and_returns_scripted_response() {
    let driver = FakeDriver::new("fake-dmm").with_response("measure_voltage", serde_json::json!(5.0));
    driver.connect().await.unwrap();

    let result = driver.call("measure_voltage", serde_json::json!({})).await.unwrap();
    assert_eq!(result, serde_json::json!(5.0));
    assert_eq!(driver.calls().len(), 1);
    assert_eq!(driver.calls()[0].method, "measure_voltage");
}

#[tokio::test]
async fn unscripted_method_echoes_params() {
    let driver = FakeDriver::new("fake-dmm");
    let params = serde_json::json!({"set_range": "10V"});
    let result = driver.call("configure", params.clone()).await.unwrap();
    assert_eq!(result, params);
}

#[tokio::test]
async fn scripted_error_is_returned() {
    let driver = FakeDriver::new("fake-dmm").with_error(
        "measure_voltage",
        DriverError::Communication { driver: "fake-dmm".into(), message: "bus fault".into() },
    );
    let err = driver.call("measure_voltage", serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, DriverError::Communication { .. }));
}

#[tokio::test]
async fn connect_and_disconnect_toggle_is_connected() {
    let driver = FakeDriver::new("fake-dmm");
    assert!(!driver.is_connected());
    driver.connect().await.unwrap();
    assert!(driver.is_connected());
    driver.disconnect().await.unwrap();
    assert!(!driver.is_connected());
}

use super::*;
use station_core::config::{SimulationMeasurementConfig, SimulationProcessConfig};
use std::collections::BTreeMap;

fn config_with_measurement(failure_rate: f64) -> SimulationConfig {
    let mut processes = BTreeMap::new();
    let mut measurements = BTreeMap::new();
    measurements.insert(
        "measure_voltage".to_string(),
        SimulationMeasurementConfig { min: 4.9, max: 5.1, unit: "V".into(), noise: 0.0 },
    );
    processes.insert(1, SimulationProcessConfig { measurements, failure_rate: None });
    SimulationConfig {
        enabled: true,
        min_delay: 0.0,
        max_delay: 0.0,
        failure_rate,
        connection_delay: 0.0,
        processes,
    }
}

#[tokio::test]
async fn connect_then_call_returns_measurement_within_configured_range() {
    let driver = MockDriver::new("dmm", config_with_measurement(0.0), Some(1));
    driver.connect().await.unwrap();
    assert!(driver.is_connected());

    let value = driver.call("measure_voltage", serde_json::json!({})).await.unwrap();
    let volts = value.as_f64().unwrap();
    assert!((4.9..=5.1).contains(&volts));
}

#[tokio::test]
async fn call_without_matching_measurement_echoes_params() {
    let driver = MockDriver::new("dmm", config_with_measurement(0.0), Some(1));
    driver.connect().await.unwrap();

    let params = serde_json::json!({"set_range": "10V"});
    let value = driver.call("configure", params.clone()).await.unwrap();
    assert_eq!(value, params);
}

#[tokio::test]
async fn call_before_connect_is_a_communication_error() {
    let driver = MockDriver::new("dmm", config_with_measurement(0.0), Some(1));
    let err = driver.call("measure_voltage", serde_json::json!({})).await.unwrap_err();
    assert!(matches!(err, station_core::DriverError::Communication { .. }));
}

#[tokio::test]
async fn forced_failure_rate_makes_connect_fail() {
    let driver = MockDriver::new("dmm", config_with_measurement(1.0), Some(1));
    let err = driver.connect().await.unwrap_err();
    assert!(matches!(err, station_core::DriverError::Connection { .. }));
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn disconnect_clears_connected_state() {
    let driver = MockDriver::new("dmm", config_with_measurement(0.0), Some(1));
    driver.connect().await.unwrap();
    driver.disconnect().await.unwrap();
    assert!(!driver.is_connected());
}

#[tokio::test]
async fn process_without_override_falls_back_to_global_failure_rate() {
    let driver = MockDriver::new("dmm", config_with_measurement(0.0), None);
    assert_eq!(driver.failure_rate(), 0.0);
}

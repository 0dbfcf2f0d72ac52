use super::*;

fn test_batch(id: &str) -> BatchConfig {
    BatchConfig {
        id: id.to_string(),
        name: format!("batch {id}"),
        sequence_package: "demo".to_string(),
        hardware: Default::default(),
        auto_start: false,
        process_id: None,
    }
}

fn test_paths() -> SupervisorPaths {
    SupervisorPaths {
        worker_binary: "station-worker".into(),
        config_path: "station.yaml".into(),
        package_root: "packages".into(),
        data_root: "data".into(),
        socket_root: "sockets".into(),
    }
}

#[tokio::test]
async fn unknown_batch_id_is_rejected_by_start_and_stop() {
    let supervisor = BatchSupervisor::new(test_paths(), vec![], Arc::new(EventEmitter::new()));

    let start_err = supervisor.start_batch("missing").await.unwrap_err();
    assert!(matches!(start_err, SupervisorError::UnknownBatch(_)));

    let stop_err = supervisor.stop_batch("missing", Duration::from_secs(1)).await.unwrap_err();
    assert!(matches!(stop_err, SupervisorError::NotRunning(_)));
}

#[tokio::test]
async fn add_batch_makes_it_visible_to_config_lookups() {
    let supervisor = BatchSupervisor::new(test_paths(), vec![], Arc::new(EventEmitter::new()));

    supervisor.add_batch(test_batch("b1"));

    assert!(supervisor.config_for("b1").is_some());
    assert_eq!(supervisor.all_configs().len(), 1);
    assert!(!supervisor.is_running("b1").await);
}

#[tokio::test]
async fn remove_batch_drops_it_from_config_when_not_running() {
    let supervisor = BatchSupervisor::new(test_paths(), vec![test_batch("b1")], Arc::new(EventEmitter::new()));

    supervisor.remove_batch("b1").await.expect("not running, should succeed");

    assert!(supervisor.config_for("b1").is_none());
}

#[tokio::test]
async fn batch_status_for_a_stopped_batch_reports_configured_but_not_running() {
    let supervisor = BatchSupervisor::new(test_paths(), vec![test_batch("b1")], Arc::new(EventEmitter::new()));

    let status = supervisor.batch_status("b1", StatusFlags::default()).await.expect("known batch");

    assert_eq!(status["running"], serde_json::json!(false));
    assert_eq!(status["id"], serde_json::json!("b1"));
}

#[tokio::test]
async fn all_batch_statistics_are_zero_for_non_running_batches() {
    let supervisor = BatchSupervisor::new(test_paths(), vec![test_batch("b1"), test_batch("b2")], Arc::new(EventEmitter::new()));

    let stats = supervisor.all_batch_statistics().await;

    assert_eq!(stats.len(), 2);
    assert_eq!(stats["b1"]["total"], serde_json::json!(0));
}

#[test]
fn forward_worker_event_maps_step_complete_to_step_completed() {
    let emitter = EventEmitter::new();
    let received = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let received_clone = received.clone();
    emitter.on_any(Arc::new(move |event: &Event| received_clone.lock().push(event.event_type)));

    forward_worker_event(
        &emitter,
        "b1",
        station_wire::WorkerEvent::StepComplete {
            step: "a".into(),
            index: 0,
            duration_secs: Some(1.0),
            passed: true,
            result: None,
            execution_id: station_core::ExecutionId::new(),
        },
    );

    assert_eq!(received.lock().as_slice(), [EventType::StepCompleted]);
}

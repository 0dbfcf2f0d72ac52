use super::*;

fn sample_yaml() -> &'static str {
    r#"
station:
  id: station-01
  name: "Line 1 Station"
backend:
  url: "https://backend.example.com"
  station_id: station-01
batches:
  - id: batch-a
    name: "Batch A"
    sequence_package: power_supply_test
    auto_start: true
    process_id: 3
"#
}

#[test]
fn parses_with_defaults_filled_in() {
    let config = StationConfig::from_yaml(sample_yaml()).unwrap();
    assert_eq!(config.station.id, "station-01");
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.backend.max_retries, 5);
    assert_eq!(config.batches.len(), 1);
    assert_eq!(config.batches[0].process_id, Some(3));
    assert!(config.simulation.enabled);
}

#[test]
fn round_trips_through_yaml() {
    let config = StationConfig::from_yaml(sample_yaml()).unwrap();
    let yaml = config.to_yaml().unwrap();
    let reparsed = StationConfig::from_yaml(&yaml).unwrap();
    assert_eq!(config, reparsed);
}

#[test]
fn save_keeps_a_backup_and_survives_repeated_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.yaml");
    let config = StationConfig::from_yaml(sample_yaml()).unwrap();
    config.save(&path).unwrap();
    assert!(path.exists());
    assert!(!path.with_extension("yaml.bak").exists());

    let mut updated = config.clone();
    updated.station.name = "Line 1 Station (renamed)".into();
    updated.save(&path).unwrap();

    let backup_path = path.with_extension("yaml.bak");
    assert!(backup_path.exists());
    let backup = StationConfig::load(&backup_path).unwrap();
    assert_eq!(backup.station.name, "Line 1 Station");

    let reloaded = StationConfig::load(&path).unwrap();
    assert_eq!(reloaded.station.name, "Line 1 Station (renamed)");
}

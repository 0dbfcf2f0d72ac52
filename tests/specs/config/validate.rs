use assert_cmd::Command;
use std::io::Write;

fn valid_config() -> &'static str {
    r#"
station:
  id: station-01
  name: "Line 1 Station"
backend:
  url: ""
batches: []
"#
}

#[test]
fn valid_config_reports_ok_and_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.yaml");
    std::fs::File::create(&path).unwrap().write_all(valid_config().as_bytes()).unwrap();

    Command::cargo_bin("station")
        .unwrap()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn missing_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("does-not-exist.yaml");

    Command::cargo_bin("station")
        .unwrap()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure();
}

#[test]
fn malformed_yaml_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.yaml");
    std::fs::File::create(&path).unwrap().write_all(b"station: [this is not a map").unwrap();

    Command::cargo_bin("station")
        .unwrap()
        .args(["config", "validate", "--config"])
        .arg(&path)
        .assert()
        .failure();
}

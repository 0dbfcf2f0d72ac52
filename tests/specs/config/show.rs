use assert_cmd::Command;
use std::io::Write;

#[test]
fn show_prints_parsed_config_with_defaults_filled_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("station.yaml");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(
            br#"
station:
  id: station-02
  name: "Line 2 Station"
batches: []
"#,
        )
        .unwrap();

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["config", "show", "--config"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let parsed: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(parsed["station"]["id"], "station-02");
    assert_eq!(parsed["server"]["port"], 8080, "defaults are filled in, not just echoed");
    assert_eq!(parsed["backend"]["max_retries"], 5);
}

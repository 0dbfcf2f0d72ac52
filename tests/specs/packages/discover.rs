use assert_cmd::Command;
use std::io::Write;

fn write_package(root: &std::path::Path, dir_name: &str, manifest: &str) {
    let pkg_dir = root.join(dir_name);
    std::fs::create_dir_all(&pkg_dir).unwrap();
    std::fs::File::create(pkg_dir.join("manifest.yaml")).unwrap().write_all(manifest.as_bytes()).unwrap();
}

fn manifest(name: &str, version: &str, description: &str) -> String {
    format!(
        r#"
name: {name}
version: "{version}"
description: "{description}"
entry_point:
  module: sequence
  class: Sequence
"#
    )
}

#[test]
fn lists_every_valid_package_sorted_by_name() {
    let root = tempfile::tempdir().unwrap();
    write_package(root.path(), "power_supply_test", &manifest("power_supply_test", "1.0.0", "PSU burn-in"));
    write_package(root.path(), "led_test", &manifest("led_test", "2.1.0", "LED brightness check"));

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["packages", "list", "--root"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("led_test\t2.1.0"));
    assert!(lines[1].starts_with("power_supply_test\t1.0.0"));
}

#[test]
fn empty_root_lists_nothing_and_still_succeeds() {
    let root = tempfile::tempdir().unwrap();

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["packages", "list", "--root"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    assert!(output.stdout.is_empty());
}

#[test]
fn hidden_and_non_directory_entries_are_skipped() {
    let root = tempfile::tempdir().unwrap();
    write_package(root.path(), ".hidden_pkg", &manifest("hidden_pkg", "1.0.0", "should not appear"));
    std::fs::File::create(root.path().join("stray_file.txt")).unwrap();
    write_package(root.path(), "visible_pkg", &manifest("visible_pkg", "1.0.0", "visible"));

    let output = Command::cargo_bin("station")
        .unwrap()
        .args(["packages", "list", "--root"])
        .arg(root.path())
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("visible_pkg"));
}

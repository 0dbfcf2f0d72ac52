use assert_cmd::Command;

#[test]
fn top_level_help_lists_every_subcommand() {
    let output = Command::cargo_bin("station").unwrap().arg("--help").output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    for name in ["serve", "config", "packages", "queue"] {
        assert!(stdout.contains(name), "expected --help output to mention '{name}':\n{stdout}");
    }
}

#[test]
fn unknown_subcommand_fails_with_nonzero_exit() {
    Command::cargo_bin("station").unwrap().arg("bogus-command").assert().failure();
}

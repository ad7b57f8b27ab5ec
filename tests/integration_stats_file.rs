// Drives the binary's non-interactive `--stats` path against real files.

use std::fs;

use assert_cmd::Command;

fn wpm() -> Command {
    Command::cargo_bin("wpm").unwrap()
}

#[test]
fn stats_table_lists_every_tag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wpm.csv");
    let config = dir.path().join("config.toml");
    fs::write(
        &path,
        "1,60.0,0.95,1,1,3,2024-03-01 12:00:00.000000,default,laptop\n\
         2,70.0,0.97,1,1,4,2024-03-01 12:01:00.000000,default,laptop\n\
         3,80.0,0.99,1,1,5,2024-03-01 12:02:00.000000,default,desktop\n",
    )
    .unwrap();

    let output = wpm()
        .args(["--stats", "--stats-file"])
        .arg(&path)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(output.status.success());
    let table = String::from_utf8(output.stdout).unwrap();
    assert!(table.starts_with("Tag"));
    assert!(table.contains("laptop"));
    assert!(table.contains("desktop"));
    // A missing config file is created with the defaults.
    assert!(config.exists());
}

#[test]
fn unreadable_stats_file_is_moved_aside() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wpm.csv");
    fs::write(&path, "this is, not a stats file\n").unwrap();

    let output = wpm()
        .args(["--stats", "--stats-file"])
        .arg(&path)
        .arg("--config")
        .arg(dir.path().join("config.toml"))
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(!path.exists());
    assert_eq!(
        fs::read_to_string(dir.path().join("wpm.csv.old")).unwrap(),
        "this is, not a stats file\n"
    );
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("wpm.csv.old"));
}

#[test]
fn malformed_config_fails_with_message() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    fs::write(&config, "[wpm]\nconfidence_level = 2.0\n").unwrap();

    let output = wpm()
        .args(["--stats", "--stats-file"])
        .arg(dir.path().join("wpm.csv"))
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.starts_with("wpm: "));
    assert!(stderr.contains("confidence_level"));
}

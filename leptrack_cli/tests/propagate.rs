#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const CONFIG: &str = "\
seed 3
ecut_inside 500
vcut_inside -1
integrate

detector
sphere 1e8

sector
sphere 1e9
medium ice 1.0
";

#[test]
fn propagates_a_short_track() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("detector.cfg");
    config.write_str(CONFIG).unwrap();

    Command::cargo_bin("leptrack")
        .unwrap()
        .args([
            "propagate",
            config.path().to_str().unwrap(),
            "--particle",
            "mu",
            "--energy",
            "2e3",
            "--distance",
            "500",
            "--events",
            "2",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("transited"));
}

#[test]
fn per_event_rows_are_printed_on_request() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("detector.cfg");
    config.write_str(CONFIG).unwrap();

    Command::cargo_bin("leptrack")
        .unwrap()
        .args([
            "propagate",
            config.path().to_str().unwrap(),
            "--energy",
            "2e3",
            "--distance",
            "500",
            "--per-event",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("outcome"));
}

#[test]
fn missing_config_file_fails() {
    Command::cargo_bin("leptrack")
        .unwrap()
        .args(["propagate", "/nonexistent/path.cfg"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn malformed_geometry_is_fatal() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("broken.cfg");
    config
        .write_str("detector\ncylinder 100\nsector\nsphere 1e9\nmedium ice 1.0\n")
        .unwrap();

    Command::cargo_bin("leptrack")
        .unwrap()
        .args(["propagate", config.path().to_str().unwrap()])
        .assert()
        .failure()
        .code(1);
}

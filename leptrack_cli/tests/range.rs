#![allow(missing_docs)]

use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::*;

const CONFIG: &str = "\
integrate

detector
sphere 1e8

sector
sphere 1e9
medium ice 1.0
";

#[test]
fn prints_the_csda_range() {
    let dir = assert_fs::TempDir::new().unwrap();
    let config = dir.child("detector.cfg");
    config.write_str(CONFIG).unwrap();

    Command::cargo_bin("leptrack")
        .unwrap()
        .args([
            "range",
            config.path().to_str().unwrap(),
            "--energy",
            "1e4,1e5",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("range [cm]"));
}

#[test]
fn range_requires_at_least_one_energy() {
    Command::cargo_bin("leptrack")
        .unwrap()
        .args(["range", "some.cfg"])
        .assert()
        .failure();
}

//! Command line tests for the `spool-uploadr` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();

    Command::cargo_bin("spool-uploadr")
        .unwrap()
        .arg(dir.path().join("absent.yaml"))
        .assert()
        .failure()
        .stdout(predicate::str::contains("config-file:"));
}

#[test]
fn test_invalid_config_fails() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("spool.yaml");
    std::fs::write(&config_path, "log_dir: [not, a, path\n").unwrap();

    Command::cargo_bin("spool-uploadr")
        .unwrap()
        .arg(&config_path)
        .assert()
        .failure();
}

#[test]
fn test_unauthenticated_prints_authorize_link() {
    let dir = TempDir::new().unwrap();
    let local_dir = dir.path().join("outbox");
    std::fs::create_dir(&local_dir).unwrap();
    std::fs::write(local_dir.join("a.bin"), b"untouched").unwrap();

    let config_path = dir.path().join("spool.yaml");
    std::fs::write(
        &config_path,
        format!(
            "log_dir: {}\napp_id: spool-cli-test\ntoken: \"\"\nlocal_dir: {}\nremote_dir: \"disk:/backup\"\n",
            dir.path().join("logs").display(),
            local_dir.display()
        ),
    )
    .unwrap();

    Command::cargo_bin("spool-uploadr")
        .unwrap()
        .arg(&config_path)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stdout(predicate::str::contains("oauth.yandex.ru/authorize"))
        .stdout(predicate::str::contains("client_id=spool-cli-test"))
        .stdout(predicate::str::contains("token=<unset>"));

    assert!(local_dir.join("a.bin").exists());
    assert!(dir.path().join("logs").exists());
}

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Temp dir holding a config that keeps state inside it and never touches
/// the system resolver configuration.
fn workspace() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    let state = dir.path().join("state.json");
    std::fs::write(
        &config,
        format!(
            "state_path = '{}'\n\n[dns]\nnameservers = [\"127.0.0.1\"]\n",
            state.display()
        ),
    )
    .unwrap();
    (dir, config)
}

fn rblwatch(config: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("rblwatch").unwrap();
    cmd.env_remove("RUST_LOG").arg("--config").arg(config).arg("--no-color");
    cmd
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("rblwatch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("watch"))
        .stdout(predicate::str::contains("zones"));
}

#[test]
fn test_config_path_and_init() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nested").join("config.toml");

    rblwatch(&config)
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));

    rblwatch(&config).args(["config", "init"]).assert().success();
    assert!(config.exists());

    rblwatch(&config)
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    rblwatch(&config).args(["config", "init", "--force"]).assert().success();
}

#[test]
fn test_config_show_json() {
    let (_dir, config) = workspace();
    rblwatch(&config)
        .args(["config", "show", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"per_zone_rate\""))
        .stdout(predicate::str::contains("127.0.0.1"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[dns]\nconcurrency = 0\n").unwrap();

    rblwatch(&config).args(["targets", "list"]).assert().failure();
}

#[test]
fn test_targets_lifecycle() {
    let (_dir, config) = workspace();

    rblwatch(&config)
        .args(["targets", "add", "192.0.2.10"])
        .assert()
        .success();
    rblwatch(&config)
        .args(["targets", "add", "mail.example.com", "--id", "mx"])
        .assert()
        .success();
    rblwatch(&config)
        .args(["targets", "add", "192.0.2.10"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    rblwatch(&config).args(["targets", "disable", "mx"]).assert().success();

    rblwatch(&config)
        .args(["targets", "list", "-o", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id,address,kind,enabled"))
        .stdout(predicate::str::contains("192.0.2.10,192.0.2.10,ip,true"))
        .stdout(predicate::str::contains("mx,mail.example.com,domain,false"));

    rblwatch(&config).args(["targets", "remove", "mx"]).assert().success();
    rblwatch(&config)
        .args(["targets", "remove", "mx"])
        .assert()
        .failure();
}

#[test]
fn test_empty_target_is_rejected() {
    let (_dir, config) = workspace();
    rblwatch(&config)
        .args(["targets", "add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid target"));
}

#[test]
fn test_zone_defaults_installed_once() {
    let (_dir, config) = workspace();

    rblwatch(&config)
        .args(["zones", "defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 55 of 55"));
    rblwatch(&config)
        .args(["zones", "defaults"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Installed 0 of 55"));

    rblwatch(&config)
        .args(["zones", "list", "-o", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("zen.spamhaus.org,true,true"))
        .stdout(predicate::str::contains("bl.spamcop.net,false,true"));

    rblwatch(&config)
        .args(["zones", "add", "bl.spamcop.net"])
        .assert()
        .failure();
}

#[test]
fn test_empty_history_and_status() {
    let (_dir, config) = workspace();

    rblwatch(&config)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No runs recorded yet"));
    rblwatch(&config)
        .args(["status", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_run_without_zones_completes_empty() {
    let (_dir, config) = workspace();
    rblwatch(&config).args(["targets", "add", "192.0.2.10"]).assert().success();

    rblwatch(&config)
        .args(["run", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"completed\""))
        .stdout(predicate::str::contains("\"id\": 1"));

    rblwatch(&config).args(["run", "-o", "json"]).assert().success().stdout(predicate::str::contains("\"id\": 2"));

    rblwatch(&config)
        .args(["history", "-o", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2,manual,completed"))
        .stdout(predicate::str::contains("1,manual,completed"));
}

#[test]
fn test_run_with_unknown_zone_fails() {
    let (_dir, config) = workspace();
    rblwatch(&config).args(["zones", "add", "bl.spamcop.net"]).assert().success();

    rblwatch(&config)
        .args(["run", "--zone", "nope.example.org"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed"));

    rblwatch(&config)
        .args(["history", "-o", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"status\": \"failed\""));
}

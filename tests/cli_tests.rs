use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn trackly() -> Command {
    let mut cmd = Command::cargo_bin("trackly").expect("trackly binary");
    cmd.env_remove("RUST_LOG")
        .env_remove("TRACKLY_API_URL")
        .env_remove("TRACKLY_HUB_URL")
        .env_remove("TRACKLY_TENANT_ID")
        .env_remove("TRACKLY_API_TOKEN");
    cmd
}

#[test]
fn help_lists_commands() {
    trackly()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("orders"))
        .stdout(predicate::str::contains("deliveries"))
        .stdout(predicate::str::contains("track"));
}

#[test]
fn track_rejects_malformed_delivery_id() {
    trackly()
        .args(["track", "not-a-guid"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not-a-guid"));
}

#[test]
fn interval_requires_watch() {
    trackly()
        .args(["orders", "--interval", "5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--watch"));
}

#[test]
fn invalid_config_file_exits_nonzero() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trackly.toml");
    std::fs::write(&path, "[refresh]\ninterval_secs = 0\n").unwrap();

    trackly()
        .arg("--config")
        .arg(&path)
        .args(["--color", "never", "orders"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("interval_secs"));
}

#[test]
fn unreachable_api_reports_list_failure() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("trackly.toml");
    std::fs::write(
        &path,
        concat!(
            "[api]\n",
            "base_url = \"http://127.0.0.1:9\"\n",
            "retry_max_attempts = 1\n",
            "connect_timeout_ms = 500\n",
            "timeout_ms = 1000\n",
            "\n",
            "[logging]\n",
            "level = \"off\"\n",
        ),
    )
    .unwrap();

    trackly()
        .arg("--config")
        .arg(&path)
        .args(["--color", "never", "deliveries"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to load deliveries:list"));
}

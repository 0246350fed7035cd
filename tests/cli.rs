use assert_cmd::Command;
use predicates::prelude::*;

/// The binary, isolated from the caller's config and proxy settings.
fn gallery(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("gallery").unwrap();
    cmd.env("GALLERY_CONFIG_DIR", config_dir)
        .env_remove("GALLERY_BASE_URL")
        .env_remove("RUST_LOG")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .env("NO_PROXY", "127.0.0.1,localhost");
    cmd
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}

#[test]
fn test_endpoints_lists_registry() {
    let temp_dir = tempfile::tempdir().unwrap();
    gallery(temp_dir.path())
        .arg("endpoints")
        .assert()
        .success()
        .stdout(predicate::str::contains("fetchAlbums"))
        .stdout(predicate::str::contains("removePhoto"))
        .stdout(predicate::str::contains("/albums"));
}

#[test]
fn test_config_set_then_get() {
    let temp_dir = tempfile::tempdir().unwrap();

    gallery(temp_dir.path())
        .args(["config", "base-url", "http://gallery.test:3005/"])
        .assert()
        .success()
        .stdout(predicate::str::contains("base-url"));
    assert!(temp_dir.path().join("config.json").exists());

    gallery(temp_dir.path())
        .args(["config", "base-url"])
        .assert()
        .success()
        .stdout(predicate::str::diff("http://gallery.test:3005\n"));

    gallery(temp_dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("latency-ms = 0"))
        .stdout(predicate::str::contains("keep-unused-secs = 60"));
}

#[test]
fn test_config_rejects_unknown_keys() {
    let temp_dir = tempfile::tempdir().unwrap();
    gallery(temp_dir.path())
        .args(["config", "colour", "blue"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unknown config key"));
    assert!(!temp_dir.path().join("config.json").exists());
}

#[test]
fn test_unreachable_server_fails_with_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();
    gallery(temp_dir.path())
        .args(["users", "list", "--base-url", &closed_port_url()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::starts_with("Error"));
}

#[test]
fn test_failed_mutation_fails_with_exit_code() {
    let temp_dir = tempfile::tempdir().unwrap();
    gallery(temp_dir.path())
        .args(["albums", "add", "1", "--base-url", &closed_port_url()])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Added").not());
}

#[test]
fn test_missing_arguments_are_usage_errors() {
    let temp_dir = tempfile::tempdir().unwrap();
    gallery(temp_dir.path())
        .args(["albums", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("USER_ID"));
}

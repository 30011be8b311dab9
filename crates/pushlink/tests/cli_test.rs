//! Integration tests for the `pushlink` CLI binary.
//!
//! Argument parsing and config handling run without a backend; the
//! registration flow runs against a wiremock backend. Every test points
//! the config and data directories at its own temp dir.
#![allow(clippy::unwrap_used)]

use std::path::Path;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN_ENV: &str = "PUSHLINK_TEST_AUTH_TOKEN";

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `pushlink` binary with env isolation.
fn pushlink_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("pushlink");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join("config"))
        .env("XDG_DATA_HOME", home.join("data"))
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .env_remove("PUSHLINK_PROFILE")
        .env_remove("PUSHLINK_BACKEND")
        .env_remove("PUSHLINK_OUTPUT")
        .env_remove("PUSHLINK_TIMEOUT")
        .env_remove("PUSHLINK_REG_ID");
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// Write a profile pointing at `base_url` whose token comes from
/// [`TOKEN_ENV`].
fn write_profile(home: &Path, base_url: &str) {
    let dir = home.join("config").join("pushlink");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("config.toml"),
        format!(
            r#"default_profile = "default"

[profiles.default]
app_name = "bohr"
base_url = "{base_url}"
sender_id = "sender@example.com"
resource = "laptop"
account = "alice"
device_id = "dev-1"
auth_token_env = "{TOKEN_ENV}"
timeout = 5
"#
        ),
    )
    .unwrap();
}

async fn mount_login(server: &MockServer, status: u16) {
    let mut response = ResponseTemplate::new(status);
    if status == 302 {
        response = response
            .insert_header("location", "/")
            .insert_header("set-cookie", "SACSID=session-1; Path=/");
    }
    Mock::given(method("GET"))
        .and(path("/_ah/login"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn backend() -> MockServer {
    let server = MockServer::start().await;
    mount_login(&server, 302).await;
    Mock::given(method("PUT"))
        .and(path("/device/dev-1/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"dev_id": "dev-1", "user_id": "u-1"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/device/dev-1/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
        .mount(&server)
        .await;
    server
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = TempDir::new().unwrap();
    let output = pushlink_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("register")
                .and(predicate::str::contains("resource"))
                .and(predicate::str::contains("config")),
        );
}

#[test]
fn test_version_flag() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pushlink"));
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_register_without_config() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args(["register", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config init"));
}

#[test]
fn test_unknown_collection_is_usage_error() {
    let home = TempDir::new().unwrap();
    let output = pushlink_cmd(home.path())
        .args(["resource", "list", "gadgets"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(combined_output(&output).contains("unknown collection"));
}

#[test]
fn test_field_without_equals_is_usage_error() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args(["resource", "create", "user", "name"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("key=value"));
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn test_config_init_then_show() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args([
            "config",
            "init",
            "--app-name",
            "bohr",
            "--sender-id",
            "sender@example.com",
            "--device-id",
            "dev-9",
        ])
        .assert()
        .success();

    pushlink_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("app_name = \"bohr\"")
                .and(predicate::str::contains("device_id = \"dev-9\"")),
        );
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args(["config", "set", "colour", "red"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown config key"));
}

#[test]
fn test_config_show_redacts_token() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args(["config", "set", "auth_token", "hunter2"])
        .assert()
        .success();
    pushlink_cmd(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_status_without_state() {
    let home = TempDir::new().unwrap();
    pushlink_cmd(home.path())
        .args(["status", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("INVALID/NONE"));
}

// ── Registration flow ───────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_register_status_unregister() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["register", "--reg-id", "reg-42", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("REGISTERED/NONE"));

    let output = pushlink_cmd(home.path())
        .args(["status", "-o", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["account"], "alice");
    assert_eq!(state["state"], "REGISTERED");
    assert_eq!(state["reg_id"], "reg-42");

    // Registering again is a no-op.
    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["register", "--reg-id", "reg-other", "-o", "plain"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Already registered"));

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["unregister", "-o", "plain"])
        .assert()
        .success()
        .stdout(predicate::str::contains("UNREGISTERED/NONE"));

    let requests = server.received_requests().await.unwrap();
    assert!(
        requests
            .iter()
            .any(|r| r.method.as_str() == "DELETE" && r.url.path() == "/device/dev-1/")
    );
    assert!(requests.iter().all(|r| {
        r.url.path() == "/_ah/login"
            || r.headers
                .get("cookie")
                .is_some_and(|v| v.to_str().unwrap().contains("SACSID=session-1"))
    }));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rejected_login_is_auth_cookie_error() {
    let server = MockServer::start().await;
    mount_login(&server, 200).await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["register", "--reg-id", "reg-42", "-o", "plain"])
        .assert()
        .code(5)
        .stdout(predicate::str::contains("ERROR/ERROR_AUTH_COOKIE"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_missing_reg_id_means_no_push_service() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["register", "-o", "plain"])
        .assert()
        .code(5)
        .stdout(predicate::str::contains("ERROR/ERROR_C2DM_NOT_FOUND"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_clear_forgets_account() {
    let server = backend().await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["register", "--reg-id", "reg-42", "-q"])
        .assert()
        .success();

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["clear", "-o", "json"])
        .assert()
        .success();

    let output = pushlink_cmd(home.path())
        .args(["status", "-o", "json"])
        .output()
        .unwrap();
    let state: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(state["account"], "");
    assert_eq!(state["state"], "UNREGISTERED");
    assert_eq!(state["last_change"], "-");
}

// ── Resources ───────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_resource_list_renders_keys() {
    let server = MockServer::start().await;
    mount_login(&server, 302).await;
    Mock::given(method("GET"))
        .and(path("/user/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            {"user_id": "u-1", "name": "alice"},
            {"user_id": "u-2", "name": "bob"},
        ])))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["resource", "list", "user", "-o", "plain"])
        .assert()
        .success()
        .stdout("u-1\nu-2\n");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resource_get_missing_is_not_found() {
    let server = MockServer::start().await;
    mount_login(&server, 302).await;
    Mock::given(method("GET"))
        .and(path("/publication/p-9/"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env(TOKEN_ENV, "tok")
        .args(["resource", "get", "publication", "p-9"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("not found"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_resource_without_token_is_auth_error() {
    let server = MockServer::start().await;
    let home = TempDir::new().unwrap();
    write_profile(home.path(), &server.uri());

    pushlink_cmd(home.path())
        .env_remove(TOKEN_ENV)
        .args(["resource", "list", "device"])
        .assert()
        .code(3);
}

use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use serde_json::{json, Value};
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

fn memory_config(port: u16) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
backend = "memory"
"#,
        port
    )
}

fn sqlite_config(port: u16, db_path: &std::path::Path) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[storage]
backend = "sqlite"

[storage.sqlite]
path = "{}"
"#,
        port,
        db_path.display()
    )
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(contents.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_ticketdesk"))
        .env("TICKETDESK_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

/// Run the binary to completion and report whether it succeeded.
async fn run_to_exit(config_path: &std::path::Path) -> bool {
    timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_ticketdesk"))
            .env("TICKETDESK_CONFIG", config_path)
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Command timed out")
    .expect("Failed to execute command")
    .status
    .success()
}

#[tokio::test]
async fn test_health_endpoint() {
    let port = get_available_port();
    let config = write_config(&memory_config(port));

    let mut server = spawn_server(config.path()).await;
    assert!(
        wait_for_server(port, 40).await,
        "Server did not start in time"
    );

    let response = Client::new()
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());
    let json: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(json["status"], "ok");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_sqlite_tickets_survive_restart() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("tickets.db");
    let client = Client::new();

    let port = get_available_port();
    let config = write_config(&sqlite_config(port, &db_path));
    let mut server = spawn_server(config.path()).await;
    assert!(wait_for_server(port, 40).await, "Server did not start in time");

    let created: Value = client
        .put(format!("http://127.0.0.1:{}/api/v1/ticket", port))
        .json(&json!({ "description": "printer jam", "createdBy": "alice" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    server.kill().await.ok();
    let _ = server.wait().await;

    let port = get_available_port();
    let config = write_config(&sqlite_config(port, &db_path));
    let mut server = spawn_server(config.path()).await;
    assert!(wait_for_server(port, 40).await, "Server did not restart in time");

    let response = client
        .get(format!("http://127.0.0.1:{}/api/v1/ticket/{}", port, id))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ticket"]["description"], "printer jam");

    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    assert!(!run_to_exit(std::path::Path::new("/nonexistent/config.toml")).await);
}

#[tokio::test]
async fn test_missing_storage_section_exits_with_error() {
    let config = write_config(
        r#"
[server]
port = 8080
"#,
    );

    assert!(!run_to_exit(config.path()).await);
}

#[tokio::test]
async fn test_port_zero_fails_validation() {
    let config = write_config(
        r#"
[server]
port = 0

[storage]
backend = "memory"
"#,
    );

    assert!(!run_to_exit(config.path()).await);
}

//! End-to-end tests against a real Docker daemon.
//!
//! Skipped unless `docker info` succeeds. Set SKIP_CONTAINER_TESTS=1 to skip
//! them explicitly.

use dockbridge::container::{ContainerOrchestrator, ContainerRuntime, ContainerState, ExecConfig};
use dockbridge::{ServerConfig, ToolRegistry, build_server};
use serde_json::json;
use serial_test::serial;
use std::process::Command;
use std::sync::Arc;
use test_tag::tag;

const TEST_CONTAINER: &str = "dockbridge-live-test";
const TEST_IMAGE: &str = "alpine:3.20";

/// Check if container tests should run.
fn should_run_container_tests() -> bool {
    if let Ok(value) = std::env::var("SKIP_CONTAINER_TESTS")
        && (value == "1" || value.eq_ignore_ascii_case("true"))
    {
        return false;
    }

    Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Start a throwaway container; returns false when it could not be started.
fn start_test_container() -> bool {
    remove_test_container();
    Command::new("docker")
        .args(["run", "-d", "--name", TEST_CONTAINER, TEST_IMAGE, "sleep", "300"])
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn remove_test_container() {
    let _ = Command::new("docker")
        .args(["rm", "-f", TEST_CONTAINER])
        .output();
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_exec_splits_stdout_and_stderr() {
    if !should_run_container_tests() || !start_test_container() {
        eprintln!("Skipping container tests (Docker not available or SKIP_CONTAINER_TESTS=1)");
        return;
    }

    let orchestrator = ContainerOrchestrator::new().await.expect("Failed to connect");
    assert_eq!(
        orchestrator.container_state(TEST_CONTAINER).await.unwrap(),
        ContainerState::Running
    );

    let config = ExecConfig::builder()
        .shell("echo out; echo err >&2; exit 3")
        .build();
    let output = orchestrator.exec(TEST_CONTAINER, &config).await.unwrap();

    assert_eq!(output.stdout, "out\n");
    assert_eq!(output.stderr, "err\n");
    assert_eq!(output.exit_code, Some(3));

    let config = ExecConfig::builder()
        .shell("cat")
        .stdin("piped input")
        .build();
    let output = orchestrator.exec(TEST_CONTAINER, &config).await.unwrap();
    assert_eq!(output.stdout, "piped input");

    remove_test_container();
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_file_tools_round_trip() {
    if !should_run_container_tests() || !start_test_container() {
        eprintln!("Skipping container tests");
        return;
    }

    let runtime = Arc::new(ContainerOrchestrator::new().await.expect("Failed to connect"));
    let config = ServerConfig {
        container: Some(TEST_CONTAINER.to_string()),
        ..Default::default()
    };
    let server = build_server(&config, runtime);
    let ctx = server.context();
    let registry = ToolRegistry::with_default_tools();

    let content = "first line\nit's a 'quoted' $line\n";
    let output = registry
        .call(ctx, "write-file", json!({"path": "/tmp/dir with space/f.txt", "content": content}))
        .await
        .unwrap();
    assert!(!output.is_error, "{}", output.text);

    let output = registry
        .call(ctx, "read-file", json!({"path": "/tmp/dir with space/f.txt"}))
        .await
        .unwrap();
    assert_eq!(output.text, content);

    let output = registry
        .call(
            ctx,
            "replace-text",
            json!({"path": "/tmp/dir with space/f.txt", "old_text": "first", "new_text": "1st"}),
        )
        .await
        .unwrap();
    assert!(!output.is_error, "{}", output.text);

    let output = registry
        .call(ctx, "search-text", json!({"pattern": "1st", "path": "/tmp"}))
        .await
        .unwrap();
    assert!(output.text.contains("f.txt:1:1st line"), "{}", output.text);

    let output = registry
        .call(ctx, "delete-file", json!({"path": "/tmp/dir with space", "recursive": true}))
        .await
        .unwrap();
    assert!(!output.is_error, "{}", output.text);

    remove_test_container();
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_exec_in_stopped_container_is_rejected() {
    if !should_run_container_tests() || !start_test_container() {
        eprintln!("Skipping container tests");
        return;
    }

    let runtime = Arc::new(ContainerOrchestrator::new().await.expect("Failed to connect"));
    runtime.stop_container(TEST_CONTAINER, Some(0)).await.unwrap();

    let server = build_server(&ServerConfig::default(), runtime);
    let output = ToolRegistry::with_default_tools()
        .call(
            server.context(),
            "execute-command",
            json!({"command": "true", "container": TEST_CONTAINER}),
        )
        .await
        .unwrap();

    assert!(output.is_error);
    assert!(output.text.contains("is not running"), "{}", output.text);

    remove_test_container();
}

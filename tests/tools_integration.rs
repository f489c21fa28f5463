//! Tool handlers against an in-memory container runtime.

mod common;

use common::{FakeRuntime, context, exit, ok};
use dockbridge::container::{ContainerState, ExecOutput};
use dockbridge::{ToolContext, ToolRegistry};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

async fn call(ctx: &ToolContext, name: &str, args: Value) -> dockbridge::ToolOutput {
    ToolRegistry::with_default_tools()
        .call(ctx, name, args)
        .await
        .expect("tool is registered")
}

#[tokio::test]
async fn test_execute_command_success() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("hello\n")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "execute-command",
        json!({"command": "echo hello", "workdir": "/app", "env": {"MODE": "test"}}),
    )
    .await;

    assert!(!output.is_error, "{}", output.text);
    assert_eq!(output.text, "hello\n[exit code: 0]");

    let execs = runtime.execs();
    assert_eq!(execs.len(), 1);
    let (container, config) = &execs[0];
    assert_eq!(container, "web");
    assert_eq!(config.cmd(), ["sh", "-c", "echo hello"]);
    assert_eq!(config.working_dir(), Some("/app"));
    assert_eq!(config.env(), ["MODE=test"]);
}

#[tokio::test]
async fn test_execute_command_nonzero_exit_is_error_result() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| exit(2, "", "missing file\n")));
    let ctx = context(runtime);

    let output = call(&ctx, "execute-command", json!({"command": "ls /nope"})).await;

    assert!(output.is_error);
    assert!(output.text.starts_with("Command exited with code 2"));
    assert!(output.text.contains("[stderr]\nmissing file"));
}

#[tokio::test]
async fn test_execute_command_in_stopped_container_fails_fast() {
    let runtime = Arc::new(FakeRuntime::new().with_container("db", ContainerState::Stopped, &[]));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "execute-command",
        json!({"command": "true", "container": "db"}),
    )
    .await;

    assert!(output.is_error);
    assert_eq!(output.text, "Container db is not running (state: stopped)");
    assert!(runtime.execs().is_empty());
}

#[tokio::test]
async fn test_execute_command_times_out() {
    let runtime = Arc::new(FakeRuntime::new().with_exec_delay(Duration::from_secs(30)));
    let ctx = context(runtime).with_command_timeout(Duration::from_millis(50));

    let started = std::time::Instant::now();
    let output = call(&ctx, "execute-command", json!({"command": "sleep 30"})).await;

    assert!(output.is_error);
    assert!(output.text.contains("timed out"), "{}", output.text);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_missing_container_and_unknown_container() {
    let runtime = Arc::new(FakeRuntime::new());
    let ctx = ToolContext::new(runtime.clone());

    let output = call(&ctx, "read-file", json!({"path": "/etc/hostname"})).await;
    assert!(output.is_error);
    assert!(output.text.starts_with("No container specified"));

    let output = call(
        &ctx,
        "inspect-container",
        json!({"container": "ghost"}),
    )
    .await;
    assert!(output.is_error);
    assert_eq!(output.text, "Container not found: ghost");
}

#[tokio::test]
async fn test_invalid_params_are_reported() {
    let ctx = context(Arc::new(FakeRuntime::new()));

    let output = call(&ctx, "execute-command", json!({})).await;
    assert!(output.is_error);
    assert!(output.text.starts_with("Invalid parameters"));

    let output = call(&ctx, "execute-command", json!({"command": "ls", "timeout": 0})).await;
    assert!(output.is_error);
    assert!(output.text.contains("timeout"));
}

#[tokio::test]
async fn test_read_file_with_range() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("line 10\nline 11\n")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "read-file",
        json!({"path": "/var/log/app log.txt", "start_line": 10, "max_lines": 2}),
    )
    .await;

    assert!(!output.is_error);
    assert_eq!(output.text, "line 10\nline 11\n");
    assert_eq!(
        runtime.last_script().unwrap(),
        "test -r '/var/log/app log.txt' && sed -n 10,11p '/var/log/app log.txt'"
    );
}

#[tokio::test]
async fn test_read_file_with_huge_range_does_not_overflow() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "read-file",
        json!({"path": "/etc/hosts", "start_line": u64::MAX, "max_lines": 2}),
    )
    .await;

    assert!(!output.is_error, "{}", output.text);
    let end = u64::MAX;
    assert_eq!(
        runtime.last_script().unwrap(),
        format!("test -r /etc/hosts && sed -n {end},{end}p /etc/hosts")
    );
}

#[tokio::test]
async fn test_write_file_sends_content_on_stdin() {
    let runtime = Arc::new(FakeRuntime::new());
    let ctx = context(runtime.clone());
    let content = "it's \"quoted\" $HOME `cmd`\n";

    let output = call(
        &ctx,
        "write-file",
        json!({"path": "/app/notes.txt", "content": content}),
    )
    .await;

    assert!(!output.is_error, "{}", output.text);
    assert_eq!(output.text, format!("Wrote {} bytes to /app/notes.txt", content.len()));

    let (_, config) = runtime.execs().pop().unwrap();
    assert_eq!(config.stdin(), Some(content.as_bytes()));
    let script = config.shell_script().unwrap();
    assert!(script.starts_with("mkdir -p"));
    assert!(script.ends_with("cat > /app/notes.txt"));
}

#[tokio::test]
async fn test_replace_text_rewrites_file() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|config| {
        if config.stdin().is_some() {
            ok("")
        } else {
            ok("name = \"old\"\nversion = 1\n")
        }
    }));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "replace-text",
        json!({"path": "Cargo.toml", "old_text": "\"old\"", "new_text": "\"new\""}),
    )
    .await;

    assert!(!output.is_error, "{}", output.text);
    assert_eq!(output.text, "Replaced 1 occurrence(s) in Cargo.toml");

    let execs = runtime.execs();
    assert_eq!(execs.len(), 2);
    assert_eq!(execs[0].1.shell_script(), Some("cat Cargo.toml"));
    assert_eq!(
        execs[1].1.stdin(),
        Some("name = \"new\"\nversion = 1\n".as_bytes())
    );
}

#[tokio::test]
async fn test_replace_text_not_found_does_not_write() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("alpha\n")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "replace-text",
        json!({"path": "a.txt", "old_text": "beta", "new_text": "gamma"}),
    )
    .await;

    assert!(output.is_error);
    assert_eq!(output.text, "Text not found in a.txt");
    assert_eq!(runtime.execs().len(), 1);
}

#[tokio::test]
async fn test_replace_text_refuses_non_utf8_file() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ExecOutput {
        stdout: "caf\u{FFFD} x\n".to_string(),
        exit_code: Some(0),
        stdout_lossy: true,
        ..Default::default()
    }));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "replace-text",
        json!({"path": "/data/latin1.txt", "old_text": "x", "new_text": "y"}),
    )
    .await;

    assert!(output.is_error);
    assert!(output.text.contains("not valid UTF-8"), "{}", output.text);
    assert_eq!(runtime.execs().len(), 1);
}

#[tokio::test]
async fn test_search_text_no_matches_is_not_an_error() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| exit(1, "", "")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "search-text",
        json!({"pattern": "TODO", "path": "/src", "include": "*.rs", "ignore_case": true}),
    )
    .await;

    assert!(!output.is_error);
    assert!(output.text.starts_with("No matches found"));
    assert_eq!(
        runtime.last_script().unwrap(),
        "grep -rn -i --include='*.rs' -e TODO /src"
    );
}

#[tokio::test]
async fn test_search_text_limits_results() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("a:1:x\nb:2:x\nc:3:x\n")));
    let ctx = context(runtime);

    let output = call(&ctx, "search-text", json!({"pattern": "x", "max_results": 2})).await;

    assert!(!output.is_error);
    assert!(output.text.starts_with("a:1:x\nb:2:x\n"));
    assert!(output.text.contains("showing 2 of 3"));
}

#[tokio::test]
async fn test_find_files() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok("./a.toml\n./b/c.toml\n")));
    let ctx = context(runtime.clone());

    let output = call(
        &ctx,
        "find-files",
        json!({"name": "*.toml", "file_type": "f", "max_depth": 3}),
    )
    .await;

    assert!(!output.is_error);
    assert_eq!(output.text, "./a.toml\n./b/c.toml");
    assert_eq!(
        runtime.last_script().unwrap(),
        "find . -maxdepth 3 -type f -name '*.toml'"
    );

    let output = call(&ctx, "find-files", json!({"file_type": "socket"})).await;
    assert!(output.is_error);
}

#[tokio::test]
async fn test_find_files_keeps_partial_results() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| {
        exit(
            1,
            "/app/a.toml\n/app/b.toml\n",
            "find: '/app/secret': Permission denied\n",
        )
    }));
    let ctx = context(runtime);

    let output = call(
        &ctx,
        "find-files",
        json!({"path": "/app", "name": "*.toml", "max_results": 1}),
    )
    .await;

    assert!(!output.is_error, "{}", output.text);
    assert!(output.text.starts_with("/app/a.toml\n... [1 more result(s) omitted"));
    assert!(!output.text.contains("/app/b.toml"));
    assert!(output.text.ends_with("[stderr]\nfind: '/app/secret': Permission denied"));
}

#[tokio::test]
async fn test_find_files_failure_without_results() {
    let runtime = Arc::new(
        FakeRuntime::new()
            .respond_with(|_| exit(1, "", "find: '/nope': No such file or directory\n")),
    );
    let ctx = context(runtime);

    let output = call(&ctx, "find-files", json!({"path": "/nope"})).await;

    assert!(output.is_error);
    assert!(output.text.starts_with("Command exited with code 1"));
}

#[tokio::test]
async fn test_delete_file_refuses_root() {
    let runtime = Arc::new(FakeRuntime::new());
    let ctx = context(runtime.clone());

    let output = call(&ctx, "delete-file", json!({"path": "/", "recursive": true})).await;

    assert!(output.is_error);
    assert!(output.text.contains("protected"));
    assert!(runtime.execs().is_empty());

    let output = call(&ctx, "delete-file", json!({"path": "/tmp/scratch"})).await;
    assert!(!output.is_error);
    assert_eq!(output.text, "Deleted /tmp/scratch");
}

#[tokio::test]
async fn test_container_lifecycle_tools() {
    let runtime = Arc::new(FakeRuntime::new().with_container("db", ContainerState::Stopped, &[]));
    let ctx = context(runtime.clone());

    let output = call(&ctx, "list-containers", json!({})).await;
    assert!(output.text.contains("web"));
    assert!(!output.text.contains("db"));
    assert!(output.text.ends_with("1 container(s)"));

    let output = call(&ctx, "list-containers", json!({"all": true})).await;
    assert!(output.text.contains("db"));

    let output = call(&ctx, "start-container", json!({"container": "db"})).await;
    assert_eq!(output.text, "Container db started.");
    assert_eq!(runtime.state_of("db"), Some(ContainerState::Running));

    let output = call(&ctx, "stop-container", json!({"container": "db", "timeout": 1})).await;
    assert_eq!(output.text, "Container db stopped.");
    assert_eq!(runtime.state_of("db"), Some(ContainerState::Stopped));

    let output = call(&ctx, "stop-container", json!({"container": "db", "timeout": -1})).await;
    assert!(output.is_error);
}

#[tokio::test]
async fn test_container_logs_tail() {
    let ctx = context(Arc::new(FakeRuntime::new()));

    let output = call(&ctx, "container-logs", json!({"tail": 1})).await;

    assert!(!output.is_error);
    assert_eq!(output.text, "web ready\n");
}

#[tokio::test]
async fn test_fetch_compose_file_from_host() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("compose.yml"),
        "services:\n  web:\n    image: nginx\n",
    )
    .unwrap();
    let working_dir = dir.path().to_string_lossy().to_string();

    let runtime = Arc::new(FakeRuntime::new().with_container(
        "shop-web-1",
        ContainerState::Running,
        &[
            ("com.docker.compose.project", "shop"),
            ("com.docker.compose.project.config_files", "compose.yml"),
            ("com.docker.compose.project.working_dir", working_dir.as_str()),
        ],
    ));
    let ctx = context(runtime);

    let output = call(&ctx, "fetch-compose-file", json!({"container": "shop-web-1"})).await;

    assert!(!output.is_error, "{}", output.text);
    assert!(output.text.contains("# Project: shop"));
    assert!(output.text.ends_with("services:\n  web:\n    image: nginx\n"));

    let output = call(&ctx, "fetch-compose-file", json!({})).await;
    assert!(output.is_error);
    assert!(output.text.contains("not started by Docker Compose"));
}

#[tokio::test]
async fn test_output_is_truncated() {
    let runtime = Arc::new(FakeRuntime::new().respond_with(|_| ok(&"x".repeat(500))));
    let ctx = context(runtime).with_max_output_bytes(100);

    let output = call(&ctx, "execute-command", json!({"command": "yes"})).await;

    assert!(!output.is_error);
    assert!(output.text.starts_with(&"x".repeat(100)));
    assert!(output.text.ends_with("[output truncated: showing 100 of 500 bytes]"));
}

//! Container listing, inspection, lifecycle, and log tools.

use crate::container::{ContainerDetails, ContainerSummary};
use crate::tools::{Result, Tool, ToolContext, ToolError, container_property, parse_params};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Write as _;

#[derive(Debug, Default, Deserialize)]
struct TargetParams {
    container: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StopParams {
    container: Option<String>,
    timeout: Option<i32>,
}

fn target_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "container": container_property() }
    })
}

fn stop_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "container": container_property(),
            "timeout": {
                "type": "integer",
                "minimum": 0,
                "description": "Seconds to wait before killing the container"
            }
        }
    })
}

fn validate_stop_timeout(timeout: Option<i32>) -> Result<Option<i32>> {
    match timeout {
        Some(t) if t < 0 => Err(ToolError::InvalidParams(
            "\"timeout\" must not be negative".to_string(),
        )),
        other => Ok(other),
    }
}

/// Lists containers known to the daemon.
pub struct ListContainersTool;

#[derive(Debug, Default, Deserialize)]
struct ListParams {
    #[serde(default)]
    all: bool,
}

#[async_trait]
impl Tool for ListContainersTool {
    fn name(&self) -> &'static str {
        "list-containers"
    }

    fn description(&self) -> &'static str {
        "List Docker containers with their ID, name, image, state and status. Only running containers are shown unless \"all\" is true."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "all": { "type": "boolean", "description": "Include stopped containers", "default": false }
            }
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: ListParams = parse_params(args)?;
        let containers = ctx.runtime().list_containers(params.all).await?;
        Ok(format_container_list(&containers, params.all))
    }
}

/// Render the `list-containers` table.
pub(crate) fn format_container_list(containers: &[ContainerSummary], all: bool) -> String {
    if containers.is_empty() {
        return if all {
            "No containers found.".to_string()
        } else {
            "No running containers found.".to_string()
        };
    }

    let rows: Vec<[String; 6]> = containers
        .iter()
        .map(|c| {
            [
                c.short_id().to_string(),
                c.name().to_string(),
                c.image.clone(),
                c.state.clone(),
                c.status.clone(),
                c.created
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ]
        })
        .collect();

    let headers = ["CONTAINER ID", "NAME", "IMAGE", "STATE", "STATUS", "CREATED"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: &[&str]| {
        let line: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        out.push_str(line.join("  ").trim_end());
        out.push('\n');
    };

    push_row(&headers);
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        push_row(&cells);
    }

    let _ = write!(out, "\n{} container(s)", containers.len());
    out
}

/// Shows state and configuration details of one container.
pub struct InspectContainerTool;

#[async_trait]
impl Tool for InspectContainerTool {
    fn name(&self) -> &'static str {
        "inspect-container"
    }

    fn description(&self) -> &'static str {
        "Show the state, image, command, mounts, ports, networks and labels of a container."
    }

    fn input_schema(&self) -> Value {
        target_schema()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: TargetParams = parse_params(args)?;
        let container = ctx.resolve_container(params.container.as_deref())?;
        let details = ctx.runtime().inspect_container(&container).await?;
        Ok(format_container_details(&details))
    }
}

/// Render the `inspect-container` report.
pub(crate) fn format_container_details(details: &ContainerDetails) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Container: {} ({})", details.name, details.short_id());
    let _ = writeln!(out, "Image: {}", details.image);
    match details.pid.filter(|_| details.running) {
        Some(pid) => {
            let _ = writeln!(out, "Status: {} (pid {})", details.status, pid);
        }
        None => {
            let _ = writeln!(out, "Status: {}", details.status);
        }
    }
    if let Some(ref started) = details.started_at {
        let _ = writeln!(out, "Started: {}", started);
    }
    if !details.running {
        if let Some(ref finished) = details.finished_at {
            let _ = writeln!(out, "Finished: {}", finished);
        }
        if let Some(code) = details.exit_code {
            let _ = writeln!(out, "Exit code: {}", code);
        }
    }
    let _ = writeln!(out, "Restarts: {}", details.restart_count);
    if let Some(ref dir) = details.working_dir {
        let _ = writeln!(out, "Working dir: {}", dir);
    }
    if !details.cmd.is_empty() {
        let _ = writeln!(out, "Command: {}", details.cmd.join(" "));
    }

    if !details.mounts.is_empty() {
        out.push_str("Mounts:\n");
        for mount in &details.mounts {
            let mode = if mount.read_write { "rw" } else { "ro" };
            let _ = writeln!(out, "  {} -> {} ({})", mount.source, mount.destination, mode);
        }
    }

    if !details.ports.is_empty() {
        out.push_str("Ports:\n");
        for port in &details.ports {
            match port.host_binding {
                Some(ref binding) => {
                    let _ = writeln!(out, "  {} -> {}", port.container_port, binding);
                }
                None => {
                    let _ = writeln!(out, "  {} (not published)", port.container_port);
                }
            }
        }
    }

    if !details.networks.is_empty() {
        out.push_str("Networks:\n");
        for (name, ip) in &details.networks {
            let ip = if ip.is_empty() { "-" } else { ip.as_str() };
            let _ = writeln!(out, "  {}: {}", name, ip);
        }
    }

    if !details.labels.is_empty() {
        out.push_str("Labels:\n");
        for (key, value) in &details.labels {
            let _ = writeln!(out, "  {}={}", key, value);
        }
    }

    out.trim_end().to_string()
}

/// Starts a stopped container.
pub struct StartContainerTool;

#[async_trait]
impl Tool for StartContainerTool {
    fn name(&self) -> &'static str {
        "start-container"
    }

    fn description(&self) -> &'static str {
        "Start a stopped container."
    }

    fn input_schema(&self) -> Value {
        target_schema()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: TargetParams = parse_params(args)?;
        let container = ctx.resolve_container(params.container.as_deref())?;
        ctx.runtime().start_container(&container).await?;
        Ok(format!("Container {} started.", container))
    }
}

/// Stops a running container.
pub struct StopContainerTool;

#[async_trait]
impl Tool for StopContainerTool {
    fn name(&self) -> &'static str {
        "stop-container"
    }

    fn description(&self) -> &'static str {
        "Stop a running container, killing it if it does not exit within the timeout."
    }

    fn input_schema(&self) -> Value {
        stop_schema()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: StopParams = parse_params(args)?;
        let timeout = validate_stop_timeout(params.timeout)?;
        let container = ctx.resolve_container(params.container.as_deref())?;
        ctx.runtime().stop_container(&container, timeout).await?;
        Ok(format!("Container {} stopped.", container))
    }
}

/// Restarts a container.
pub struct RestartContainerTool;

#[async_trait]
impl Tool for RestartContainerTool {
    fn name(&self) -> &'static str {
        "restart-container"
    }

    fn description(&self) -> &'static str {
        "Restart a container."
    }

    fn input_schema(&self) -> Value {
        stop_schema()
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: StopParams = parse_params(args)?;
        let timeout = validate_stop_timeout(params.timeout)?;
        let container = ctx.resolve_container(params.container.as_deref())?;
        ctx.runtime().restart_container(&container, timeout).await?;
        Ok(format!("Container {} restarted.", container))
    }
}

/// Returns recent container logs.
pub struct ContainerLogsTool;

#[derive(Debug, Default, Deserialize)]
struct LogsParams {
    container: Option<String>,
    tail: Option<u64>,
}

#[async_trait]
impl Tool for ContainerLogsTool {
    fn name(&self) -> &'static str {
        "container-logs"
    }

    fn description(&self) -> &'static str {
        "Fetch the most recent stdout/stderr log lines of a container."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "container": container_property(),
                "tail": { "type": "integer", "minimum": 1, "default": 100, "description": "Number of lines from the end" }
            }
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: LogsParams = parse_params(args)?;
        let tail = params.tail.unwrap_or(100);
        if tail == 0 {
            return Err(ToolError::InvalidParams("\"tail\" must be at least 1".to_string()));
        }
        let container = ctx.resolve_container(params.container.as_deref())?;
        let logs = ctx.runtime().logs(&container, Some(tail)).await?;

        if logs.is_empty() {
            Ok(format!("No logs for container {}.", container))
        } else {
            Ok(logs)
        }
    }
}

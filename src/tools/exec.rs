//! `execute-command`: run an arbitrary shell command in a container.

use crate::container::ExecConfig;
use crate::tools::{
    Result, Tool, ToolContext, ToolError, container_property, format_output, parse_params,
    require_non_empty,
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct Params {
    command: String,
    container: Option<String>,
    workdir: Option<String>,
    user: Option<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    timeout: Option<u64>,
}

/// Runs `sh -c <command>` and reports stdout, stderr, and the exit code.
pub struct ExecuteCommandTool;

#[async_trait]
impl Tool for ExecuteCommandTool {
    fn name(&self) -> &'static str {
        "execute-command"
    }

    fn description(&self) -> &'static str {
        "Execute a shell command inside a running container and return its stdout, stderr and exit code."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": { "type": "string", "description": "Shell command, run with sh -c" },
                "container": container_property(),
                "workdir": { "type": "string", "description": "Working directory inside the container" },
                "user": { "type": "string", "description": "User to run as (name or uid[:gid])" },
                "env": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Extra environment variables"
                },
                "timeout": { "type": "integer", "minimum": 1, "description": "Timeout in seconds" }
            },
            "required": ["command"]
        })
    }

    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String> {
        let params: Params = parse_params(args)?;
        require_non_empty("command", &params.command)?;

        let timeout = match params.timeout {
            Some(0) => {
                return Err(ToolError::InvalidParams(
                    "\"timeout\" must be at least 1 second".to_string(),
                ));
            }
            Some(secs) => Some(Duration::from_secs(secs)),
            None => None,
        };

        if let Some(bad) = params.env.keys().find(|k| k.is_empty() || k.contains('=')) {
            return Err(ToolError::InvalidParams(format!(
                "invalid environment variable name: {:?}",
                bad
            )));
        }

        let container = ctx.resolve_container(params.container.as_deref())?;

        let mut builder = ExecConfig::builder().shell(params.command);
        if let Some(dir) = params.workdir.filter(|d| !d.is_empty()) {
            builder = builder.working_dir(dir);
        }
        if let Some(user) = params.user.filter(|u| !u.is_empty()) {
            builder = builder.user(user);
        }
        for (key, value) in params.env {
            builder = builder.env(key, value);
        }
        let config = builder.build();

        let output = ctx.exec(&container, &config, timeout).await?;
        let text = format_output(&output);

        match output.exit_code {
            Some(0) => Ok(with_status_line(text, "[exit code: 0]")),
            Some(code) => Err(ToolError::CommandFailed {
                exit_code: code,
                output: text,
            }),
            None => Ok(with_status_line(text, "[exit code unavailable]")),
        }
    }
}

fn with_status_line(mut text: String, status: &str) -> String {
    if !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(status);
    text
}

//! Tool handlers exposed over MCP.
//!
//! Each tool validates its parameters, performs one Docker API call or one
//! shell command inside the target container, and formats the result as text.
//! Failures never escape as protocol errors: [`ToolRegistry::call`] turns every
//! [`ToolError`] into a [`ToolOutput`] flagged as an error.

mod compose;
mod containers;
mod exec;
mod files;
mod registry;
mod search;

pub use compose::FetchComposeFileTool;
pub use containers::{
    ContainerLogsTool, InspectContainerTool, ListContainersTool, RestartContainerTool,
    StartContainerTool, StopContainerTool,
};
pub use exec::ExecuteCommandTool;
pub use files::{DeleteFileTool, ListDirectoryTool, ReadFileTool, ReplaceTextTool, WriteFileTool};
pub use registry::ToolRegistry;
pub use search::{FindFilesTool, SearchTextTool};

use crate::container::{ContainerError, ContainerRuntime, ExecConfig, ExecOutput};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Errors raised inside tool handlers.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Parameters failed validation
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No container named in the call and no default configured
    #[error(
        "No container specified. Pass a \"container\" parameter or configure a default container."
    )]
    NoContainer,

    /// Container runtime failure
    #[error("{0}")]
    Container(#[from] ContainerError),

    /// Command ran but exited non-zero
    #[error("Command exited with code {exit_code}\n{output}")]
    CommandFailed {
        /// Exit code, -1 when unknown
        exit_code: i64,
        /// Formatted stdout/stderr
        output: String,
    },

    /// IO error on the host side
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else
    #[error("{0}")]
    Other(String),
}

/// Result type for tool handlers.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Result text
    pub text: String,
    /// Whether the call failed
    pub is_error: bool,
}

impl ToolOutput {
    /// Successful result.
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    /// Failed result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

/// A callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &'static str;

    /// One-paragraph description shown to clients.
    fn description(&self) -> &'static str;

    /// JSON Schema of the parameters object.
    fn input_schema(&self) -> Value;

    /// Run the tool.
    async fn call(&self, ctx: &ToolContext, args: Value) -> Result<String>;
}

/// Shared state handed to every tool call.
#[derive(Clone)]
pub struct ToolContext {
    runtime: Arc<dyn ContainerRuntime>,
    default_container: Option<String>,
    command_timeout: Duration,
    max_output_bytes: usize,
}

impl ToolContext {
    /// Default limit on returned text.
    pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 100_000;

    /// Create a context with a 30 second command timeout and no default container.
    pub fn new(runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            runtime,
            default_container: None,
            command_timeout: Duration::from_secs(30),
            max_output_bytes: Self::DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    /// Container used when a call does not name one.
    pub fn with_default_container(mut self, container: Option<String>) -> Self {
        self.default_container = container.filter(|c| !c.trim().is_empty());
        self
    }

    /// Timeout applied to in-container commands.
    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Maximum number of bytes of text a tool returns.
    pub fn with_max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    /// The container runtime.
    pub fn runtime(&self) -> &dyn ContainerRuntime {
        self.runtime.as_ref()
    }

    /// The configured default container.
    pub fn default_container(&self) -> Option<&str> {
        self.default_container.as_deref()
    }

    /// The configured command timeout.
    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Pick the requested container, falling back to the default.
    pub fn resolve_container(&self, requested: Option<&str>) -> Result<String> {
        requested
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .or(self.default_container.as_deref())
            .map(str::to_string)
            .ok_or(ToolError::NoContainer)
    }

    /// Run a command, failing fast when the container is not running and when
    /// the command outlives `timeout` (the context timeout if `None`).
    pub async fn exec(
        &self,
        container: &str,
        config: &ExecConfig,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        let timeout = timeout.unwrap_or(self.command_timeout);

        let run = async {
            let state = self.runtime.container_state(container).await?;
            if !state.accepts_exec() {
                return Err(ContainerError::NotRunning {
                    name: container.to_string(),
                    state,
                });
            }
            self.runtime.exec(container, config).await
        };

        match tokio::time::timeout(timeout, run).await {
            Ok(result) => Ok(result?),
            Err(_) => {
                debug!("Command in {} timed out after {:?}", container, timeout);
                Err(ContainerError::Timeout(timeout).into())
            }
        }
    }

    /// Like [`ToolContext::exec`], but a non-zero exit becomes [`ToolError::CommandFailed`].
    pub async fn exec_checked(
        &self,
        container: &str,
        config: &ExecConfig,
        timeout: Option<Duration>,
    ) -> Result<ExecOutput> {
        let output = self.exec(container, config, timeout).await?;
        if output.success() {
            Ok(output)
        } else {
            Err(ToolError::CommandFailed {
                exit_code: output.exit_code.unwrap_or(-1),
                output: format_output(&output),
            })
        }
    }

    /// Shorthand for running a shell script with [`ToolContext::exec_checked`].
    pub async fn shell(&self, container: &str, script: String) -> Result<ExecOutput> {
        let config = ExecConfig::builder().shell(script).build();
        self.exec_checked(container, &config, None).await
    }

    /// Cut `text` down to the output limit on a character boundary.
    pub fn truncate(&self, text: String) -> String {
        truncate_output(text, self.max_output_bytes)
    }
}

/// Deserialize tool arguments, treating a missing object as empty.
pub(crate) fn parse_params<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidParams(e.to_string()))
}

/// Reject empty or whitespace-only required strings.
pub(crate) fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(ToolError::InvalidParams(format!("\"{}\" must not be empty", field)))
    } else {
        Ok(())
    }
}

/// Render stdout and stderr of a command as one block of text.
pub fn format_output(output: &ExecOutput) -> String {
    let mut text = output.stdout.clone();

    if !output.stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str("[stderr]\n");
        text.push_str(&output.stderr);
    }

    if text.is_empty() {
        text.push_str("(no output)");
    }

    text
}

/// Truncate `text` to at most `max_bytes`, appending a notice when cut.
pub fn truncate_output(mut text: String, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text;
    }

    let total = text.len();
    let mut cut = max_bytes;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push_str(&format!(
        "\n... [output truncated: showing {} of {} bytes]",
        cut, total
    ));
    text
}

/// Schema fragment shared by every tool that targets a container.
pub(crate) fn container_property() -> Value {
    serde_json::json!({
        "type": "string",
        "description": "Container name or ID. Defaults to the configured container."
    })
}

//! Container command execution.
//!
//! Provides APIs for executing commands in running containers with
//! stdin/stdout/stderr handling.

use crate::container::stream::{self, StreamDemuxer};
use crate::container::{ContainerError, Result};
use bollard::Docker;
use bollard::container::LogOutput;
use bollard::exec::{CreateExecOptions, StartExecResults};
use futures::stream::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Execution configuration builder.
pub struct ExecConfigBuilder {
    cmd: Vec<String>,
    env: Vec<String>,
    working_dir: Option<String>,
    user: Option<String>,
    stdin: Option<Vec<u8>>,
    attach_stdout: bool,
    attach_stderr: bool,
    tty: bool,
}

impl Default for ExecConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecConfigBuilder {
    /// Create a new execution configuration builder.
    pub fn new() -> Self {
        Self {
            cmd: Vec::new(),
            env: Vec::new(),
            working_dir: None,
            user: None,
            stdin: None,
            attach_stdout: true,
            attach_stderr: true,
            tty: false,
        }
    }

    /// Set the command to execute.
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = cmd.into_iter().map(|s| s.into()).collect();
        self
    }

    /// Run `script` through `sh -c`.
    pub fn shell<S: Into<String>>(self, script: S) -> Self {
        self.cmd(["sh".to_string(), "-c".to_string(), script.into()])
    }

    /// Add an environment variable.
    pub fn env<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.env.push(format!("{}={}", key.into(), value.into()));
        self
    }

    /// Set the working directory.
    pub fn working_dir<S: Into<String>>(mut self, dir: S) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Set the user to execute as.
    pub fn user<S: Into<String>>(mut self, user: S) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Bytes written to the command's stdin before it is closed.
    pub fn stdin<B: Into<Vec<u8>>>(mut self, input: B) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Attach to stdout.
    pub fn attach_stdout(mut self, attach: bool) -> Self {
        self.attach_stdout = attach;
        self
    }

    /// Attach to stderr.
    pub fn attach_stderr(mut self, attach: bool) -> Self {
        self.attach_stderr = attach;
        self
    }

    /// Enable TTY allocation.
    pub fn tty(mut self, enable: bool) -> Self {
        self.tty = enable;
        self
    }

    /// Build the execution configuration.
    pub fn build(self) -> ExecConfig {
        ExecConfig {
            cmd: self.cmd,
            env: self.env,
            working_dir: self.working_dir,
            user: self.user,
            stdin: self.stdin,
            attach_stdout: self.attach_stdout,
            attach_stderr: self.attach_stderr,
            tty: self.tty,
        }
    }
}

/// Container execution configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecConfig {
    cmd: Vec<String>,
    env: Vec<String>,
    working_dir: Option<String>,
    user: Option<String>,
    stdin: Option<Vec<u8>>,
    attach_stdout: bool,
    attach_stderr: bool,
    tty: bool,
}

impl ExecConfig {
    /// Create a new execution configuration builder.
    pub fn builder() -> ExecConfigBuilder {
        ExecConfigBuilder::new()
    }

    /// Get the command.
    pub fn cmd(&self) -> &[String] {
        &self.cmd
    }

    /// Environment entries as `KEY=value`.
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Get the working directory.
    pub fn working_dir(&self) -> Option<&str> {
        self.working_dir.as_deref()
    }

    /// Get the user.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Get the stdin payload.
    pub fn stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    /// The script when the command is `sh -c <script>`.
    pub fn shell_script(&self) -> Option<&str> {
        match self.cmd.as_slice() {
            [sh, flag, script] if sh == "sh" && flag == "-c" => Some(script),
            _ => None,
        }
    }
}

/// Output from command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit code (None if not available)
    pub exit_code: Option<i64>,
    /// Stdout held bytes that are not valid UTF-8 and were replaced with U+FFFD
    pub stdout_lossy: bool,
}

impl ExecOutput {
    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Get combined output (stdout + stderr).
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr)
    }
}

/// Collected exec output before decoding.
#[derive(Default)]
struct OutputCollector {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    console: Vec<u8>,
}

impl OutputCollector {
    fn push(&mut self, log: LogOutput) {
        match log {
            LogOutput::StdOut { message } => self.stdout.extend_from_slice(&message),
            LogOutput::StdErr { message } => self.stderr.extend_from_slice(&message),
            LogOutput::Console { message } => self.console.extend_from_slice(&message),
            LogOutput::StdIn { .. } => {}
        }
    }

    /// Decode into text. The exit code is left unset.
    ///
    /// Console output is the raw attach stream. Some daemons still frame it even
    /// when they label it raw, so framed console bytes are demultiplexed here.
    fn finish(mut self, tty: bool) -> ExecOutput {
        if !self.console.is_empty() {
            if !tty && stream::is_multiplexed(&self.console) {
                let mut demuxer = StreamDemuxer::new();
                demuxer.push(&self.console);
                if demuxer.pending_len() > 0 {
                    warn!(
                        "Discarding {} bytes of incomplete exec stream frame",
                        demuxer.pending_len()
                    );
                }
                let demuxed = demuxer.finish();
                self.stdout.extend_from_slice(&demuxed.stdout);
                self.stderr.extend_from_slice(&demuxed.stderr);
            } else {
                self.stdout.extend_from_slice(&self.console);
            }
        }

        let (stdout, stdout_lossy) = match String::from_utf8(self.stdout) {
            Ok(text) => (text, false),
            Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
        };

        ExecOutput {
            stdout,
            stderr: String::from_utf8_lossy(&self.stderr).into_owned(),
            exit_code: None,
            stdout_lossy,
        }
    }
}

/// Execute a command in a running container.
///
/// # Errors
///
/// Returns error if execution fails or container not found.
pub async fn execute(
    docker: &Docker,
    container_id: &str,
    config: &ExecConfig,
) -> Result<ExecOutput> {
    debug!(
        "Executing command in container {}: {:?}",
        container_id, config.cmd
    );

    let exec_options = CreateExecOptions {
        cmd: Some(config.cmd.clone()),
        env: if config.env.is_empty() {
            None
        } else {
            Some(config.env.clone())
        },
        working_dir: config.working_dir.clone(),
        user: config.user.clone(),
        attach_stdin: Some(config.stdin.is_some()),
        attach_stdout: Some(config.attach_stdout),
        attach_stderr: Some(config.attach_stderr),
        tty: Some(config.tty),
        ..Default::default()
    };

    let exec = docker
        .create_exec(container_id, exec_options)
        .await
        .map_err(|e| ContainerError::from_api(container_id, e))?;

    let start_results = docker.start_exec(&exec.id, None).await?;

    let mut collector = OutputCollector::default();

    match start_results {
        StartExecResults::Attached { mut output, mut input } => {
            if let Some(ref data) = config.stdin {
                input.write_all(data).await?;
                input.flush().await?;
                input.shutdown().await?;
            }
            drop(input);

            while let Some(result) = output.next().await {
                match result {
                    Ok(log) => collector.push(log),
                    Err(e) => {
                        return Err(ContainerError::ExecutionError(format!(
                            "Failed to read output: {}",
                            e
                        )));
                    }
                }
            }
        }
        StartExecResults::Detached => {
            return Err(ContainerError::ExecutionError(
                "Unexpected detached execution".to_string(),
            ));
        }
    }

    let mut output = collector.finish(config.tty);

    let inspect = docker.inspect_exec(&exec.id).await?;
    output.exit_code = inspect.exit_code;

    debug!("Command executed with exit code: {:?}", output.exit_code);

    Ok(output)
}

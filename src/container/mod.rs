//! Docker access layer.
//!
//! Wraps the bollard Docker API behind the [`ContainerRuntime`] trait so tool
//! handlers stay independent of the daemon connection.
//!
//! ## Components
//!
//! - [`client`]: Docker/Podman connection management
//! - [`orchestrator`]: Container queries and lifecycle calls, implements [`ContainerRuntime`]
//! - [`executor`]: Command execution inside running containers
//! - [`stream`]: Demultiplexing of Docker's framed stdout/stderr stream
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dockbridge::container::{ContainerOrchestrator, ContainerRuntime, ExecConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let orchestrator = ContainerOrchestrator::new().await?;
//!
//!     for container in orchestrator.list_containers(false).await? {
//!         println!("{} {}", container.short_id(), container.name());
//!     }
//!
//!     let config = ExecConfig::builder().cmd(["echo", "hello"]).build();
//!     let output = orchestrator.exec("web", &config).await?;
//!     println!("{}", output.stdout);
//!     Ok(())
//! }
//! ```

mod client;
mod executor;
mod orchestrator;
pub mod stream;

pub use client::{ContainerClient, ContainerClientConfig, ContainerState, RuntimeType};
pub use executor::{ExecConfig, ExecConfigBuilder, ExecOutput};
pub use orchestrator::{
    ContainerDetails, ContainerOrchestrator, ContainerOrchestratorConfig, ContainerSummary,
    MountSummary, PortSummary,
};
pub use stream::{DemuxedOutput, StreamDemuxer, StreamKind, demultiplex};

use async_trait::async_trait;
use std::time::Duration;

/// Container runtime errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Docker/Podman API error
    #[error("Container API error: {0}")]
    ApiError(#[from] bollard::errors::Error),

    /// Container not found
    #[error("Container not found: {0}")]
    NotFound(String),

    /// Container exists but is not running
    #[error("Container {name} is not running (state: {state})")]
    NotRunning {
        /// Container name or ID as requested
        name: String,
        /// Observed state
        state: ContainerState,
    },

    /// Container execution error
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Command did not finish in time
    #[error("Command timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// General error
    #[error("Container error: {0}")]
    Other(String),
}

impl ContainerError {
    /// Map a bollard error for `name`, turning 404 responses into [`ContainerError::NotFound`].
    pub(crate) fn from_api(name: &str, error: bollard::errors::Error) -> Self {
        match error {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => ContainerError::NotFound(name.to_string()),
            e => ContainerError::ApiError(e),
        }
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;

/// Operations the tool handlers need from a container runtime.
///
/// [`ContainerOrchestrator`] is the Docker-backed implementation.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List containers; only running ones unless `all` is set.
    async fn list_containers(&self, all: bool) -> Result<Vec<ContainerSummary>>;

    /// Inspect a container by name or ID.
    async fn inspect_container(&self, name_or_id: &str) -> Result<ContainerDetails>;

    /// Current lifecycle state of a container.
    async fn container_state(&self, name_or_id: &str) -> Result<ContainerState>;

    /// Start a stopped container.
    async fn start_container(&self, name_or_id: &str) -> Result<()>;

    /// Stop a container, killing it after `timeout_secs` (runtime default if `None`).
    async fn stop_container(&self, name_or_id: &str, timeout_secs: Option<i32>) -> Result<()>;

    /// Restart a container.
    async fn restart_container(&self, name_or_id: &str, timeout_secs: Option<i32>) -> Result<()>;

    /// Fetch the last `tail` log lines (all lines if `None`).
    async fn logs(&self, name_or_id: &str, tail: Option<u64>) -> Result<String>;

    /// Run a command inside a running container.
    async fn exec(&self, name_or_id: &str, config: &ExecConfig) -> Result<ExecOutput>;
}

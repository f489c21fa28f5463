//! # dockbridge
//!
//! Exposes Docker container operations as Model Context Protocol tools.
//!
//! Each tool is a thin handler: validate parameters, call one Docker API method
//! or run one shell command inside the target container, and format the result
//! as text. Tools are served as JSON-RPC over HTTP (optionally gated by a
//! bearer token) or over a stdio pipe.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: bollard-backed Docker access behind the
//!   [`ContainerRuntime`] trait, exec with stdin, stream demultiplexing
//! - **[`shell`]**: single-quote escaping and command builders
//! - **[`tools`]**: the tool handlers and their registry
//! - **[`mcp`]**: JSON-RPC dispatch and the HTTP and stdio transports
//! - **[`cli`]**: argument parsing and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dockbridge::container::ContainerOrchestrator;
//! use dockbridge::{ServerConfig, build_server};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let runtime = Arc::new(ContainerOrchestrator::new().await?);
//!     let server = build_server(&ServerConfig::default(), runtime);
//!
//!     let reply = server
//!         .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#)
//!         .await;
//!     println!("{}", reply.unwrap_or_default());
//!     Ok(())
//! }
//! ```

/// Docker access layer.
pub mod container;

/// Shell escaping and command construction.
pub mod shell;

/// Tool handlers exposed over MCP.
pub mod tools;

/// MCP JSON-RPC server and transports.
pub mod mcp;

/// Environment constants and path utilities.
pub mod env;

// CLI module for command-line interface
pub mod cli;

pub use cli::{ConfigDiscovery, ConfigError, ServerConfig};
pub use container::{ContainerError, ContainerOrchestrator, ContainerRuntime};
pub use mcp::McpServer;
pub use tools::{Tool, ToolContext, ToolError, ToolOutput, ToolRegistry};

use std::sync::Arc;

/// Assemble an [`McpServer`] with every built-in tool over `runtime`.
pub fn build_server(config: &ServerConfig, runtime: Arc<dyn ContainerRuntime>) -> McpServer {
    let context = ToolContext::new(runtime)
        .with_default_container(config.container.clone())
        .with_command_timeout(config.command_timeout())
        .with_max_output_bytes(config.tools.max_output_bytes);

    McpServer::new(ToolRegistry::with_default_tools(), context)
}

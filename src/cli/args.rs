//! Command line argument parsing
//!
//! Subcommands:
//! - `serve http`: Serve MCP over HTTP
//! - `serve stdio`: Serve MCP over stdin/stdout
//! - `list-tools`: Print the available tools
//! - `show-config`: Show configuration discovery information

use crate::cli::config::ConfigOverrides;
use crate::env::vars;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionMode {
    ServeHttp(ConfigOverrides),
    ServeStdio(ConfigOverrides),
    ListTools { json: bool },
    ShowConfig(ConfigOverrides),
}

#[derive(Debug, Parser)]
#[command(name = "dockbridge")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Expose Docker container operations as MCP tools over HTTP or stdio")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, ClapArgs)]
pub struct GlobalArgs {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Default container for tool calls that do not name one
    #[arg(long, env = vars::CONTAINER, global = true)]
    pub container: Option<String>,

    /// Command timeout in seconds
    #[arg(long, env = vars::TIMEOUT, global = true)]
    pub timeout: Option<u64>,

    /// Docker daemon address (unix://, tcp:// or http://)
    #[arg(long = "docker-host", env = vars::DOCKER_HOST, global = true)]
    pub docker_host: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve MCP tools
    Serve {
        #[command(subcommand)]
        transport: Transport,
    },
    /// List the available tools
    ListTools {
        /// Print the tools/list JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

#[derive(Debug, Subcommand)]
pub enum Transport {
    /// JSON-RPC over HTTP POST
    Http {
        /// Port to listen on
        #[arg(short = 'p', long, env = vars::PORT)]
        port: Option<u16>,
        /// Address to bind
        #[arg(long, env = vars::BIND)]
        bind: Option<String>,
        /// Path of the JSON-RPC endpoint
        #[arg(long)]
        endpoint: Option<String>,
        /// Require `Authorization: Bearer <token>`
        #[arg(long = "auth-token", env = vars::AUTH_TOKEN, hide_env_values = true)]
        auth_token: Option<String>,
    },
    /// Newline-delimited JSON-RPC on stdin/stdout
    Stdio,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> ExecutionMode {
        let base = self.base_overrides();
        match &self.command {
            Commands::Serve {
                transport:
                    Transport::Http {
                        port,
                        bind,
                        endpoint,
                        auth_token,
                    },
            } => ExecutionMode::ServeHttp(ConfigOverrides {
                port: *port,
                bind: bind.clone(),
                endpoint: endpoint.clone(),
                auth_token: auth_token.clone(),
                ..base
            }),
            Commands::Serve {
                transport: Transport::Stdio,
            } => ExecutionMode::ServeStdio(base),
            Commands::ListTools { json } => ExecutionMode::ListTools { json: *json },
            Commands::ShowConfig => ExecutionMode::ShowConfig(base),
        }
    }

    fn base_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            config_path: self.global.config.clone(),
            container: self.global.container.clone(),
            timeout_secs: self.global.timeout,
            docker_host: self.global.docker_host.clone(),
            ..Default::default()
        }
    }
}
